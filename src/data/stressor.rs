//! Stressor Categories
//! Normalizes raw stressor labels onto the fixed stressor set.

use serde::{Serialize, Serializer};
use std::fmt;

/// Known label corrections, applied to the lowercased, trimmed label
/// before title casing.
const LABEL_CORRECTIONS: [(&str, &str); 4] = [
    ("disesases", "disease"),
    ("diseases", "disease"),
    ("other pests/parasites", "other pests"),
    ("other pests and parasites", "other pests"),
];

/// External threat category affecting colony health.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stressor {
    VarroaMites,
    OtherPests,
    Pesticides,
    Other,
    Unknown,
    Disease,
    /// Label outside the fixed set, kept as its title-cased text.
    Unrecognized(String),
}

impl Stressor {
    /// The fixed stressor set, in report order.
    pub const KNOWN: [Stressor; 6] = [
        Stressor::VarroaMites,
        Stressor::OtherPests,
        Stressor::Pesticides,
        Stressor::Other,
        Stressor::Unknown,
        Stressor::Disease,
    ];

    /// Normalize a raw label: fix known misspellings and category names,
    /// convert to title case and map onto the fixed set.
    pub fn normalize(raw: &str) -> Stressor {
        let lowered = raw.trim().to_lowercase();
        let corrected = LABEL_CORRECTIONS
            .iter()
            .find(|(from, _)| *from == lowered)
            .map(|(_, to)| to.to_string())
            .unwrap_or(lowered);

        let titled = title_case(&corrected);
        Self::KNOWN
            .iter()
            .find(|s| s.label() == titled)
            .cloned()
            .unwrap_or(Stressor::Unrecognized(titled))
    }

    pub fn label(&self) -> &str {
        match self {
            Stressor::VarroaMites => "Varroa Mites",
            Stressor::OtherPests => "Other Pests",
            Stressor::Pesticides => "Pesticides",
            Stressor::Other => "Other",
            Stressor::Unknown => "Unknown",
            Stressor::Disease => "Disease",
            Stressor::Unrecognized(label) => label,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Stressor::Unrecognized(_))
    }
}

impl fmt::Display for Stressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Stressor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Uppercase the first letter of every whitespace-separated word and
/// lowercase the rest.
fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
