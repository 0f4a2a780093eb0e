//! Charts module - Static chart rendering

mod renderer;

pub use renderer::{ChartRenderer, ChartViews, RenderError, RenderedChart};
