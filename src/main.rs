//! Beestat - Honeybee Colony Report Generator

use anyhow::{Context, Result};
use beestat::cli::Cli;
use beestat::config::ReportConfig;
use beestat::pipeline;
use beestat::report::ReportWriter;
use clap::Parser;
use log::info;

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .init();

    let mut config = match &cli.config {
        Some(path) => ReportConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ReportConfig::default(),
    };
    cli.apply_overrides(&mut config);

    let (report, written) = pipeline::run(&config).context("report generation failed")?;
    info!(
        "Wrote {} and {}",
        written.markdown.display(),
        written.json.display()
    );

    println!("{}", ReportWriter::markdown(&report, &config.output.directory));
    Ok(())
}
