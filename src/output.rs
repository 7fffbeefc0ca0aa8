//! Plan and summary output formats

use clap::ValueEnum;
use serde::Serialize;

use crate::error::Result;

/// Serialization format for printed plans and summaries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Serialize `value` in `format`, newline-terminated
pub fn render_output<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Json => serde_json::to_string_pretty(value)? + "\n",
    })
}
