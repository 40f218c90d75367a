//! Configuration command handler.

use animatic::{AnimaticResult, ConfigError, PipelineConfig};
use std::path::Path;

/// Load configuration from an explicit file, or the merged defaults.
pub fn load_config(path: Option<&Path>) -> AnimaticResult<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path),
        None => PipelineConfig::load(),
    }
}

/// Print the effective configuration.
pub fn show_config(path: Option<&Path>) -> AnimaticResult<()> {
    let config = load_config(path)?;
    let rendered = toml::to_string_pretty(&config)
        .map_err(|e| ConfigError::new(format!("Failed to render configuration: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}
