//! Vehicle definition loading

use anyhow::{Context, Result};
use can_translate::VehicleConfig;
use std::fs;
use std::path::Path;

/// Load and validate a vehicle definition from a TOML file
pub fn load_config(path: &Path) -> Result<VehicleConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    parse_config(&content).with_context(|| format!("Invalid config file: {:?}", path))
}

fn parse_config(content: &str) -> Result<VehicleConfig> {
    let config: VehicleConfig = toml::from_str(content).context("Failed to parse TOML")?;
    config.validate()?;
    Ok(config)
}
