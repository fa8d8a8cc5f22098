//! Config command implementation

use std::path::Path;

use anyhow::{Context, Result};
use kindred_core::config::default_config_path;
use kindred_core::AnalyticsConfig;

pub fn cmd_config(config: &AnalyticsConfig, explicit: Option<&Path>) -> Result<()> {
    let source = match explicit {
        Some(path) => path.display().to_string(),
        None => match default_config_path() {
            Some(path) if path.exists() => path.display().to_string(),
            _ => "built-in defaults".to_string(),
        },
    };

    println!("# Source: {}", source);
    if let Some(path) = default_config_path() {
        println!("# Override path: {}", path.display());
    }
    println!();
    print!(
        "{}",
        toml::to_string_pretty(config).context("Failed to render config")?
    );
    Ok(())
}
