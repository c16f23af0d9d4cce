use super::Config;
use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;

/// Read, parse and validate a TOML config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid TOML, or fails
/// validation.
pub fn parse_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config_str(&content)
}

/// Parse and validate config text.
///
/// # Errors
///
/// Returns an error if the text is not valid TOML or fails validation.
pub fn parse_config_str(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse TOML config")?;

    // Validate and return validation errors directly without wrapping
    validate_config(&config)?;
    Ok(config)
}

/// Check values the type system cannot: interval, op names and patterns.
///
/// # Errors
///
/// Returns the first invalid value found.
pub fn validate_config(config: &Config) -> Result<()> {
    let interval = config.interval()?;
    if interval.is_zero() {
        anyhow::bail!("Interval must be greater than zero");
    }

    config.ops()?;

    let filters = &config.filters;
    for (field, patterns) in [
        ("ignore_names", &filters.ignore_names),
        ("ignore_paths", &filters.ignore_paths),
        ("filter_names", &filters.filter_names),
        ("filter_paths", &filters.filter_paths),
    ] {
        for pattern in patterns {
            Regex::new(pattern)
                .with_context(|| format!("Invalid pattern in {field}: '{pattern}'"))?;
        }
    }

    if let Some(cmd) = &config.command.cmd
        && cmd.trim().is_empty()
    {
        anyhow::bail!("Command must not be empty");
    }

    Ok(())
}
