use anyhow::Result;
use colored::Colorize;
use std::collections::HashSet;
use std::path::Path;

/// Flags configuration keys that pollwatch does not recognise.
pub struct ConfigValidator {
    /// Every `section.key` the config schema accepts
    known_fields: HashSet<&'static str>,
}

impl ConfigValidator {
    /// Create a validator for the current config schema
    #[must_use]
    pub fn new() -> Self {
        let known_fields = [
            "watch",
            "watch.interval",
            "watch.recursive",
            "watch.dotfiles",
            "watch.max_events",
            "watch.ops",
            "filters",
            "filters.ignore_names",
            "filters.ignore_paths",
            "filters.filter_names",
            "filters.filter_paths",
            "command",
            "command.cmd",
            "command.startcmd",
            "command.pipe",
            "command.keepalive",
        ]
        .into_iter()
        .collect();

        Self { known_fields }
    }

    /// Unknown keys in `content`, as dotted paths.
    ///
    /// # Errors
    ///
    /// Returns an error if `content` is not valid TOML.
    pub fn unknown_fields(&self, content: &str) -> Result<Vec<String>> {
        let parsed: toml::Table = toml::from_str(content)?;
        let mut unknown = Vec::new();
        self.check_table(&parsed, "", &mut unknown);
        Ok(unknown)
    }

    /// Warn on stderr about unknown keys in a config file
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub fn validate_config_file(&self, config_path: &Path) -> Result<()> {
        if !config_path.exists() {
            return Ok(());
        }

        let content = std::fs::read_to_string(config_path)?;
        let unknown = self.unknown_fields(&content)?;

        if !unknown.is_empty() {
            eprintln!("{}", "Configuration warnings:".yellow().bold());
            for field in &unknown {
                eprintln!("  Unknown configuration field: {}", field.yellow());
            }
            eprintln!();
        }

        Ok(())
    }

    /// Recursively collect keys of `table` not in the schema
    fn check_table(&self, table: &toml::Table, prefix: &str, unknown: &mut Vec<String>) {
        for (key, value) in table {
            let full_key = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };

            if !self.known_fields.contains(full_key.as_str()) {
                unknown.push(full_key);
            } else if let toml::Value::Table(inner) = value {
                self.check_table(inner, &full_key, unknown);
            }
        }
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
