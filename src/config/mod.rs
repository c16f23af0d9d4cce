//! TOML configuration for the `pollwatch` front-end.
//!
//! ```toml
//! [watch]
//! interval = "250ms"
//! recursive = true
//! dotfiles = false
//! max_events = 0
//! ops = ["create", "write"]
//!
//! [filters]
//! ignore_names = ["\\.swp$"]
//! ignore_paths = ["target"]
//!
//! [command]
//! cmd = "cargo test"
//! keepalive = true
//! ```

pub mod parser;
pub mod validator;

use crate::cli::Cli;
use crate::event::Op;
use crate::watcher::Watcher;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub filters: FilterConfig,

    /// Command run on every event
    #[serde(default)]
    pub command: CommandConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchConfig {
    /// Poll interval in humantime notation ("100ms", "2s")
    #[serde(default = "default_interval")]
    pub interval: String,
    #[serde(default = "default_true")]
    pub recursive: bool,
    /// Watch hidden entries too
    #[serde(default = "default_true")]
    pub dotfiles: bool,
    /// Per-cycle event cap, 0 for unlimited
    #[serde(default)]
    pub max_events: usize,
    /// Operation allow-list, empty for all
    #[serde(default)]
    pub ops: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct FilterConfig {
    #[serde(default)]
    pub ignore_names: Vec<String>,
    #[serde(default)]
    pub ignore_paths: Vec<String>,
    #[serde(default)]
    pub filter_names: Vec<String>,
    #[serde(default)]
    pub filter_paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CommandConfig {
    #[serde(default)]
    pub cmd: Option<String>,
    /// Run the command once before watching
    #[serde(default)]
    pub startcmd: bool,
    /// Feed each event's rendering to the command's stdin
    #[serde(default)]
    pub pipe: bool,
    /// Keep watching when the command fails
    #[serde(default)]
    pub keepalive: bool,
}

fn default_interval() -> String {
    crate::DEFAULT_INTERVAL.to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            recursive: true,
            dotfiles: true,
            max_events: 0,
            ops: Vec::new(),
        }
    }
}

impl Config {
    /// Default configuration file location, if a config directory exists.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(crate::DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from a file, falling back to defaults when it
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file exists but cannot be read
    /// - The file contains invalid TOML
    /// - A value fails validation (bad interval, op name or pattern)
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        parser::parse_config_file(path)
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Cannot create parent directories
    /// - Cannot write to the file
    /// - TOML serialization fails
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        let mut file = std::fs::File::create(path)?;
        file.write_all(toml_str.as_bytes())?;
        Ok(())
    }

    /// Poll interval as a duration.
    ///
    /// # Errors
    ///
    /// Returns an error if the interval is not a valid humantime duration.
    pub fn interval(&self) -> Result<Duration> {
        humantime::parse_duration(&self.watch.interval)
            .with_context(|| format!("Invalid interval '{}'", self.watch.interval))
    }

    /// Operation allow-list.
    ///
    /// # Errors
    ///
    /// Returns an error if any entry is not an operation name.
    pub fn ops(&self) -> Result<Vec<Op>> {
        self.watch
            .ops
            .iter()
            .map(|op| op.parse::<Op>().map_err(anyhow::Error::msg))
            .collect()
    }

    /// Overlay values given on the command line.
    pub fn merge_cli(&mut self, cli: &Cli) {
        if let Some(interval) = cli.interval {
            self.watch.interval = humantime::format_duration(interval).to_string();
        }
        if let Some(recursive) = cli.recursive {
            self.watch.recursive = recursive;
        }
        if let Some(dotfiles) = cli.dotfiles {
            self.watch.dotfiles = dotfiles;
        }
        if let Some(max_events) = cli.max_events {
            self.watch.max_events = max_events;
        }
        if !cli.ops.is_empty() {
            self.watch.ops = cli.ops.iter().map(ToString::to_string).collect();
        }
        self.filters.ignore_paths.extend(cli.ignore.iter().cloned());

        if cli.cmd.is_some() {
            self.command.cmd.clone_from(&cli.cmd);
        }
        self.command.startcmd |= cli.startcmd;
        self.command.pipe |= cli.pipe;
        self.command.keepalive |= cli.keepalive;
    }

    /// Push filters, operation allow-list, hidden policy and event cap onto
    /// `watcher`. Call before adding paths.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern or operation name is invalid.
    pub fn apply(&self, watcher: &Watcher) -> Result<()> {
        let filters = &self.filters;
        watcher
            .ignore_names(&filters.ignore_names)
            .context("Invalid ignore_names pattern")?;
        watcher
            .ignore_paths(&filters.ignore_paths)
            .context("Invalid ignore_paths pattern")?;
        watcher
            .filter_names(&filters.filter_names)
            .context("Invalid filter_names pattern")?;
        watcher
            .filter_paths(&filters.filter_paths)
            .context("Invalid filter_paths pattern")?;

        watcher.filter_ops(&self.ops()?);
        watcher.set_ignore_hidden(!self.watch.dotfiles);
        watcher.set_max_events(self.watch.max_events);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.interval().unwrap(), Duration::from_millis(100));
        assert!(config.watch.recursive);
        assert!(config.watch.dotfiles);
        assert!(config.ops().unwrap().is_empty());
        assert!(config.command.cmd.is_none());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert!(!dir.path().join("absent.toml").exists());
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.watch.interval = "2s".to_string();
        config.watch.ops = vec!["create".to_string()];
        config.filters.ignore_names = vec![r"\.swp$".to_string()];
        config.save(&path)?;

        let loaded = Config::load(&path)?;
        assert_eq!(loaded, config);
        Ok(())
    }

    #[test]
    fn test_merge_cli_overrides() {
        let cli = Cli::parse_from([
            "pollwatch",
            "--interval",
            "1s",
            "--recursive",
            "false",
            "--ops",
            "create,remove",
            "--ignore",
            "target,build",
            "--cmd",
            "make",
            "--pipe",
        ]);

        let mut config = Config::default();
        config.filters.ignore_paths = vec!["cache".to_string()];
        config.merge_cli(&cli);

        assert_eq!(config.interval().unwrap(), Duration::from_secs(1));
        assert!(!config.watch.recursive);
        assert!(config.watch.dotfiles);
        assert_eq!(config.ops().unwrap(), vec![Op::Create, Op::Remove]);
        assert_eq!(config.filters.ignore_paths, vec!["cache", "target", "build"]);
        assert_eq!(config.command.cmd.as_deref(), Some("make"));
        assert!(config.command.pipe);
        assert!(!config.command.keepalive);
    }

    #[test]
    fn test_merge_cli_keeps_config_when_unset() {
        let cli = Cli::parse_from(["pollwatch"]);
        let mut config = Config::default();
        config.watch.dotfiles = false;
        config.command.keepalive = true;
        config.merge_cli(&cli);

        assert!(!config.watch.dotfiles);
        assert!(config.command.keepalive);
    }

    #[test]
    fn test_apply_rejects_bad_pattern() {
        let watcher = Watcher::new();
        let mut config = Config::default();
        config.filters.ignore_names = vec!["(".to_string()];

        let err = config.apply(&watcher).unwrap_err();
        assert!(err.to_string().contains("ignore_names"));
    }

    #[test]
    fn test_apply_hidden_policy() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join(".hidden"), "h").unwrap();
        std::fs::write(root.join("shown"), "s").unwrap();

        let watcher = Watcher::new();
        let mut config = Config::default();
        config.watch.dotfiles = false;
        config.apply(&watcher).unwrap();
        watcher.add_path(&root, true).unwrap();

        let watched = watcher.list_watched();
        assert!(watched.contains_key(&root.join("shown")));
        assert!(!watched.contains_key(&root.join(".hidden")));
    }
}
