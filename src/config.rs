//! Provides a ConfigManager to read and refresh config from files.

use color_eyre::Result;
use config;
use log::*;
use notify::{RecommendedWatcher, Watcher};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;

use crate::event::{AppEvent, Event};
use crate::monitor::registry::SortKey;

pub const DEFAULT_FILE: &str = "ptop.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between sampling ticks.
    pub refresh_secs: u64,
    pub sort: SortKey,
    pub descending: bool,
    /// Show one gauge per core in addition to the aggregate.
    pub show_cores: bool,
    pub log_buffer_size: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            refresh_secs: 1,
            sort: SortKey::Cpu,
            descending: true,
            show_cores: false,
            log_buffer_size: 10_000,
        }
    }
}

#[derive(Debug)]
pub struct ConfigManager {
    pub file_path: PathBuf,
    config: MonitorConfig,
    _watcher: RecommendedWatcher,
}

impl ConfigManager {
    pub fn new(file_path: PathBuf, sender: UnboundedSender<Event>) -> Result<ConfigManager> {
        let captured = sender.clone();
        let mut watcher = notify::recommended_watcher(move |_| {
            let _ = captured.send(Event::App(AppEvent::Reload));
        })?;
        if file_path.exists() {
            info!(target: "Config", "Watching file {:?}", file_path);
            watcher.watch(&file_path, notify::RecursiveMode::NonRecursive)?;
        } else {
            info!(target: "Config", "No config file at {:?}, using defaults", file_path);
        }
        Ok(ConfigManager {
            file_path: file_path.clone(),
            config: load(file_path)?,
            _watcher: watcher,
        })
    }

    pub fn current(&self) -> MonitorConfig {
        self.config.clone()
    }

    pub fn reload(&mut self) -> Result<MonitorConfig> {
        self.config = load(self.file_path.clone())?;
        Ok(self.current())
    }
}

/// Load the file (when present) with `PTOP_` environment overrides on top.
pub fn load(file_path: PathBuf) -> Result<MonitorConfig> {
    let raw = config::Config::builder()
        .add_source(config::File::from(file_path).required(false))
        .add_source(config::Environment::with_prefix("PTOP"))
        .build()?;
    Ok(raw.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.refresh_secs, 1);
        assert_eq!(config.sort, SortKey::Cpu);
        assert!(config.descending);
        assert!(!config.show_cores);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = load(PathBuf::from("/definitely/not/there.toml")).unwrap();
        assert_eq!(config.refresh_secs, 1);
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "refresh_secs = 5\nsort = \"ram\"\ndescending = false").unwrap();
        let config = load(file.path().to_path_buf()).unwrap();
        assert_eq!(config.refresh_secs, 5);
        assert_eq!(config.sort, SortKey::Ram);
        assert!(!config.descending);
        // Untouched fields keep their defaults.
        assert!(!config.show_cores);
        assert_eq!(config.log_buffer_size, 10_000);
    }
}
