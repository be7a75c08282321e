// ABOUTME: Configuration for the console loaded from TOML with CLI overrides
// Resolves the dashboard origin, endpoint template, and bridge timing settings

use crate::terminal::bridge::BridgeOptions;
use crate::terminal::transport::DEFAULT_PATH_TEMPLATE;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub dashboard: DashboardConfig,
    pub terminal: TerminalConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Origin the dashboard is served from; its scheme decides ws vs wss
    pub origin: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub path_template: String,
    pub auto_connect: bool,
    pub connect_timeout_ms: u64,
    pub fit_debounce_ms: u64,
    pub scrollback: usize,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            path_template: DEFAULT_PATH_TEMPLATE.to_string(),
            auto_connect: true,
            connect_timeout_ms: 10_000,
            fit_debounce_ms: 100,
            scrollback: 5_000,
        }
    }
}

impl AppConfig {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "omnicloud", "omni-console")
    }

    /// `config.toml` in the platform config directory
    pub fn default_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Directory for log files
    pub fn log_dir() -> PathBuf {
        Self::project_dirs()
            .map(|dirs| dirs.data_local_dir().join("logs"))
            .unwrap_or_else(|| PathBuf::from(".omni-console/logs"))
    }

    /// Load from `path`, or from the default location when `path` is None.
    /// A missing default file yields the built-in defaults; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn bridge_options(&self) -> BridgeOptions {
        BridgeOptions {
            origin: self.dashboard.origin.clone(),
            path_template: self.terminal.path_template.clone(),
            auto_connect: self.terminal.auto_connect,
            connect_timeout: Duration::from_millis(self.terminal.connect_timeout_ms),
            fit_debounce: Duration::from_millis(self.terminal.fit_debounce_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [dashboard]
            origin = "https://dash.omnicloud.dev"

            [terminal]
            connect_timeout_ms = 2500
            "#,
        )
        .unwrap();

        assert_eq!(config.dashboard.origin, "https://dash.omnicloud.dev");
        assert_eq!(config.terminal.connect_timeout_ms, 2500);
        assert_eq!(config.terminal.path_template, DEFAULT_PATH_TEMPLATE);
        assert!(config.terminal.auto_connect);

        let options = config.bridge_options();
        assert_eq!(options.connect_timeout, Duration::from_millis(2500));
        assert_eq!(options.fit_debounce, Duration::from_millis(100));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[terminal]\nauto_connect = false").unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert!(!config.terminal.auto_connect);
        assert_eq!(config.dashboard, DashboardConfig::default());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(AppConfig::from_toml_str("[terminal]\nconnect_timeout_ms = \"soon\"").is_err());
    }

    #[test]
    fn test_round_trip_default() {
        let text = AppConfig::default().to_toml_string().unwrap();
        assert_eq!(AppConfig::from_toml_str(&text).unwrap(), AppConfig::default());
    }
}
