use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::editor::PlacementClickPolicy;
use crate::request::DEFAULT_OUTPUT_FILENAME;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigPathError {
    #[error("neither XDG_CONFIG_HOME nor HOME is set")]
    MissingHomeDirectory,
}

const APP_DIR: &str = "image-adjuster";
const APP_CONFIG_FILE: &str = "config.json";
const DEFAULT_SERVER_URL: &str = "http://localhost:8000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_FILTER: &str = "info";

/// Application-level settings from `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server_url: String,
    pub output_filename: String,
    pub placement_click: PlacementClickPolicy,
    pub cache_bust_output: bool,
    pub request_timeout_secs: u64,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            output_filename: DEFAULT_OUTPUT_FILENAME.to_string(),
            placement_click: PlacementClickPolicy::default(),
            cache_bust_output: true,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Loads settings from `explicit` when given, otherwise from the discovered
/// `config.json`. Any failure leaves the defaults in place.
pub fn load_app_config(explicit: Option<&Path>) -> AppConfig {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                tracing::warn!(?path, "config file not found; using defaults");
            }
            path.to_path_buf()
        }
        None => {
            let xdg_config_home = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from);
            let home = std::env::var_os("HOME").map(PathBuf::from);
            match discover_config_path(xdg_config_home.as_deref(), home.as_deref()) {
                Ok(path) => path,
                Err(err) => {
                    tracing::debug!(%err, "no config location; using defaults");
                    return AppConfig::default();
                }
            }
        }
    };
    read_config(&path)
}

/// `$XDG_CONFIG_HOME/image-adjuster/config.json`, or the same under
/// `$HOME/.config` when XDG is unset or empty.
fn discover_config_path(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let root = match xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        Some(xdg) => xdg.to_path_buf(),
        None => home
            .ok_or(ConfigPathError::MissingHomeDirectory)?
            .join(".config"),
    };
    Ok(root.join(APP_DIR).join(APP_CONFIG_FILE))
}

fn read_config(path: &Path) -> AppConfig {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return AppConfig::default(),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            return AppConfig::default();
        }
    };
    serde_json::from_str(&contents).unwrap_or_else(|err| {
        tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
        AppConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(name: &str, contents: Option<&str>) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "image-adjuster-config-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).expect("scratch dir should be created");
        let path = dir.join(APP_CONFIG_FILE);
        if let Some(contents) = contents {
            std::fs::write(&path, contents).expect("config should be written");
        }
        path
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn discovery_uses_xdg_then_home() {
        assert_eq!(
            discover_config_path(Some(Path::new("/xdg")), Some(Path::new("/home/me"))),
            Ok(PathBuf::from("/xdg/image-adjuster/config.json"))
        );
        assert_eq!(
            discover_config_path(Some(Path::new("")), Some(Path::new("/home/me"))),
            Ok(PathBuf::from("/home/me/.config/image-adjuster/config.json"))
        );
        assert_eq!(
            discover_config_path(None, None),
            Err(ConfigPathError::MissingHomeDirectory)
        );
    }

    #[test]
    fn missing_explicit_file_yields_defaults() {
        let path = scratch_file("missing", None);
        let config = load_app_config(Some(&path));
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.output_filename, "output.png");
        assert_eq!(config.placement_click, PlacementClickPolicy::Ignore);
        cleanup(&path);
    }

    #[test]
    fn partial_config_overrides_only_given_fields() {
        let path = scratch_file(
            "partial",
            Some(r#"{"server_url": "http://compositor:9000", "placement_click": "relocate"}"#),
        );
        let config = load_app_config(Some(&path));
        assert_eq!(config.server_url, "http://compositor:9000");
        assert_eq!(config.placement_click, PlacementClickPolicy::Relocate);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.cache_bust_output);
        cleanup(&path);
    }

    #[test]
    fn malformed_config_falls_back_to_defaults() {
        let path = scratch_file("malformed", Some("{ not json"));
        assert_eq!(load_app_config(Some(&path)), AppConfig::default());
        cleanup(&path);
    }

    #[test]
    fn zero_timeout_is_raised_to_one_second() {
        let path = scratch_file("timeout", Some(r#"{"request_timeout_secs": 0}"#));
        assert_eq!(
            load_app_config(Some(&path)).request_timeout(),
            Duration::from_secs(1)
        );
        cleanup(&path);
    }
}
