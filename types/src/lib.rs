//! Shared configuration types for turnlog.
//!
//! Kept free of I/O so the CLI and any future viewer tooling can depend on
//! the same definitions. Loading and saving live in `turnlog-core`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Marker the game-side Lua script prefixes to every protocol line.
pub const DEFAULT_MARKER: &str = "CIV5_DATA_JSON::";

/// Longest game identity (in characters) derived from a signature.
pub const DEFAULT_MAX_IDENTITY_LEN: usize = 50;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Game log file that is tailed for protocol lines.
    pub log_path: PathBuf,
    /// Root directory holding one subdirectory per game.
    pub replays_dir: PathBuf,
    /// Where `export` writes the viewer script.
    pub export_path: PathBuf,
    pub poll_interval_ms: u64,
    pub marker: String,
    pub max_identity_len: usize,
}

impl AppConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
            replays_dir: PathBuf::from("replays"),
            export_path: PathBuf::from("frontend").join("data.js"),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            marker: DEFAULT_MARKER.to_string(),
            max_identity_len: DEFAULT_MAX_IDENTITY_LEN,
        }
    }
}

/// `<Documents>/My Games/Sid Meier's Civilization 5/Logs/Lua.log`, falling
/// back to the home directory when no documents folder is known.
pub fn default_log_path() -> PathBuf {
    dirs::document_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Documents")))
        .unwrap_or_default()
        .join("My Games")
        .join("Sid Meier's Civilization 5")
        .join("Logs")
        .join("Lua.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml = r#"
replays_dir = "/tmp/replays"
poll_interval_ms = 250
"#;

        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.replays_dir, PathBuf::from("/tmp/replays"));
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.marker, DEFAULT_MARKER);
        assert_eq!(config.max_identity_len, DEFAULT_MAX_IDENTITY_LEN);
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = AppConfig {
            marker: "MARK ".to_string(),
            ..AppConfig::default()
        };

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_default_log_path_points_at_lua_log() {
        let path = default_log_path();
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("Lua.log"));
        assert!(path.ends_with("Logs/Lua.log"));
    }
}
