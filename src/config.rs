//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILDETACH_CONFIG` (environment variable)
//! 2. `~/.config/maildetach/config.toml` (Linux/macOS)
//!    `%APPDATA%\maildetach\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Number of decode workers used when nothing else is configured.
pub const DEFAULT_WORKER_COUNT: usize = 5;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Extraction settings.
    pub extract: ExtractConfig,
    /// Performance tuning.
    pub performance: PerformanceConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Directory for a log file. No file logging when unset.
    pub log_dir: Option<PathBuf>,
}

/// Extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Number of decode workers, also the capacity of the work queue.
    pub worker_count: usize,
    /// Output directory. Defaults to a `detached` sibling of the base directory.
    pub output_dir: Option<PathBuf>,
    /// What to do with an attachment whose body is not valid base64.
    pub on_malformed: FaultPolicy,
}

/// Performance tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Read buffer size in bytes for scanning email files (default: 65536 = 64 KB).
    pub read_buffer_size: usize,
}

/// Handling of malformed attachment bodies found while scanning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FaultPolicy {
    /// Record a fault for the attachment and keep scanning.
    #[default]
    Skip,
    /// Stop the whole run at the first malformed attachment.
    Abort,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            log_dir: None,
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            output_dir: None,
            on_malformed: FaultPolicy::Skip,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 64 * 1024, // 64 KB
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILDETACH_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("maildetach").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.extract.worker_count, 5);
        assert_eq!(cfg.extract.on_malformed, FaultPolicy::Skip);
        assert!(cfg.extract.output_dir.is_none());
        assert_eq!(cfg.performance.read_buffer_size, 65536);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.extract.worker_count, cfg.extract.worker_count);
        assert_eq!(parsed.extract.on_malformed, cfg.extract.on_malformed);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[extract]
worker_count = 8
on_malformed = "abort"
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.extract.worker_count, 8);
        assert_eq!(cfg.extract.on_malformed, FaultPolicy::Abort);
        // Other fields use defaults
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.performance.read_buffer_size, 64 * 1024);
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let bad = "[extract]\non_malformed = \"ignore\"\n";
        assert!(toml::from_str::<Config>(bad).is_err());
    }
}
