//! Configuration loading and typed config structures for the `cuemark` tool.
//!
//! The configuration lives in `cuemark.yaml` in the working directory (or
//! wherever `--config` points). Every section and key is optional; a missing
//! file means defaults throughout.
//!
//! ```yaml
//! timeline:
//!   fps: 24
//!   start_frame: 1
//! session:
//!   path: cuemark-session.json
//! logging:
//!   level: info
//!   json: false
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use cuemark_timeline::DEFAULT_FPS;
use cuemark_types::Frame;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "cuemark.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is not acceptable.
    #[error("invalid config value for {key}: {reason}")]
    Invalid {
        /// Dotted key of the offending value.
        key: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CuemarkConfig {
    /// Timeline settings.
    #[serde(default)]
    pub timeline: TimelineConfig,

    /// Session file settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CuemarkConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `CUEMARK_SESSION` overrides `session.path`
    /// - `CUEMARK_FPS` overrides `timeline.fps`
    /// - `CUEMARK_LOG` overrides `logging.level`
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides and validate.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Self::parse_with(yaml, |key| std::env::var(key).ok())
    }

    /// [`CuemarkConfig::parse`] with overrides read through `lookup`
    /// instead of the process environment.
    pub fn parse_with(
        yaml: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults (still
    /// subject to environment overrides).
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Self::parse("")
        }
    }

    /// Apply `CUEMARK_*` overrides, reading each variable through `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("CUEMARK_SESSION") {
            self.session.path = PathBuf::from(val);
        }
        if let Some(val) = lookup("CUEMARK_FPS") {
            self.timeline.fps = val.trim().parse().map_err(|_parse| ConfigError::Invalid {
                key: "timeline.fps",
                reason: format!("CUEMARK_FPS={val} is not a positive integer"),
            })?;
        }
        if let Some(val) = lookup("CUEMARK_LOG") {
            self.logging.level = val;
        }
        Ok(())
    }

    /// Reject values the tool cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeline.fps == 0 {
            return Err(ConfigError::Invalid {
                key: "timeline.fps",
                reason: "must be greater than zero".to_owned(),
            });
        }
        if self.session.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                key: "session.path",
                reason: "must not be empty".to_owned(),
            });
        }
        Ok(())
    }
}

/// Timeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimelineConfig {
    /// Frames per second, used for the `time` key of events exports.
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Frame cursor of a freshly created session.
    #[serde(default = "default_start_frame")]
    pub start_frame: Frame,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            start_frame: default_start_frame(),
        }
    }
}

const fn default_fps() -> u32 {
    DEFAULT_FPS
}

const fn default_start_frame() -> Frame {
    1
}

/// Session file configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Where the store is kept between invocations.
    #[serde(default = "default_session_path")]
    pub path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: default_session_path(),
        }
    }
}

fn default_session_path() -> PathBuf {
    PathBuf::from("cuemark-session.json")
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines instead of human-readable ones.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CuemarkConfig::default();
        assert_eq!(config.timeline.fps, 24);
        assert_eq!(config.timeline.start_frame, 1);
        assert_eq!(config.session.path, PathBuf::from("cuemark-session.json"));
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = "
timeline:
  fps: 30
  start_frame: 100
session:
  path: shots/sh010.json
logging:
  level: debug
  json: true
";
        let config: Result<CuemarkConfig, _> = serde_yml::from_str(yaml);
        assert!(config.is_ok());
        if let Ok(config) = config {
            assert_eq!(config.timeline.fps, 30);
            assert_eq!(config.timeline.start_frame, 100);
            assert_eq!(config.session.path, PathBuf::from("shots/sh010.json"));
            assert_eq!(config.logging.level, "debug");
            assert!(config.logging.json);
        }
    }

    #[test]
    fn parse_partial_yaml_fills_defaults() {
        let config: Result<CuemarkConfig, _> = serde_yml::from_str("timeline:\n  fps: 60\n");
        let config = config.ok().unwrap_or_default();
        assert_eq!(config.timeline.fps, 60);
        assert_eq!(config.timeline.start_frame, 1);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn zero_fps_is_rejected() {
        let mut config = CuemarkConfig::default();
        config.timeline.fps = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                key: "timeline.fps",
                ..
            })
        ));
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let result: Result<CuemarkConfig, ConfigError> = serde_yml::from_str::<CuemarkConfig>(
            "timeline: [unclosed",
        )
        .map_err(ConfigError::from);
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    fn env<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value).to_owned())
        }
    }

    #[test]
    fn env_overrides_win_over_yaml() {
        let vars = [
            ("CUEMARK_SESSION", "shots/sh020.json"),
            ("CUEMARK_FPS", " 25 "),
            ("CUEMARK_LOG", "cuemark_timeline=debug"),
        ];
        let config = CuemarkConfig::parse_with("timeline:\n  fps: 60\n", env(&vars));
        assert!(config.is_ok());
        if let Ok(config) = config {
            assert_eq!(config.timeline.fps, 25);
            assert_eq!(config.session.path, PathBuf::from("shots/sh020.json"));
            assert_eq!(config.logging.level, "cuemark_timeline=debug");
        }
    }

    #[test]
    fn no_overrides_keeps_yaml() {
        let config = CuemarkConfig::parse_with("timeline:\n  fps: 60\n", env(&[]));
        assert_eq!(config.ok().map(|c| c.timeline.fps), Some(60));
    }

    #[test]
    fn invalid_env_overrides_are_rejected() {
        let zero = CuemarkConfig::parse_with("", env(&[("CUEMARK_FPS", "0")]));
        assert!(matches!(
            zero,
            Err(ConfigError::Invalid {
                key: "timeline.fps",
                ..
            })
        ));

        let word = CuemarkConfig::parse_with("", env(&[("CUEMARK_FPS", "fast")]));
        assert!(matches!(
            word,
            Err(ConfigError::Invalid {
                key: "timeline.fps",
                ..
            })
        ));

        let empty = CuemarkConfig::parse_with("", env(&[("CUEMARK_SESSION", "")]));
        assert!(matches!(
            empty,
            Err(ConfigError::Invalid {
                key: "session.path",
                ..
            })
        ));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir();
        assert!(dir.is_ok());
        if let Ok(dir) = dir {
            let config = CuemarkConfig::load_or_default(&dir.path().join("cuemark.yaml"));
            assert!(config.is_ok());
        }
    }
}
