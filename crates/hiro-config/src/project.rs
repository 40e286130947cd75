//! Project Configuration (hiro.toml)
//!
//! Handles project-level configuration stored in `hiro.toml` at the project root.

use crate::{validate_poll_interval, ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Project configuration from hiro.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Scheduler settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner: Option<RunnerConfig>,

    /// Console reporter settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter: Option<ReporterConfig>,
}

/// Scheduler settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// Poll period of the scheduler loop in milliseconds (default: 100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,

    /// Only run the suite with this exact name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suite: Option<String>,
}

/// Console reporter settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ReporterConfig {
    /// Print one line per test instead of progress dots
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,

    /// Colorize output (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,
}

impl ReporterConfig {
    /// Overlay the non-None values of `other` onto this config
    pub fn merge(&mut self, other: &ReporterConfig) {
        if other.verbose.is_some() {
            self.verbose = other.verbose;
        }
        if other.color.is_some() {
            self.color = other.color;
        }
    }
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(runner) = &self.runner {
            if let Some(ms) = runner.poll_interval_ms {
                validate_poll_interval("runner.poll_interval_ms", ms)?;
            }
            if let Some(suite) = &runner.suite {
                if suite.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: "runner.suite".to_string(),
                        reason: "suite name cannot be empty".to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Get the configured poll period, if present
    pub fn poll_interval_ms(&self) -> Option<u64> {
        self.runner.as_ref().and_then(|r| r.poll_interval_ms)
    }

    /// Get the configured suite filter, if present
    pub fn suite(&self) -> Option<&str> {
        self.runner.as_ref().and_then(|r| r.suite.as_deref())
    }

    /// Mutable access to the runner table, creating it when absent
    pub fn runner_mut(&mut self) -> &mut RunnerConfig {
        self.runner.get_or_insert_with(RunnerConfig::default)
    }

    /// Mutable access to the reporter table, creating it when absent
    pub fn reporter_mut(&mut self) -> &mut ReporterConfig {
        self.reporter.get_or_insert_with(ReporterConfig::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_minimal_project_config() {
        let config: ProjectConfig = toml::from_str("").unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_project_config() {
        let toml = r#"
[runner]
poll_interval_ms = 25
suite = "parser"

[reporter]
verbose = true
color = false
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval_ms(), Some(25));
        assert_eq!(config.suite(), Some("parser"));
        assert_eq!(
            config.reporter,
            Some(ReporterConfig {
                verbose: Some(true),
                color: Some(false),
            })
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = r#"
[runner]
poll_interval = 25
"#;
        assert!(toml::from_str::<ProjectConfig>(toml).is_err());
    }

    #[test]
    fn test_zero_poll_interval_invalid() {
        let config = ProjectConfig {
            runner: Some(RunnerConfig {
                poll_interval_ms: Some(0),
                suite: None,
            }),
            ..Default::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_empty_suite_filter_invalid() {
        let config = ProjectConfig {
            runner: Some(RunnerConfig {
                poll_interval_ms: None,
                suite: Some(String::new()),
            }),
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }
}
