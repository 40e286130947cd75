//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::GlobalConfig;
use crate::project::{ProjectConfig, ReporterConfig};
use crate::{validate_poll_interval, ConfigError, ConfigResult};
use crate::{DEFAULT_POLL_INTERVAL_MS, PROJECT_CONFIG_FILE};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.hiro/config.toml) - lowest priority
/// 2. Project config (./hiro.toml) - overrides global
/// 3. Environment variables (HIRO_*) - overrides project
/// 4. Explicit arguments - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Project configuration (with environment overrides applied)
    pub project: ProjectConfig,

    /// Global configuration
    pub global: GlobalConfig,

    /// Project root directory (where hiro.toml was found)
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use an explicit global config file instead of ~/.hiro/config.toml
    pub fn with_global_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find hiro.toml, then loads and merges
    /// global config if it exists.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;

        // Load global config (optional)
        let global_config = self.load_global_config().unwrap_or_default();

        let project_config = self.apply_env_overrides(project_config)?;

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let global_config = self.load_global_config().unwrap_or_default();
        let project_config = self.apply_env_overrides(project_config)?;

        let project_root = config_path.parent().map(|p| p.to_path_buf());

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
        })
    }

    /// Find project configuration by walking up directory tree
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_CONFIG_FILE);

            if config_path.exists() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    /// Load global configuration from ~/.hiro/config.toml
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => {
                let path = GlobalConfig::global_config_path()?;
                self.global_config_path = Some(path.clone());
                path
            }
        };

        // Global config is optional - if it doesn't exist, return default
        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        GlobalConfig::load_from_file(&path)
    }

    /// Apply environment variable overrides to project config
    ///
    /// Recognized variables: HIRO_POLL_INTERVAL_MS, HIRO_SUITE,
    /// HIRO_VERBOSE, HIRO_NO_COLOR
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if let Ok(raw) = env::var("HIRO_POLL_INTERVAL_MS") {
            let millis = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidValue {
                    field: "HIRO_POLL_INTERVAL_MS".to_string(),
                    reason: format!("'{}' is not a number: {}", raw, e),
                })?;
            validate_poll_interval("HIRO_POLL_INTERVAL_MS", millis)?;
            config.runner_mut().poll_interval_ms = Some(millis);
        }

        if let Ok(suite) = env::var("HIRO_SUITE") {
            if !suite.is_empty() {
                config.runner_mut().suite = Some(suite);
            }
        }

        if let Ok(verbose) = env::var("HIRO_VERBOSE") {
            config.reporter_mut().verbose = Some(is_truthy(&verbose));
        }

        if let Ok(no_color) = env::var("HIRO_NO_COLOR") {
            config.reporter_mut().color = Some(!is_truthy(&no_color));
        }

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

impl Config {
    /// Effective scheduler poll period (project > default)
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.project
                .poll_interval_ms()
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
        )
    }

    /// Suite filter, if one was configured
    pub fn suite_filter(&self) -> Option<&str> {
        self.project.suite()
    }

    /// Reporter settings with project values laid over global ones
    pub fn reporter(&self) -> ReporterConfig {
        let mut reporter = self.global.reporter.clone().unwrap_or_default();
        if let Some(project) = &self.project.reporter {
            reporter.merge(project);
        }
        reporter
    }

    /// Whether the reporter prints one line per test (project > global > false)
    pub fn verbose(&self) -> bool {
        self.reporter().verbose.unwrap_or(false)
    }

    /// Whether the reporter colorizes output (project > global > true)
    pub fn color(&self) -> bool {
        self.reporter().color.unwrap_or(true)
    }

    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if this is a project (has hiro.toml)
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }
}
