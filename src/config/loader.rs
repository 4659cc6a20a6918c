//! Configuration loader for memlink
//!
//! Handles loading configuration from TOML files and merging with defaults.

use super::defaults::default_config;
use crate::memory::{MemoryLimits, StringLayout};
use crate::supervisor::SupervisorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default configuration file name
pub const CONFIG_FILE: &str = "memlink.toml";

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_target")]
    pub target: TargetConfig,

    #[serde(default = "default_memory")]
    pub memory: MemoryConfig,

    #[serde(default = "default_supervisor")]
    pub supervisor: SupervisorSettings,

    #[serde(default = "default_logging")]
    pub logging: LoggingConfig,
}

/// Target process and module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_process_name")]
    pub process_name: String,
    #[serde(default = "default_module_name")]
    pub module_name: String,
}

/// Memory access limits and managed string layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_max_read_pages")]
    pub max_read_pages: usize,
    #[serde(default = "default_string_length_offset")]
    pub string_length_offset: u64,
    #[serde(default = "default_string_data_offset")]
    pub string_data_offset: u64,
}

/// Supervisor timings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorSettings {
    #[serde(default = "default_process_retry_ms")]
    pub process_retry_ms: u64,
    #[serde(default = "default_module_retry_ms")]
    pub module_retry_ms: u64,
    #[serde(default = "default_session_end_debounce_ms")]
    pub session_end_debounce_ms: u64,
    #[serde(default = "default_min_iteration_interval_us")]
    pub min_iteration_interval_us: u64,
    #[serde(default = "default_diagnostics_interval_secs")]
    pub diagnostics_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Config {
    /// Limits applied to every foreign read
    pub fn memory_limits(&self) -> MemoryLimits {
        MemoryLimits {
            page_size: self.memory.page_size,
            max_read_pages: self.memory.max_read_pages,
        }
    }

    /// Managed string layout
    pub fn string_layout(&self) -> StringLayout {
        StringLayout {
            length_offset: self.memory.string_length_offset,
            data_offset: self.memory.string_data_offset,
        }
    }

    /// Runtime supervisor settings
    pub fn supervisor_config(&self) -> SupervisorConfig {
        let s = &self.supervisor;
        SupervisorConfig {
            process_name: self.target.process_name.clone(),
            module_name: self.target.module_name.clone(),
            process_retry: Duration::from_millis(s.process_retry_ms),
            module_retry: Duration::from_millis(s.module_retry_ms),
            session_end_debounce: Duration::from_millis(s.session_end_debounce_ms),
            min_iteration_interval: Duration::from_micros(s.min_iteration_interval_us),
            limits: self.memory_limits(),
            strings: self.string_layout(),
        }
    }

    /// Interval between diagnostics snapshots
    pub fn diagnostics_interval(&self) -> Duration {
        Duration::from_secs(self.supervisor.diagnostics_interval_secs)
    }
}

/// Configuration loader
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Creates a new configuration loader
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        ConfigLoader {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Loads configuration from file
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.config_path.exists() {
            return Err(ConfigError::FileNotFound(
                self.config_path.display().to_string(),
            ));
        }

        let contents = fs::read_to_string(&self.config_path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Loads configuration, or defaults if the file doesn't exist
    ///
    /// A file that exists but does not parse is still an error.
    pub fn load_or_default(&self) -> Result<Config, ConfigError> {
        match self.load() {
            Err(ConfigError::FileNotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }

    /// Saves configuration to file
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, contents)?;
        Ok(())
    }
}

/// Loads configuration from the default location
pub fn load_config() -> Result<Config, ConfigError> {
    ConfigLoader::new(CONFIG_FILE).load_or_default()
}

// Default functions for serde
fn default_target() -> TargetConfig {
    let defaults = default_config().target;
    TargetConfig {
        process_name: defaults.process_name,
        module_name: defaults.module_name,
    }
}

fn default_memory() -> MemoryConfig {
    let defaults = default_config().memory;
    MemoryConfig {
        page_size: defaults.page_size,
        max_read_pages: defaults.max_read_pages,
        string_length_offset: defaults.string_length_offset,
        string_data_offset: defaults.string_data_offset,
    }
}

fn default_supervisor() -> SupervisorSettings {
    let defaults = default_config().supervisor;
    SupervisorSettings {
        process_retry_ms: defaults.process_retry_ms,
        module_retry_ms: defaults.module_retry_ms,
        session_end_debounce_ms: defaults.session_end_debounce_ms,
        min_iteration_interval_us: defaults.min_iteration_interval_us,
        diagnostics_interval_secs: defaults.diagnostics_interval_secs,
    }
}

fn default_logging() -> LoggingConfig {
    LoggingConfig {
        level: default_config().logging.level,
    }
}

// Individual field defaults
fn default_process_name() -> String {
    default_config().target.process_name
}

fn default_module_name() -> String {
    default_config().target.module_name
}

fn default_page_size() -> usize {
    default_config().memory.page_size
}

fn default_max_read_pages() -> usize {
    default_config().memory.max_read_pages
}

fn default_string_length_offset() -> u64 {
    default_config().memory.string_length_offset
}

fn default_string_data_offset() -> u64 {
    default_config().memory.string_data_offset
}

fn default_process_retry_ms() -> u64 {
    default_config().supervisor.process_retry_ms
}

fn default_module_retry_ms() -> u64 {
    default_config().supervisor.module_retry_ms
}

fn default_session_end_debounce_ms() -> u64 {
    default_config().supervisor.session_end_debounce_ms
}

fn default_min_iteration_interval_us() -> u64 {
    default_config().supervisor.min_iteration_interval_us
}

fn default_diagnostics_interval_secs() -> u64 {
    default_config().supervisor.diagnostics_interval_secs
}

fn default_log_level() -> String {
    default_config().logging.level
}

impl Default for Config {
    fn default() -> Self {
        Config {
            target: default_target(),
            memory: default_memory(),
            supervisor: default_supervisor(),
            logging: default_logging(),
        }
    }
}
