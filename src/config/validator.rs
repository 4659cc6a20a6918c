//! Configuration validator for memlink
//!
//! Validates configuration values to ensure they are within acceptable ranges.

use super::loader::{Config, ConfigError, LoggingConfig, MemoryConfig, SupervisorSettings, TargetConfig};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the entire configuration
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        Self::validate_target(&config.target)?;
        Self::validate_memory(&config.memory)?;
        Self::validate_supervisor(&config.supervisor)?;
        Self::validate_logging(&config.logging)?;
        Ok(())
    }

    fn validate_target(target: &TargetConfig) -> Result<(), ConfigError> {
        if target.process_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "Target process name cannot be empty".to_string(),
            ));
        }
        if target.module_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "Target module name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_memory(memory: &MemoryConfig) -> Result<(), ConfigError> {
        if memory.page_size == 0 || !memory.page_size.is_power_of_two() {
            return Err(ConfigError::Invalid(
                "Page size must be a power of 2".to_string(),
            ));
        }

        if memory.max_read_pages == 0 {
            return Err(ConfigError::Invalid(
                "Maximum read pages must be at least 1".to_string(),
            ));
        }

        // The 32-bit length field must end before the character data starts
        if memory.string_data_offset < memory.string_length_offset.saturating_add(4) {
            return Err(ConfigError::Invalid(format!(
                "String data offset 0x{:X} overlaps the length field at 0x{:X}",
                memory.string_data_offset, memory.string_length_offset
            )));
        }

        Ok(())
    }

    fn validate_supervisor(supervisor: &SupervisorSettings) -> Result<(), ConfigError> {
        if supervisor.process_retry_ms == 0 {
            return Err(ConfigError::Invalid(
                "Process retry interval must be greater than 0".to_string(),
            ));
        }
        if supervisor.module_retry_ms == 0 {
            return Err(ConfigError::Invalid(
                "Module retry interval must be greater than 0".to_string(),
            ));
        }
        if supervisor.diagnostics_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "Diagnostics interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                logging.level, valid_levels
            )));
        }
        Ok(())
    }
}

/// Validates a configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    ConfigValidator::validate(config)
}
