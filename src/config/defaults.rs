//! Default configuration values for memlink

use crate::memory::{MemoryLimits, StringLayout};
use crate::supervisor::SupervisorConfig;
use serde::{Deserialize, Serialize};

const DEFAULT_PROCESS_NAME: &str = "EscapeFromTarkov";
const DEFAULT_MODULE_NAME: &str = "UnityPlayer.dll";

/// Default configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDefaults {
    pub target: TargetDefaults,
    pub memory: MemoryDefaults,
    pub supervisor: SupervisorDefaults,
    pub logging: LoggingDefaults,
}

/// Default target process and module
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetDefaults {
    pub process_name: String,
    pub module_name: String,
}

/// Default memory access limits and string layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryDefaults {
    pub page_size: usize,
    pub max_read_pages: usize,
    pub string_length_offset: u64,
    pub string_data_offset: u64,
}

/// Default supervisor timings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorDefaults {
    pub process_retry_ms: u64,
    pub module_retry_ms: u64,
    pub session_end_debounce_ms: u64,
    pub min_iteration_interval_us: u64,
    pub diagnostics_interval_secs: u64,
}

/// Default logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingDefaults {
    pub level: String,
}

/// Returns the default configuration
///
/// Memory and timing values come from the runtime types' own defaults.
pub fn default_config() -> ConfigDefaults {
    let limits = MemoryLimits::default();
    let strings = StringLayout::default();
    let runtime = SupervisorConfig::new(DEFAULT_PROCESS_NAME, DEFAULT_MODULE_NAME);

    ConfigDefaults {
        target: TargetDefaults {
            process_name: runtime.process_name.clone(),
            module_name: runtime.module_name.clone(),
        },
        memory: MemoryDefaults {
            page_size: limits.page_size,
            max_read_pages: limits.max_read_pages,
            string_length_offset: strings.length_offset,
            string_data_offset: strings.data_offset,
        },
        supervisor: SupervisorDefaults {
            process_retry_ms: runtime.process_retry.as_millis() as u64,
            module_retry_ms: runtime.module_retry.as_millis() as u64,
            session_end_debounce_ms: runtime.session_end_debounce.as_millis() as u64,
            min_iteration_interval_us: runtime.min_iteration_interval.as_micros() as u64,
            diagnostics_interval_secs: 5,
        },
        logging: LoggingDefaults {
            level: "info".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_defaults() {
        let config = default_config();
        assert_eq!(config.memory.page_size, 4096);
        assert_eq!(config.memory.max_read_pages, 1500);
        assert_eq!(config.memory.string_length_offset, 0x10);
        assert_eq!(config.memory.string_data_offset, 0x14);
    }

    #[test]
    fn test_supervisor_defaults() {
        let config = default_config();
        assert_eq!(config.supervisor.process_retry_ms, 15_000);
        assert_eq!(config.supervisor.session_end_debounce_ms, 100);
    }

    #[test]
    fn test_defaults_match_runtime_types() {
        let config = default_config();
        let runtime = SupervisorConfig::new(
            config.target.process_name.clone(),
            config.target.module_name.clone(),
        );

        assert_eq!(
            MemoryLimits {
                page_size: config.memory.page_size,
                max_read_pages: config.memory.max_read_pages,
            },
            runtime.limits
        );
        assert_eq!(
            StringLayout {
                length_offset: config.memory.string_length_offset,
                data_offset: config.memory.string_data_offset,
            },
            runtime.strings
        );
        assert_eq!(
            std::time::Duration::from_millis(config.supervisor.module_retry_ms),
            runtime.module_retry
        );
        assert_eq!(
            std::time::Duration::from_micros(config.supervisor.min_iteration_interval_us),
            runtime.min_iteration_interval
        );
    }

    #[test]
    fn test_serialization() {
        let config = default_config();
        let serialized = toml::to_string(&config).unwrap();
        assert!(serialized.contains("process_name"));

        let deserialized: ConfigDefaults = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.target.module_name, config.target.module_name);
        assert_eq!(deserialized.memory.page_size, config.memory.page_size);
    }
}
