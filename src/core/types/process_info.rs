//! Process and module information types

use super::{Address, ProcessId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Information about a running process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: ProcessId,
    pub name: String,
    pub path: Option<PathBuf>,
}

impl ProcessInfo {
    /// Creates a new ProcessInfo with minimal information
    pub fn new(pid: ProcessId, name: impl Into<String>) -> Self {
        ProcessInfo {
            pid,
            name: name.into(),
            path: None,
        }
    }

    /// Attaches the executable path
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Checks if this process matches a name, ignoring case and a trailing `.exe`
    pub fn name_matches(&self, name: &str) -> bool {
        if names_match(&self.name, name) {
            return true;
        }
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(|n| names_match(n, name))
            .unwrap_or(false)
    }
}

/// Information about a loaded module in a process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub name: String,
    pub base_address: Address,
    pub size: usize,
    pub path: Option<PathBuf>,
}

impl ModuleInfo {
    /// Creates a new ModuleInfo
    pub fn new(name: impl Into<String>, base_address: Address, size: usize) -> Self {
        ModuleInfo {
            name: name.into(),
            base_address,
            size,
            path: None,
        }
    }

    /// Checks if an address falls within this module
    pub fn contains_address(&self, address: Address) -> bool {
        address >= self.base_address && address.0 - self.base_address.0 < self.size as u64
    }

    /// Returns the end address (exclusive) of the module
    pub fn end_address(&self) -> Address {
        self.base_address.offset(self.size as u64)
    }

    /// Case-insensitive module name comparison
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

fn names_match(candidate: &str, wanted: &str) -> bool {
    fn strip_exe(name: &str) -> &str {
        let len = name.len();
        if len > 4 && name.is_char_boundary(len - 4) && name[len - 4..].eq_ignore_ascii_case(".exe")
        {
            &name[..len - 4]
        } else {
            name
        }
    }
    strip_exe(candidate).eq_ignore_ascii_case(strip_exe(wanted))
}
