//! Process and module discovery

use crate::core::types::{MemoryResult, ModuleInfo, ProcessId, ProcessInfo};

#[cfg(target_os = "linux")]
use crate::platform::procfs;
#[cfg(windows)]
use crate::platform::win32::toolhelp;

/// Enumerate all running processes
pub fn enumerate_processes() -> MemoryResult<Vec<ProcessInfo>> {
    #[cfg(windows)]
    {
        toolhelp::processes()
    }
    #[cfg(target_os = "linux")]
    {
        Ok(procfs::processes()?)
    }
}

/// Find processes by name (case-insensitive, `.exe` optional)
pub fn find_processes_by_name(name: &str) -> MemoryResult<Vec<ProcessInfo>> {
    Ok(enumerate_processes()?
        .into_iter()
        .filter(|p| p.name_matches(name))
        .collect())
}

/// Find a single process by name
pub fn find_process_by_name(name: &str) -> MemoryResult<Option<ProcessInfo>> {
    Ok(find_processes_by_name(name)?.into_iter().next())
}

/// Find module `name` loaded in process `pid`
pub fn find_module(pid: ProcessId, name: &str) -> MemoryResult<Option<ModuleInfo>> {
    #[cfg(windows)]
    {
        Ok(toolhelp::modules(pid)?
            .into_iter()
            .find(|m| m.name_matches(name)))
    }
    #[cfg(target_os = "linux")]
    {
        Ok(procfs::find_module(pid, name)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current_exe_name() -> String {
        std::env::current_exe()
            .unwrap()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn test_current_process_found_by_name() {
        let pid = std::process::id();
        let found = find_processes_by_name(&current_exe_name()).unwrap();
        assert!(found.iter().any(|p| p.pid == pid));
    }

    #[test]
    fn test_missing_process() {
        assert!(find_process_by_name("NonExistentProcess123456")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_own_module() {
        let module = find_module(std::process::id(), &current_exe_name())
            .unwrap()
            .unwrap();
        assert!(module.size > 0);
        assert!(find_module(std::process::id(), "missing_module_42.so")
            .unwrap()
            .is_none());
    }
}
