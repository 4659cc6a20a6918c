//! Process and module enumeration using ToolHelp32 snapshots

use super::{wide_to_string, Handle};
use crate::core::types::{Address, MemoryError, MemoryResult, ModuleInfo, ProcessId, ProcessInfo};
use std::mem;
use std::path::PathBuf;
use winapi::shared::minwindef::FALSE;
use winapi::um::tlhelp32::{
    CreateToolhelp32Snapshot, Module32FirstW, Module32NextW, Process32FirstW, Process32NextW,
    MODULEENTRY32W, PROCESSENTRY32W, TH32CS_SNAPMODULE, TH32CS_SNAPMODULE32, TH32CS_SNAPPROCESS,
};

fn snapshot(flags: u32, pid: ProcessId) -> MemoryResult<Handle> {
    let handle = Handle::new(unsafe { CreateToolhelp32Snapshot(flags, pid) });
    if !handle.is_valid() {
        return Err(MemoryError::last_os_error());
    }
    Ok(handle)
}

/// Enumerate all running processes
pub fn processes() -> MemoryResult<Vec<ProcessInfo>> {
    let snapshot = snapshot(TH32CS_SNAPPROCESS, 0)?;
    let mut processes = Vec::new();

    unsafe {
        let mut entry: PROCESSENTRY32W = mem::zeroed();
        entry.dwSize = mem::size_of::<PROCESSENTRY32W>() as u32;

        let mut more = Process32FirstW(snapshot.raw(), &mut entry);
        while more != FALSE {
            processes.push(ProcessInfo::new(
                entry.th32ProcessID,
                wide_to_string(&entry.szExeFile),
            ));
            more = Process32NextW(snapshot.raw(), &mut entry);
        }
    }

    Ok(processes)
}

/// Enumerate the modules loaded in process `pid`
pub fn modules(pid: ProcessId) -> MemoryResult<Vec<ModuleInfo>> {
    let snapshot = snapshot(TH32CS_SNAPMODULE | TH32CS_SNAPMODULE32, pid)?;
    let mut modules = Vec::new();

    unsafe {
        let mut entry: MODULEENTRY32W = mem::zeroed();
        entry.dwSize = mem::size_of::<MODULEENTRY32W>() as u32;

        let mut more = Module32FirstW(snapshot.raw(), &mut entry);
        while more != FALSE {
            let mut module = ModuleInfo::new(
                wide_to_string(&entry.szModule),
                Address::new(entry.modBaseAddr as usize as u64),
                entry.modBaseSize as usize,
            );
            module.path = Some(PathBuf::from(wide_to_string(&entry.szExePath)));
            modules.push(module);
            more = Module32NextW(snapshot.raw(), &mut entry);
        }
    }

    Ok(modules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_process_listed() {
        let pid = std::process::id();
        let processes = processes().unwrap();
        assert!(processes.iter().any(|p| p.pid == pid));
    }

    #[test]
    fn test_current_process_modules() {
        let modules = modules(std::process::id()).unwrap();
        assert!(modules.iter().any(|m| m.name_matches("kernel32.dll")));
        assert!(modules.iter().all(|m| !m.base_address.is_null()));
    }
}
