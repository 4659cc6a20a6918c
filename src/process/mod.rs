//! Process discovery and attachment
//!
//! [`ProcessLocator`] is the seam between the supervisor and the OS: find a
//! process by name, open its memory, and resolve a module base. The
//! [`SystemLocator`] implements it against the running system.

#[cfg(any(windows, target_os = "linux"))]
pub mod enumerator;
#[cfg(any(windows, target_os = "linux"))]
pub mod handle;

#[cfg(any(windows, target_os = "linux"))]
pub use enumerator::{enumerate_processes, find_module, find_process_by_name};
#[cfg(any(windows, target_os = "linux"))]
pub use handle::ProcessHandle;

use crate::core::types::{MemoryResult, ModuleInfo, ProcessId, ProcessInfo};
use crate::memory::ProcessMemory;
use std::sync::Arc;

/// Finds and opens target processes
pub trait ProcessLocator: Send + 'static {
    /// Look up a running process by name
    fn find_process(&mut self, name: &str) -> MemoryResult<Option<ProcessInfo>>;

    /// Open the memory of a found process
    fn open(&mut self, process: &ProcessInfo) -> MemoryResult<Arc<dyn ProcessMemory>>;

    /// Resolve a loaded module of process `pid`
    fn find_module(&mut self, pid: ProcessId, name: &str) -> MemoryResult<Option<ModuleInfo>>;
}

/// [`ProcessLocator`] backed by the host OS
#[cfg(any(windows, target_os = "linux"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLocator;

#[cfg(any(windows, target_os = "linux"))]
impl ProcessLocator for SystemLocator {
    fn find_process(&mut self, name: &str) -> MemoryResult<Option<ProcessInfo>> {
        find_process_by_name(name)
    }

    fn open(&mut self, process: &ProcessInfo) -> MemoryResult<Arc<dyn ProcessMemory>> {
        Ok(Arc::new(ProcessHandle::open(process.pid)?))
    }

    fn find_module(&mut self, pid: ProcessId, name: &str) -> MemoryResult<Option<ModuleInfo>> {
        find_module(pid, name)
    }
}
