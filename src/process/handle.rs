//! Owned handle on a target process, implementing [`ProcessMemory`]

use crate::core::types::{Address, MemoryResult, ProcessId};
use crate::memory::ProcessMemory;
use std::fmt;
use std::io;

#[cfg(target_os = "linux")]
use crate::platform::procfs;
#[cfg(windows)]
use crate::platform::win32::{kernel32, Handle};

/// Safe wrapper around an OS process handle
///
/// Valid only while the target is alive; a new handle is opened on every
/// attachment.
pub struct ProcessHandle {
    pid: ProcessId,
    #[cfg(windows)]
    handle: Handle,
    #[cfg(target_os = "linux")]
    mem: procfs::MemFile,
}

impl ProcessHandle {
    /// Open a process for reading and writing memory
    #[cfg(windows)]
    pub fn open(pid: ProcessId) -> MemoryResult<Self> {
        let handle = kernel32::open_process(pid, kernel32::ATTACH_ACCESS)?;
        Ok(ProcessHandle { pid, handle })
    }

    /// Open a process for reading and writing memory
    #[cfg(target_os = "linux")]
    pub fn open(pid: ProcessId) -> MemoryResult<Self> {
        let mem = procfs::MemFile::open(pid).map_err(|e| {
            crate::core::types::MemoryError::InvalidHandle(format!(
                "cannot open memory of PID {}: {}",
                pid, e
            ))
        })?;
        if !mem.is_writable() {
            tracing::warn!(pid, "memory opened read-only, writes will fail");
        }
        Ok(ProcessHandle { pid, mem })
    }

    /// Get the process ID
    pub fn pid(&self) -> ProcessId {
        self.pid
    }
}

impl ProcessMemory for ProcessHandle {
    fn pid(&self) -> ProcessId {
        self.pid
    }

    fn read_memory(&self, address: Address, buffer: &mut [u8]) -> io::Result<usize> {
        #[cfg(windows)]
        {
            kernel32::read_process_memory(&self.handle, address.as_u64(), buffer)
        }
        #[cfg(target_os = "linux")]
        {
            self.mem.read_at(address.as_u64(), buffer)
        }
    }

    fn write_memory(&self, address: Address, data: &[u8]) -> io::Result<usize> {
        #[cfg(windows)]
        {
            kernel32::write_process_memory(&self.handle, address.as_u64(), data)
        }
        #[cfg(target_os = "linux")]
        {
            self.mem.write_at(address.as_u64(), data)
        }
    }

    fn is_alive(&self) -> bool {
        #[cfg(windows)]
        {
            kernel32::is_process_running(&self.handle)
        }
        #[cfg(target_os = "linux")]
        {
            procfs::is_running(self.pid)
        }
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcessHandle(pid={})", self.pid)
    }
}
