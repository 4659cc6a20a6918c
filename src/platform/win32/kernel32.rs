//! Kernel32 process and memory functions

use super::Handle;
use crate::core::types::{MemoryError, MemoryResult, ProcessId};
use std::io;
use winapi::shared::minwindef::{DWORD, FALSE, LPCVOID, LPVOID};
use winapi::um::memoryapi::{ReadProcessMemory, WriteProcessMemory};
use winapi::um::minwinbase::STILL_ACTIVE;
use winapi::um::processthreadsapi::{GetExitCodeProcess, OpenProcess};
use winapi::um::winnt::{
    PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_VM_OPERATION, PROCESS_VM_READ, PROCESS_VM_WRITE,
};

/// Access mask for an attachment: read, write and liveness queries
pub const ATTACH_ACCESS: DWORD = PROCESS_VM_READ
    | PROCESS_VM_WRITE
    | PROCESS_VM_OPERATION
    | PROCESS_QUERY_LIMITED_INFORMATION;

/// Safe wrapper for OpenProcess
pub fn open_process(pid: ProcessId, desired_access: DWORD) -> MemoryResult<Handle> {
    let handle = unsafe { OpenProcess(desired_access, FALSE, pid) };
    if handle.is_null() {
        return Err(MemoryError::InvalidHandle(format!(
            "OpenProcess failed for PID {}: {}",
            pid,
            io::Error::last_os_error()
        )));
    }
    Ok(Handle::new(handle))
}

/// Safe wrapper for ReadProcessMemory
///
/// Returns the number of bytes copied. A partial copy across a page
/// boundary is reported by Windows as failure with a non-zero count, which
/// is passed up as a short read.
pub fn read_process_memory(handle: &Handle, address: u64, buffer: &mut [u8]) -> io::Result<usize> {
    let mut bytes_read = 0;
    let result = unsafe {
        ReadProcessMemory(
            handle.raw(),
            address as usize as LPCVOID,
            buffer.as_mut_ptr() as LPVOID,
            buffer.len(),
            &mut bytes_read,
        )
    };

    if result == FALSE && bytes_read == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(bytes_read)
}

/// Safe wrapper for WriteProcessMemory
pub fn write_process_memory(handle: &Handle, address: u64, data: &[u8]) -> io::Result<usize> {
    let mut bytes_written = 0;
    let result = unsafe {
        WriteProcessMemory(
            handle.raw(),
            address as usize as LPVOID,
            data.as_ptr() as LPCVOID,
            data.len(),
            &mut bytes_written,
        )
    };

    if result == FALSE && bytes_written == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(bytes_written)
}

/// True while the process behind `handle` has not exited
pub fn is_process_running(handle: &Handle) -> bool {
    let mut exit_code: DWORD = 0;
    let result = unsafe { GetExitCodeProcess(handle.raw(), &mut exit_code) };
    result != FALSE && exit_code == STILL_ACTIVE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_invalid_pid() {
        assert!(matches!(
            open_process(0, ATTACH_ACCESS),
            Err(MemoryError::InvalidHandle(_))
        ));
    }

    #[test]
    fn test_null_handle_operations() {
        let handle = Handle::null();
        let mut buffer = [0u8; 4];
        assert!(read_process_memory(&handle, 0x1000, &mut buffer).is_err());
        assert!(write_process_memory(&handle, 0x1000, &buffer).is_err());
        assert!(!is_process_running(&handle));
    }

    #[test]
    fn test_current_process_round_trip() {
        let handle = open_process(std::process::id(), ATTACH_ACCESS).unwrap();
        assert!(is_process_running(&handle));

        let value = 0x1122_3344_5566_7788u64;
        let mut buffer = [0u8; 8];
        let read = read_process_memory(&handle, &value as *const u64 as u64, &mut buffer).unwrap();
        assert_eq!(read, 8);
        assert_eq!(u64::from_le_bytes(buffer), value);
    }
}
