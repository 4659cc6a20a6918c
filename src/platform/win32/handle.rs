//! Owned HANDLE with automatic cleanup

use std::ptr;
use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
use winapi::um::winnt::HANDLE;

/// Owned Windows HANDLE, closed on drop
pub struct Handle {
    handle: HANDLE,
}

impl Handle {
    /// Wrap a raw handle; null and `INVALID_HANDLE_VALUE` both count as invalid
    pub fn new(handle: HANDLE) -> Self {
        Handle { handle }
    }

    pub fn null() -> Self {
        Handle {
            handle: ptr::null_mut(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.handle.is_null() && self.handle != INVALID_HANDLE_VALUE
    }

    /// The raw handle, valid for as long as `self` lives
    pub fn raw(&self) -> HANDLE {
        self.handle
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if self.is_valid() {
            unsafe {
                CloseHandle(self.handle);
            }
        }
    }
}

// Kernel handles are process-wide; the memory functions are thread-safe
unsafe impl Send for Handle {}
unsafe impl Sync for Handle {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_handle() {
        let handle = Handle::null();
        assert!(!handle.is_valid());
        assert_eq!(handle.raw(), ptr::null_mut());
    }

    #[test]
    fn test_invalid_handle_value() {
        let handle = Handle::new(INVALID_HANDLE_VALUE);
        assert!(!handle.is_valid());
    }
}
