//! Error types for foreign memory access and attachment

use super::Address;
use std::fmt;
use std::io;
use thiserror::Error;

/// Main error type for memory operations
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Invalid memory address: {0}")]
    InvalidAddress(String),

    #[error("Request of {size} bytes at {address} exceeds the {max} byte ceiling")]
    SizeOutOfBounds {
        address: Address,
        size: usize,
        max: usize,
    },

    #[error("Incomplete read at {address}: expected {expected} bytes, got {actual}")]
    IncompleteRead {
        address: Address,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to read {size} bytes at {address}: {source}")]
    ReadFailed {
        address: Address,
        size: usize,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write memory at {address}: {reason}")]
    WriteFailed { address: Address, reason: String },

    #[error("Null pointer read at {0}")]
    NullPointer(Address),

    #[error("Pointer chain broken at level {level} ({address} + 0x{offset:X}): {source}")]
    PointerChainBroken {
        level: usize,
        address: Address,
        offset: u64,
        #[source]
        source: Box<MemoryError>,
    },

    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    #[error("Target process {0} is gone")]
    ProcessGone(u32),

    #[error("Fatal internal error: {0}")]
    Fatal(String),

    #[cfg(windows)]
    #[error("Windows API error: {0}")]
    WindowsApiError(#[from] windows::core::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Result type alias for memory operations
pub type MemoryResult<T> = Result<T, MemoryError>;

impl MemoryError {
    /// Creates a Windows API error from the calling thread's last error code
    #[cfg(windows)]
    pub fn last_os_error() -> Self {
        MemoryError::WindowsApiError(windows::core::Error::from_win32())
    }

    /// Creates a read failed error
    pub fn read_failed(address: Address, size: usize, source: io::Error) -> Self {
        MemoryError::ReadFailed {
            address,
            size,
            source,
        }
    }

    /// Creates a write failed error
    pub fn write_failed(address: Address, reason: impl fmt::Display) -> Self {
        MemoryError::WriteFailed {
            address,
            reason: reason.to_string(),
        }
    }

    /// Creates a pointer chain broken error
    pub fn pointer_chain_broken(
        level: usize,
        address: Address,
        offset: u64,
        source: MemoryError,
    ) -> Self {
        MemoryError::PointerChainBroken {
            level,
            address,
            offset,
            source: Box::new(source),
        }
    }

    /// True when a dereference produced zero, directly or as the cause of a broken chain
    pub fn is_null_pointer(&self) -> bool {
        match self {
            MemoryError::NullPointer(_) => true,
            MemoryError::PointerChainBroken { source, .. } => source.is_null_pointer(),
            _ => false,
        }
    }

    /// True for failures that are local to one operation and safe to retry next cycle
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, MemoryError::Fatal(_) | MemoryError::ProcessGone(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MemoryError::InvalidAddress("0xDEADBEEF".to_string());
        assert_eq!(err.to_string(), "Invalid memory address: 0xDEADBEEF");

        let err = MemoryError::SizeOutOfBounds {
            address: Address::new(0x1000),
            size: 10,
            max: 4,
        };
        assert_eq!(
            err.to_string(),
            "Request of 10 bytes at 0x1000 exceeds the 4 byte ceiling"
        );

        let err = MemoryError::IncompleteRead {
            address: Address::new(0x2000),
            expected: 8,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Incomplete read at 0x2000: expected 8 bytes, got 3"
        );
    }

    #[test]
    fn test_read_failed_keeps_os_code() {
        let err = MemoryError::read_failed(
            Address::new(0x10),
            4,
            io::Error::from_raw_os_error(299),
        );
        match &err {
            MemoryError::ReadFailed { source, size, .. } => {
                assert_eq!(source.raw_os_error(), Some(299));
                assert_eq!(*size, 4);
            }
            _ => panic!("Wrong error type"),
        }
        assert!(err.to_string().contains("0x10"));
    }

    #[test]
    fn test_null_pointer_classification() {
        let null = MemoryError::NullPointer(Address::new(0x40));
        assert!(null.is_null_pointer());

        let chained =
            MemoryError::pointer_chain_broken(2, Address::new(0x1000), 0x18, null);
        assert!(chained.is_null_pointer());
        assert!(chained.to_string().contains("level 2"));
        assert!(chained.to_string().contains("0x1000 + 0x18"));

        let incomplete = MemoryError::IncompleteRead {
            address: Address::new(0x40),
            expected: 8,
            actual: 0,
        };
        assert!(!incomplete.is_null_pointer());
    }

    #[test]
    fn test_recoverable() {
        assert!(MemoryError::NullPointer(Address::null()).is_recoverable());
        assert!(MemoryError::write_failed(Address::new(1), "denied").is_recoverable());
        assert!(!MemoryError::ProcessGone(42).is_recoverable());
        assert!(!MemoryError::Fatal("broken".into()).is_recoverable());
    }

    #[test]
    fn test_from_io() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "test");
        let mem_err: MemoryError = io_err.into();
        assert!(matches!(mem_err, MemoryError::IoError(_)));
    }
}
