//! Raw accessor over the OS read/write primitives

use super::{MemoryLimits, ProcessMemory};
use crate::core::types::{Address, MemoryError, MemoryResult};
use tracing::trace;

/// Bounds-checked byte access to a foreign address space
///
/// Every read must be satisfied in full: a short count is an
/// [`MemoryError::IncompleteRead`], never a partial success.
#[derive(Clone, Copy)]
pub struct RawAccessor<'a> {
    memory: &'a dyn ProcessMemory,
    limits: MemoryLimits,
}

impl<'a> RawAccessor<'a> {
    /// Create a new accessor with default limits
    pub fn new(memory: &'a dyn ProcessMemory) -> Self {
        Self::with_limits(memory, MemoryLimits::default())
    }

    /// Create a new accessor with explicit limits
    pub fn with_limits(memory: &'a dyn ProcessMemory, limits: MemoryLimits) -> Self {
        RawAccessor { memory, limits }
    }

    /// Limits applied by this accessor
    pub fn limits(&self) -> MemoryLimits {
        self.limits
    }

    /// The underlying process memory
    pub fn memory(&self) -> &'a dyn ProcessMemory {
        self.memory
    }

    fn check_request(&self, address: Address, size: usize) -> MemoryResult<()> {
        let max = self.limits.max_read_size();
        if size > max {
            return Err(MemoryError::SizeOutOfBounds { address, size, max });
        }
        if address.is_null() {
            return Err(MemoryError::InvalidAddress(format!(
                "null address ({} bytes requested)",
                size
            )));
        }
        address.span(size)?;
        Ok(())
    }

    /// Read `size` bytes at `address`
    pub fn read(&self, address: Address, size: usize) -> MemoryResult<Vec<u8>> {
        self.check_request(address, size)?;
        let mut buffer = vec![0u8; size];
        self.read_into(address, &mut buffer)?;
        Ok(buffer)
    }

    /// Fill `buffer` from `address`
    pub fn read_into(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<()> {
        self.check_request(address, buffer.len())?;
        if buffer.is_empty() {
            return Ok(());
        }

        let read = self
            .memory
            .read_memory(address, buffer)
            .map_err(|e| MemoryError::read_failed(address, buffer.len(), e))?;

        if read != buffer.len() {
            return Err(MemoryError::IncompleteRead {
                address,
                expected: buffer.len(),
                actual: read,
            });
        }

        trace!(%address, size = read, "read");
        Ok(())
    }

    /// Fill as much of `buffer` as the target allows, ignoring failures
    ///
    /// Returns the number of bytes copied. Bytes that could not be read are
    /// left untouched.
    pub fn read_best_effort(&self, address: Address, buffer: &mut [u8]) -> usize {
        if self.check_request(address, buffer.len()).is_err() || buffer.is_empty() {
            return 0;
        }
        match self.memory.read_memory(address, buffer) {
            Ok(read) => read.min(buffer.len()),
            Err(err) => {
                trace!(%address, size = buffer.len(), %err, "best-effort read failed");
                0
            }
        }
    }

    /// Write `data` at `address`, returning the number of bytes the OS reported
    pub fn write(&self, address: Address, data: &[u8]) -> MemoryResult<usize> {
        self.check_request(address, data.len())?;
        if data.is_empty() {
            return Ok(0);
        }

        let written = self
            .memory
            .write_memory(address, data)
            .map_err(|e| MemoryError::write_failed(address, format!("{} bytes: {}", data.len(), e)))?;

        trace!(%address, size = written, "write");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockMemory;

    #[test]
    fn test_read_exact() {
        let memory = MockMemory::new(1);
        memory.map_bytes(Address::new(0x1000), &[1, 2, 3, 4]);
        let raw = RawAccessor::new(&memory);

        assert_eq!(raw.read(Address::new(0x1000), 4).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(memory.read_count(), 1);
    }

    #[test]
    fn test_oversized_read_skips_os_call() {
        let memory = MockMemory::new(1);
        let raw = RawAccessor::new(&memory);

        let err = raw
            .read(Address::new(0x1000), PAGE_LIMIT + 1)
            .unwrap_err();
        assert!(matches!(err, MemoryError::SizeOutOfBounds { max, .. } if max == PAGE_LIMIT));
        assert_eq!(memory.read_count(), 0);
    }

    const PAGE_LIMIT: usize = 0x1000 * 1500;

    #[test]
    fn test_null_address_rejected() {
        let memory = MockMemory::new(1);
        let raw = RawAccessor::new(&memory);

        let err = raw.read(Address::null(), 8).unwrap_err();
        assert!(matches!(err, MemoryError::InvalidAddress(_)));
        assert_eq!(memory.read_count(), 0);
    }

    #[test]
    fn test_overflowing_span_rejected() {
        let memory = MockMemory::new(1);
        let raw = RawAccessor::new(&memory);

        let err = raw.read(Address::new(u64::MAX - 3), 8).unwrap_err();
        assert!(matches!(err, MemoryError::InvalidAddress(_)));
    }

    #[test]
    fn test_short_read_is_incomplete() {
        let memory = MockMemory::new(1);
        // Only the first 4 bytes of the page-end read are mapped
        memory.map_bytes(Address::new(0x1FFC), &[9, 9, 9, 9]);
        let raw = RawAccessor::new(&memory);

        let err = raw.read(Address::new(0x1FFC), 8).unwrap_err();
        match err {
            MemoryError::IncompleteRead {
                expected, actual, ..
            } => {
                assert_eq!(expected, 8);
                assert_eq!(actual, 4);
            }
            other => panic!("Expected IncompleteRead, got {other:?}"),
        }
    }

    #[test]
    fn test_unmapped_read_reports_address_and_size() {
        let memory = MockMemory::new(1);
        let raw = RawAccessor::new(&memory);

        let err = raw.read(Address::new(0xDEAD0000), 16).unwrap_err();
        match err {
            MemoryError::ReadFailed { address, size, .. } => {
                assert_eq!(address, Address::new(0xDEAD0000));
                assert_eq!(size, 16);
            }
            other => panic!("Expected ReadFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_length_read() {
        let memory = MockMemory::new(1);
        let raw = RawAccessor::new(&memory);
        assert!(raw.read(Address::new(0x1000), 0).unwrap().is_empty());
        assert_eq!(memory.read_count(), 0);
    }

    #[test]
    fn test_best_effort_read() {
        let memory = MockMemory::new(1);
        memory.map_bytes(Address::new(0x1FFE), b"ab");
        let raw = RawAccessor::new(&memory);

        let mut buffer = [0u8; 4];
        assert_eq!(raw.read_best_effort(Address::new(0x1FFE), &mut buffer), 2);
        assert_eq!(&buffer, b"ab\0\0");
        assert_eq!(raw.read_best_effort(Address::new(0x9000), &mut buffer), 0);
    }

    #[test]
    fn test_write_round_trip() {
        let memory = MockMemory::new(1);
        memory.map_zeroed(Address::new(0x4000), 16);
        let raw = RawAccessor::new(&memory);

        assert_eq!(raw.write(Address::new(0x4000), &[7, 7]).unwrap(), 2);
        assert_eq!(raw.read(Address::new(0x4000), 3).unwrap(), vec![7, 7, 0]);
    }

    #[test]
    fn test_write_denied() {
        let memory = MockMemory::new(1);
        memory.map_zeroed(Address::new(0x4000), 16);
        memory.deny_writes(true);
        let raw = RawAccessor::new(&memory);

        let err = raw.write(Address::new(0x4000), &[1]).unwrap_err();
        assert!(matches!(err, MemoryError::WriteFailed { .. }));
    }
}
