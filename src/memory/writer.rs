//! Type-safe memory writing with validation

use super::raw::RawAccessor;
use super::{MemoryLimits, ProcessMemory};
use crate::core::types::{Address, MemoryError, MemoryPrimitive, MemoryResult, WriteValue};

/// Memory writer for type-safe write operations
#[derive(Clone, Copy)]
pub struct MemoryWriter<'a> {
    raw: RawAccessor<'a>,
}

impl<'a> MemoryWriter<'a> {
    /// Create a new memory writer
    pub fn new(memory: &'a dyn ProcessMemory) -> Self {
        Self::with_limits(memory, MemoryLimits::default())
    }

    /// Create a new memory writer with explicit limits
    pub fn with_limits(memory: &'a dyn ProcessMemory, limits: MemoryLimits) -> Self {
        MemoryWriter {
            raw: RawAccessor::with_limits(memory, limits),
        }
    }

    /// Write raw bytes to memory
    pub fn write_bytes(&self, address: Address, data: &[u8]) -> MemoryResult<()> {
        let bytes_written = self.raw.write(address, data)?;

        if bytes_written != data.len() {
            return Err(MemoryError::write_failed(
                address,
                format!(
                    "Partial write: expected {} bytes, wrote {} bytes",
                    data.len(),
                    bytes_written
                ),
            ));
        }

        Ok(())
    }

    /// Write a typed value to memory
    pub fn write<T: MemoryPrimitive>(&self, address: Address, value: T) -> MemoryResult<()> {
        self.write_bytes(address, &value.to_bytes())
    }

    /// Write a scatter payload to memory
    pub fn write_value(&self, address: Address, value: WriteValue) -> MemoryResult<()> {
        self.write_bytes(address, &value.to_bytes())
    }

    /// Write a value, then read it back and compare
    pub fn write_verified<T>(&self, address: Address, value: T) -> MemoryResult<()>
    where
        T: MemoryPrimitive + PartialEq,
    {
        self.write(address, value)?;

        let mut buffer = vec![0u8; T::SIZE];
        self.raw.read_into(address, &mut buffer)?;
        if T::from_bytes(&buffer) != value {
            return Err(MemoryError::write_failed(
                address,
                "Verification failed: value read back differs",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryReader, MockMemory};

    #[test]
    fn test_write_and_read_back() {
        let memory = MockMemory::new(1);
        memory.map_zeroed(Address::new(0x1000), 64);
        let writer = MemoryWriter::new(&memory);
        let reader = MemoryReader::new(&memory);

        writer.write(Address::new(0x1000), 0x1234_5678u32).unwrap();
        writer.write(Address::new(0x1010), -0.5f64).unwrap();

        assert_eq!(reader.read::<u32>(Address::new(0x1000)).unwrap(), 0x1234_5678);
        assert_eq!(reader.read::<f64>(Address::new(0x1010)).unwrap(), -0.5);
    }

    #[test]
    fn test_write_value_widths() {
        let memory = MockMemory::new(1);
        memory.map_bytes(Address::new(0x2000), &[0xEE; 16]);
        let writer = MemoryWriter::new(&memory);

        writer
            .write_value(Address::new(0x2000), WriteValue::Bool(true))
            .unwrap();
        // Only one byte touched
        assert_eq!(memory.peek::<u16>(Address::new(0x2000)), Some(0xEE01));

        writer
            .write_value(Address::new(0x2008), WriteValue::I32(-2))
            .unwrap();
        assert_eq!(memory.peek::<i32>(Address::new(0x2008)), Some(-2));
        assert_eq!(memory.peek::<u8>(Address::new(0x200C)), Some(0xEE));
    }

    #[test]
    fn test_partial_write_fails() {
        let memory = MockMemory::new(1);
        // Last page mapped: a u64 straddling into the next page writes 4 bytes
        memory.map_zeroed(Address::new(0x3000), 0x1000);
        let writer = MemoryWriter::new(&memory);

        let err = writer
            .write(Address::new(0x3FFC), u64::MAX)
            .unwrap_err();
        match err {
            MemoryError::WriteFailed { reason, .. } => {
                assert_eq!(reason, "Partial write: expected 8 bytes, wrote 4 bytes");
            }
            other => panic!("Expected WriteFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_rejected_write() {
        let memory = MockMemory::new(1);
        memory.map_zeroed(Address::new(0x1000), 8);
        memory.protect(Address::new(0x1000));
        let writer = MemoryWriter::new(&memory);

        assert!(matches!(
            writer.write(Address::new(0x1000), 1u8),
            Err(MemoryError::WriteFailed { .. })
        ));
        assert!(matches!(
            writer.write(Address::null(), 1u8),
            Err(MemoryError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_write_verified() {
        let memory = MockMemory::new(1);
        memory.map_zeroed(Address::new(0x1000), 8);
        let writer = MemoryWriter::new(&memory);

        writer.write_verified(Address::new(0x1000), 1.8f32).unwrap();
        assert_eq!(memory.peek::<f32>(Address::new(0x1000)), Some(1.8));
    }
}
