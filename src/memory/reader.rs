//! Typed reads: fixed-size values, buffers, arrays and strings

use super::raw::RawAccessor;
use super::{MemoryLimits, ProcessMemory};
use crate::core::types::{Address, MemoryError, MemoryPrimitive, MemoryResult};
use serde::{Deserialize, Serialize};

/// Layout of a managed string object in the target
///
/// A 32-bit character count at `length_offset`, followed by inline UTF-16
/// code units at `data_offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringLayout {
    pub length_offset: u64,
    pub data_offset: u64,
}

impl Default for StringLayout {
    fn default() -> Self {
        StringLayout {
            length_offset: 0x10,
            data_offset: 0x14,
        }
    }
}

/// Memory reader with type-safe operations
#[derive(Clone, Copy)]
pub struct MemoryReader<'a> {
    raw: RawAccessor<'a>,
    strings: StringLayout,
}

impl<'a> MemoryReader<'a> {
    /// Create a new memory reader with default limits and string layout
    pub fn new(memory: &'a dyn ProcessMemory) -> Self {
        Self::with_limits(memory, MemoryLimits::default(), StringLayout::default())
    }

    /// Create a new memory reader with explicit limits and string layout
    pub fn with_limits(
        memory: &'a dyn ProcessMemory,
        limits: MemoryLimits,
        strings: StringLayout,
    ) -> Self {
        MemoryReader {
            raw: RawAccessor::with_limits(memory, limits),
            strings,
        }
    }

    /// The raw accessor under this reader
    pub fn raw(&self) -> &RawAccessor<'a> {
        &self.raw
    }

    /// Read a typed value from memory
    pub fn read<T: MemoryPrimitive>(&self, address: Address) -> MemoryResult<T> {
        let mut buffer = vec![0u8; T::SIZE];
        self.raw.read_into(address, &mut buffer)?;
        Ok(T::from_bytes(&buffer))
    }

    /// Read raw bytes from memory
    pub fn read_buffer(&self, address: Address, size: usize) -> MemoryResult<Vec<u8>> {
        self.raw.read(address, size)
    }

    /// Read `count` consecutive values
    pub fn read_array<T: MemoryPrimitive>(
        &self,
        address: Address,
        count: usize,
    ) -> MemoryResult<Vec<T>> {
        let size = count
            .checked_mul(T::SIZE)
            .ok_or(MemoryError::SizeOutOfBounds {
                address,
                size: usize::MAX,
                max: self.raw.limits().max_read_size(),
            })?;
        let buffer = self.raw.read(address, size)?;
        Ok(buffer.chunks_exact(T::SIZE).map(T::from_bytes).collect())
    }

    /// Read a null-terminated 8-bit string of at most `max_len` bytes
    ///
    /// Best effort: read failures and short reads are tolerated, whatever
    /// bytes arrived are decoded. Only a `max_len` above the string ceiling
    /// is an error.
    pub fn read_fixed_string(&self, address: Address, max_len: usize) -> MemoryResult<String> {
        let max = self.raw.limits().max_string_len();
        if max_len > max {
            return Err(MemoryError::SizeOutOfBounds {
                address,
                size: max_len,
                max,
            });
        }

        let mut buffer = vec![0u8; max_len];
        self.raw.read_best_effort(address, &mut buffer);

        let len = buffer.iter().position(|&b| b == 0).unwrap_or(max_len);
        Ok(String::from_utf8_lossy(&buffer[..len]).into_owned())
    }

    /// Read a length-prefixed UTF-16 string object
    pub fn read_length_prefixed_string(&self, address: Address) -> MemoryResult<String> {
        let length = self.read::<i32>(address.offset(self.strings.length_offset))?;

        let max = self.raw.limits().max_string_len();
        let chars = length as u32 as usize;
        if chars > max {
            return Err(MemoryError::SizeOutOfBounds {
                address,
                size: chars,
                max,
            });
        }

        let buffer = self
            .raw
            .read(address.offset(self.strings.data_offset), chars * 2)?;
        let units: Vec<u16> = buffer
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        Ok(String::from_utf16_lossy(&units)
            .trim_end_matches('\0')
            .to_string())
    }
}
