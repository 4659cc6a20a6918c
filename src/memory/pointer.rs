//! Pointer dereference and multi-level chain resolution

use super::reader::MemoryReader;
use crate::core::types::{Address, MemoryError, MemoryResult, Offset};
use tracing::trace;

impl MemoryReader<'_> {
    /// Read the pointer stored at `address`
    ///
    /// A zero pointer is [`MemoryError::NullPointer`], so callers can tell an
    /// absent field apart from a failed read.
    pub fn read_ptr(&self, address: Address) -> MemoryResult<Address> {
        let pointer = self.read_ptr_nullable(address)?;
        if pointer.is_null() {
            return Err(MemoryError::NullPointer(address));
        }
        Ok(pointer)
    }

    /// Read the pointer stored at `address`, allowing zero
    pub fn read_ptr_nullable(&self, address: Address) -> MemoryResult<Address> {
        self.read::<Address>(address)
    }

    /// Follow `offsets` from `base`, dereferencing after each offset
    ///
    /// `addr0 = *(base + offsets[0])`, `addr_i = *(addr_{i-1} + offsets[i])`.
    /// Stops at the first broken link and reports its index together with the
    /// address it was applied to; no partially resolved address is returned.
    pub fn read_ptr_chain(&self, base: Address, offsets: &[Offset]) -> MemoryResult<Address> {
        if offsets.is_empty() {
            return Err(MemoryError::InvalidAddress(format!(
                "empty pointer chain from {}",
                base
            )));
        }

        let mut address = base;
        for (level, &offset) in offsets.iter().enumerate() {
            address = self
                .read_ptr(address.offset(offset))
                .map_err(|e| MemoryError::pointer_chain_broken(level, address, offset, e))?;
            trace!(level, %address, "pointer chain link");
        }

        Ok(address)
    }
}
