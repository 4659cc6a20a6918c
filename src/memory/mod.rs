//! Foreign memory access: raw, typed, pointer chains and scatter batches
//!
//! Layers, leaf to root:
//! - [`ProcessMemory`]: the two OS primitives (read/write foreign memory)
//! - [`RawAccessor`]: size ceiling, null/overflow checks, exact byte counts
//! - [`MemoryReader`] / [`MemoryWriter`]: typed values, strings, arrays
//! - pointer chain resolution on [`MemoryReader`]
//! - [`ScatterEngine`]: many independent reads or writes per pass

pub mod mock;
pub mod pointer;
pub mod raw;
pub mod reader;
pub mod scatter;
pub mod writer;

pub use mock::MockMemory;
pub use raw::RawAccessor;
pub use reader::{MemoryReader, StringLayout};
pub use scatter::{
    EntryState, ScatterEngine, ScatterEntry, ScatterReadEntry, ScatterReport, ScatterWriteEntry,
};
pub use writer::MemoryWriter;

use crate::core::types::{Address, ProcessId};
use serde::{Deserialize, Serialize};
use std::io;

/// Default OS page size
pub const PAGE_SIZE: usize = 0x1000;

/// Default number of pages a single read may span
pub const MAX_READ_PAGES: usize = 1500;

/// The OS memory interface of an attached process
///
/// Implementations return the exact number of bytes transferred on success;
/// the layers above decide whether a short count is a failure.
pub trait ProcessMemory: Send + Sync {
    /// Process id of the target
    fn pid(&self) -> ProcessId;

    /// Copies foreign memory at `address` into `buffer`
    fn read_memory(&self, address: Address, buffer: &mut [u8]) -> io::Result<usize>;

    /// Copies `data` into foreign memory at `address`
    fn write_memory(&self, address: Address, data: &[u8]) -> io::Result<usize>;

    /// Whether the target process is still running
    fn is_alive(&self) -> bool {
        true
    }
}

/// Size limits applied to every foreign read and write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryLimits {
    pub page_size: usize,
    pub max_read_pages: usize,
}

impl MemoryLimits {
    /// Largest single request in bytes
    pub fn max_read_size(&self) -> usize {
        self.page_size.saturating_mul(self.max_read_pages)
    }

    /// Largest string length (in characters) accepted from the target
    pub fn max_string_len(&self) -> usize {
        self.page_size
    }
}

impl Default for MemoryLimits {
    fn default() -> Self {
        MemoryLimits {
            page_size: PAGE_SIZE,
            max_read_pages: MAX_READ_PAGES,
        }
    }
}
