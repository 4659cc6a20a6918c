//! Core type definitions for memlink
//!
//! This module contains the fundamental types used throughout the crate:
//! address wrappers, the value codec, process/module information and
//! the error taxonomy.

mod address;
mod error;
mod process_info;
mod value;

pub use address::Address;
pub use error::{MemoryError, MemoryResult};
pub use process_info::{ModuleInfo, ProcessInfo};
pub use value::{MemoryPrimitive, WriteValue};

// Common type aliases
pub type ProcessId = u32;
pub type Offset = u64;
