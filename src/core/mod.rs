//! Core module containing fundamental types for memlink
//!
//! This module provides the foundational building blocks used throughout
//! the crate, including address handling, the value codec, process
//! information, and error types.

pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    Address, MemoryError, MemoryPrimitive, MemoryResult, ModuleInfo, ProcessInfo, WriteValue,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

#[cfg(not(target_pointer_width = "64"))]
compile_error!("memlink requires a 64-bit host");
