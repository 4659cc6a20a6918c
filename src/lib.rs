//! memlink: out-of-process memory inspection engine
//!
//! Attaches to a named process, locates a module inside it, and exposes
//! typed reads and writes, pointer chain resolution and batched scatter
//! reads to a session driven by a background supervisor thread.

pub mod config;
pub mod core;
pub mod memory;
pub mod platform;
pub mod process;
pub mod supervisor;

// Re-export main types from core module
pub use core::types::{
    Address, MemoryError, MemoryPrimitive, MemoryResult, ModuleInfo, ProcessId, ProcessInfo,
    WriteValue,
};

pub use memory::{
    MemoryLimits, MemoryReader, MemoryWriter, ProcessMemory, ScatterEngine, ScatterReadEntry,
    ScatterReport, ScatterWriteEntry,
};
pub use supervisor::{
    Attachment, Diagnostics, LifecycleState, Session, SessionFactory, Supervisor,
    SupervisorConfig,
};
