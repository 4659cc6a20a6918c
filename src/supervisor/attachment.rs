//! One attachment to a target: process, module base and memory access

use crate::core::types::{Address, ModuleInfo, ProcessId, ProcessInfo};
use crate::memory::{
    MemoryLimits, MemoryReader, MemoryWriter, ProcessMemory, RawAccessor, ScatterEngine,
    StringLayout,
};
use std::fmt;
use std::sync::Arc;

/// A resolved target process and module
///
/// Immutable for its whole life. Every reattachment builds a new one with a
/// higher `generation`, so nothing resolved against an old process can be
/// mistaken for current.
pub struct Attachment {
    process: ProcessInfo,
    module: ModuleInfo,
    memory: Arc<dyn ProcessMemory>,
    generation: u64,
    limits: MemoryLimits,
    strings: StringLayout,
}

impl Attachment {
    pub fn new(
        process: ProcessInfo,
        module: ModuleInfo,
        memory: Arc<dyn ProcessMemory>,
        generation: u64,
        limits: MemoryLimits,
        strings: StringLayout,
    ) -> Self {
        Attachment {
            process,
            module,
            memory,
            generation,
            limits,
            strings,
        }
    }

    pub fn process(&self) -> &ProcessInfo {
        &self.process
    }

    pub fn pid(&self) -> ProcessId {
        self.process.pid
    }

    pub fn module(&self) -> &ModuleInfo {
        &self.module
    }

    pub fn module_base(&self) -> Address {
        self.module.base_address
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn memory(&self) -> &dyn ProcessMemory {
        self.memory.as_ref()
    }

    pub fn raw(&self) -> RawAccessor<'_> {
        RawAccessor::with_limits(self.memory(), self.limits)
    }

    pub fn reader(&self) -> MemoryReader<'_> {
        MemoryReader::with_limits(self.memory(), self.limits, self.strings)
    }

    pub fn writer(&self) -> MemoryWriter<'_> {
        MemoryWriter::with_limits(self.memory(), self.limits)
    }

    pub fn scatter(&self) -> ScatterEngine<'_> {
        ScatterEngine::new(self.raw())
    }

    pub fn is_alive(&self) -> bool {
        self.memory.is_alive()
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("pid", &self.process.pid)
            .field("process", &self.process.name)
            .field("module", &self.module.name)
            .field("module_base", &self.module.base_address)
            .field("generation", &self.generation)
            .finish()
    }
}
