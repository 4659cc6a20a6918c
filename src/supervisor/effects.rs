//! Write-based side effects that must be undone when a session restarts

use super::Attachment;
use crate::core::types::{Address, MemoryResult};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

/// A scoped write into the target that the supervisor can revert
pub trait WriteEffect: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the effect is currently applied
    fn is_active(&self) -> bool;

    /// Restore the target's value and mark the effect inactive
    fn revert(&self, attachment: &Attachment) -> MemoryResult<()>;
}

#[derive(Debug, Clone, Copy)]
struct Applied {
    generation: u64,
    address: Address,
}

/// Overrides one `f32` in the target, e.g. a time scale
///
/// Remembers the attachment it was applied under; reverting against a
/// different attachment only clears the flag.
#[derive(Debug)]
pub struct FloatOverride {
    name: String,
    value: f32,
    default: f32,
    applied: Mutex<Option<Applied>>,
}

impl FloatOverride {
    pub fn new(name: impl Into<String>, value: f32, default: f32) -> Self {
        FloatOverride {
            name: name.into(),
            value,
            default,
            applied: Mutex::new(None),
        }
    }

    /// The time-scale override: 1.8 while active, 1.0 otherwise
    pub fn time_scale() -> Self {
        Self::new("time scale", 1.8, 1.0)
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn default_value(&self) -> f32 {
        self.default
    }

    /// Write the override value at `address`
    pub fn enable(&self, attachment: &Attachment, address: Address) -> MemoryResult<()> {
        attachment.writer().write(address, self.value)?;
        *self.lock() = Some(Applied {
            generation: attachment.generation(),
            address,
        });
        info!(effect = %self.name, %address, value = self.value, "write effect enabled");
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Applied>> {
        self.applied.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WriteEffect for FloatOverride {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    fn revert(&self, attachment: &Attachment) -> MemoryResult<()> {
        let mut applied = self.lock();
        let Some(current) = *applied else {
            return Ok(());
        };

        if current.generation != attachment.generation() {
            debug!(effect = %self.name, "applied under a previous attachment, dropping");
            *applied = None;
            return Ok(());
        }

        let value = attachment.reader().read::<f32>(current.address)?;
        if value != self.default {
            attachment.writer().write(current.address, self.default)?;
        }
        *applied = None;
        info!(effect = %self.name, address = %current.address, "write effect reverted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ModuleInfo, ProcessInfo};
    use crate::memory::{MemoryLimits, MockMemory, StringLayout};
    use std::sync::Arc;

    fn attach(memory: Arc<MockMemory>, generation: u64) -> Attachment {
        Attachment::new(
            ProcessInfo::new(1, "target"),
            ModuleInfo::new("target.dll", Address::new(0x10000), 0x1000),
            memory,
            generation,
            MemoryLimits::default(),
            StringLayout::default(),
        )
    }

    #[test]
    fn test_enable_and_revert() {
        let memory = Arc::new(MockMemory::new(1));
        memory.map_value(Address::new(0x2000), 1.0f32);
        let attachment = attach(Arc::clone(&memory), 1);
        let effect = FloatOverride::time_scale();

        effect.enable(&attachment, Address::new(0x2000)).unwrap();
        assert!(effect.is_active());
        assert_eq!(memory.peek::<f32>(Address::new(0x2000)), Some(1.8));

        effect.revert(&attachment).unwrap();
        assert!(!effect.is_active());
        assert_eq!(memory.peek::<f32>(Address::new(0x2000)), Some(1.0));
    }

    #[test]
    fn test_revert_skips_write_when_already_default() {
        let memory = Arc::new(MockMemory::new(1));
        memory.map_value(Address::new(0x2000), 1.0f32);
        let attachment = attach(Arc::clone(&memory), 1);
        let effect = FloatOverride::time_scale();

        effect.enable(&attachment, Address::new(0x2000)).unwrap();
        memory.map_value(Address::new(0x2000), 1.0f32);
        let writes = memory.write_count();

        effect.revert(&attachment).unwrap();
        assert_eq!(memory.write_count(), writes);
        assert!(!effect.is_active());
    }

    #[test]
    fn test_revert_inactive_is_noop() {
        let memory = Arc::new(MockMemory::new(1));
        let attachment = attach(Arc::clone(&memory), 1);
        FloatOverride::time_scale().revert(&attachment).unwrap();
        assert_eq!(memory.read_count(), 0);
        assert_eq!(memory.write_count(), 0);
    }

    #[test]
    fn test_stale_attachment_not_written() {
        let old = Arc::new(MockMemory::new(1));
        old.map_value(Address::new(0x2000), 1.0f32);
        let effect = FloatOverride::time_scale();
        effect
            .enable(&attach(Arc::clone(&old), 1), Address::new(0x2000))
            .unwrap();

        let new = Arc::new(MockMemory::new(2));
        new.map_value(Address::new(0x2000), 3.0f32);
        effect.revert(&attach(Arc::clone(&new), 2)).unwrap();

        assert!(!effect.is_active());
        assert_eq!(new.peek::<f32>(Address::new(0x2000)), Some(3.0));
        assert_eq!(new.write_count(), 0);
    }
}
