//! Scatter batches: many independent reads or writes in one pass
//!
//! Every entry is attempted exactly once, in input order. A failing entry is
//! marked and skipped; nothing a single entry does can abort the batch.

use super::raw::RawAccessor;
use crate::core::types::{Address, MemoryPrimitive, MemoryResult, WriteValue};
use serde::Serialize;
use tracing::{debug, trace, warn};

/// One read request inside a scatter batch
///
/// Resolution of the base address and size may itself fail; such an entry
/// is marked failed like any other.
pub trait ScatterEntry {
    /// Base address the offset is applied to
    fn base_address(&self) -> MemoryResult<Address>;

    /// Byte offset from the base address
    fn offset(&self) -> u64;

    /// Number of bytes to read
    fn size(&self) -> MemoryResult<usize>;

    /// Stores the bytes read for this entry
    fn set_result(&mut self, bytes: Vec<u8>);

    /// Marks the entry as failed, dropping any previous result
    fn set_failed(&mut self);
}

impl<T: ScatterEntry + ?Sized> ScatterEntry for &mut T {
    fn base_address(&self) -> MemoryResult<Address> {
        (**self).base_address()
    }

    fn offset(&self) -> u64 {
        (**self).offset()
    }

    fn size(&self) -> MemoryResult<usize> {
        (**self).size()
    }

    fn set_result(&mut self, bytes: Vec<u8>) {
        (**self).set_result(bytes)
    }

    fn set_failed(&mut self) {
        (**self).set_failed()
    }
}

/// Outcome slot of a read entry
///
/// A result and a failure are mutually exclusive by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EntryState {
    #[default]
    Pending,
    Ready(Vec<u8>),
    Failed,
}

/// A plain read request: `size` bytes at `base + offset`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScatterReadEntry {
    pub base: Address,
    pub offset: u64,
    pub size: usize,
    state: EntryState,
}

impl ScatterReadEntry {
    pub fn new(base: Address, offset: u64, size: usize) -> Self {
        ScatterReadEntry {
            base,
            offset,
            size,
            state: EntryState::Pending,
        }
    }

    /// Entry sized for one `T`
    pub fn of<T: MemoryPrimitive>(base: Address, offset: u64) -> Self {
        Self::new(base, offset, T::SIZE)
    }

    /// Entry whose base is the pointer produced by `prior`
    ///
    /// If `prior` did not produce a pointer the base is null, so the entry
    /// fails in the pre-check without an OS call.
    pub fn deref_of(prior: &ScatterReadEntry, offset: u64, size: usize) -> Self {
        let base = prior.value::<Address>().unwrap_or_default();
        Self::new(base, offset, size)
    }

    pub fn state(&self) -> &EntryState {
        &self.state
    }

    pub fn result(&self) -> Option<&[u8]> {
        match &self.state {
            EntryState::Ready(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, EntryState::Failed)
    }

    /// Decodes the result as `T` if enough bytes were read
    pub fn value<T: MemoryPrimitive>(&self) -> Option<T> {
        self.result()
            .filter(|bytes| bytes.len() >= T::SIZE)
            .map(T::from_bytes)
    }

    /// Clears the outcome so the entry can be submitted again
    pub fn reset(&mut self) {
        self.state = EntryState::Pending;
    }
}

impl ScatterEntry for ScatterReadEntry {
    fn base_address(&self) -> MemoryResult<Address> {
        Ok(self.base)
    }

    fn offset(&self) -> u64 {
        self.offset
    }

    fn size(&self) -> MemoryResult<usize> {
        Ok(self.size)
    }

    fn set_result(&mut self, bytes: Vec<u8>) {
        self.state = EntryState::Ready(bytes);
    }

    fn set_failed(&mut self) {
        self.state = EntryState::Failed;
    }
}

/// One write request inside a scatter batch
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatterWriteEntry {
    pub address: Address,
    pub value: WriteValue,
}

impl ScatterWriteEntry {
    pub fn new(address: Address, value: impl Into<WriteValue>) -> Self {
        ScatterWriteEntry {
            address,
            value: value.into(),
        }
    }
}

/// Counts for one executed batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScatterReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl ScatterReport {
    fn record(&mut self, ok: bool) {
        self.attempted += 1;
        if ok {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Executes scatter batches against one address space
#[derive(Clone, Copy)]
pub struct ScatterEngine<'a> {
    raw: RawAccessor<'a>,
}

impl<'a> ScatterEngine<'a> {
    pub fn new(raw: RawAccessor<'a>) -> Self {
        ScatterEngine { raw }
    }

    /// Reads every entry once, storing a result or marking it failed
    pub fn read<E: ScatterEntry>(&self, entries: &mut [E]) -> ScatterReport {
        let mut report = ScatterReport::default();

        for (index, entry) in entries.iter_mut().enumerate() {
            match self.read_entry(entry) {
                Some(bytes) => {
                    trace!(index, bytes = %hex::encode(&bytes), "scatter read");
                    entry.set_result(bytes);
                    report.record(true);
                }
                None => {
                    entry.set_failed();
                    report.record(false);
                }
            }
        }

        trace!(
            attempted = report.attempted,
            failed = report.failed,
            "scatter read batch"
        );
        report
    }

    fn read_entry<E: ScatterEntry>(&self, entry: &E) -> Option<Vec<u8>> {
        let (base, size) = match (entry.base_address(), entry.size()) {
            (Ok(base), Ok(size)) => (base, size),
            (Err(e), _) | (_, Err(e)) => {
                debug!(error = %e, "scatter entry could not be resolved");
                return None;
            }
        };

        if base.is_null() || size == 0 {
            return None;
        }

        let Some(address) = base.checked_offset(entry.offset()) else {
            debug!(%base, offset = entry.offset(), "scatter entry address overflows");
            return None;
        };
        match self.raw.read(address, size) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!(%address, size, error = %e, "scatter read failed");
                None
            }
        }
    }

    /// Writes every entry once; failures are logged and the batch continues
    pub fn write(&self, entries: &[ScatterWriteEntry]) -> ScatterReport {
        let mut report = ScatterReport::default();

        for entry in entries {
            let ok = self.write_entry(entry);
            report.record(ok);
        }

        report
    }

    fn write_entry(&self, entry: &ScatterWriteEntry) -> bool {
        if entry.address.is_null() {
            warn!(value = %entry.value, "scatter write to null address skipped");
            return false;
        }

        let bytes = entry.value.to_bytes();
        match self.raw.write(entry.address, &bytes) {
            Ok(written) if written == bytes.len() => {
                trace!(address = %entry.address, kind = entry.value.kind(), "scatter write");
                true
            }
            Ok(written) => {
                warn!(
                    address = %entry.address,
                    expected = bytes.len(),
                    written,
                    "scatter write incomplete"
                );
                false
            }
            Err(e) => {
                warn!(address = %entry.address, value = %entry.value, error = %e, "scatter write failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::MemoryError;
    use crate::memory::MockMemory;
    use pretty_assertions::assert_eq;

    struct Unresolvable;

    impl ScatterEntry for Unresolvable {
        fn base_address(&self) -> MemoryResult<Address> {
            Err(MemoryError::Unknown("no base".into()))
        }
        fn offset(&self) -> u64 {
            0
        }
        fn size(&self) -> MemoryResult<usize> {
            Ok(4)
        }
        fn set_result(&mut self, _: Vec<u8>) {
            panic!("unresolvable entry must not receive a result");
        }
        fn set_failed(&mut self) {}
    }

    #[test]
    fn test_read_batch_isolates_failures() {
        let memory = MockMemory::new(1);
        memory.map_value(Address::new(0x1000), 11u32);
        memory.map_value(Address::new(0x1008), 22u32);
        let engine = ScatterEngine::new(RawAccessor::new(&memory));

        let mut entries = vec![
            ScatterReadEntry::of::<u32>(Address::new(0x1000), 0),
            ScatterReadEntry::of::<u32>(Address::new(0x9000), 0),
            ScatterReadEntry::of::<u32>(Address::new(0x1000), 8),
        ];
        let report = engine.read(&mut entries);

        assert_eq!(
            report,
            ScatterReport {
                attempted: 3,
                succeeded: 2,
                failed: 1
            }
        );
        assert_eq!(entries[0].value::<u32>(), Some(11));
        assert!(entries[1].is_failed());
        assert_eq!(entries[1].result(), None);
        assert_eq!(entries[2].value::<u32>(), Some(22));
    }

    #[test]
    fn test_precheck_skips_os_call() {
        let memory = MockMemory::new(1);
        let engine = ScatterEngine::new(RawAccessor::new(&memory));

        let mut entries = vec![
            ScatterReadEntry::new(Address::null(), 0x10, 4),
            ScatterReadEntry::new(Address::new(0x1000), 0, 0),
        ];
        engine.read(&mut entries);

        assert!(entries.iter().all(ScatterReadEntry::is_failed));
        assert_eq!(memory.read_count(), 0);
    }

    #[test]
    fn test_overflowing_offset_skips_os_call() {
        let memory = MockMemory::new(1);
        memory.map_value(Address::new(0x1000), 5u32);
        let engine = ScatterEngine::new(RawAccessor::new(&memory));

        let mut entries = vec![
            ScatterReadEntry::new(Address::new(u64::MAX - 3), 0x10, 4),
            ScatterReadEntry::of::<u32>(Address::new(0x1000), 0),
        ];
        let report = engine.read(&mut entries);

        assert!(entries[0].is_failed());
        assert_eq!(entries[1].value::<u32>(), Some(5));
        assert_eq!(report.failed, 1);
        assert_eq!(memory.read_count(), 1);
    }

    #[test]
    fn test_unresolvable_entry_fails() {
        let memory = MockMemory::new(1);
        let engine = ScatterEngine::new(RawAccessor::new(&memory));
        let mut entries = [Unresolvable, Unresolvable];
        let report = engine.read(&mut entries);
        assert_eq!(report.failed, 2);
        assert_eq!(memory.read_count(), 0);
    }

    #[test]
    fn test_failure_replaces_previous_result() {
        let memory = MockMemory::new(1);
        memory.map_value(Address::new(0x1000), 5u8);
        let engine = ScatterEngine::new(RawAccessor::new(&memory));

        let mut entries = vec![ScatterReadEntry::of::<u8>(Address::new(0x1000), 0)];
        engine.read(&mut entries);
        assert_eq!(entries[0].value::<u8>(), Some(5));

        memory.unmap(Address::new(0x1000), 1);
        engine.read(&mut entries);
        assert_eq!(entries[0].state(), &EntryState::Failed);

        entries[0].reset();
        assert_eq!(entries[0].state(), &EntryState::Pending);
    }

    #[test]
    fn test_dependent_round() {
        let memory = MockMemory::new(1);
        memory.map_pointer(Address::new(0x1000), Address::new(0x5000));
        memory.map_value(Address::new(0x5020), 1.8f32);
        let engine = ScatterEngine::new(RawAccessor::new(&memory));

        let mut first = vec![
            ScatterReadEntry::of::<Address>(Address::new(0x1000), 0),
            ScatterReadEntry::of::<Address>(Address::new(0x8000), 0),
        ];
        engine.read(&mut first);

        let mut second = vec![
            ScatterReadEntry::deref_of(&first[0], 0x20, 4),
            ScatterReadEntry::deref_of(&first[1], 0x20, 4),
        ];
        let reads = memory.read_count();
        engine.read(&mut second);

        assert_eq!(second[0].value::<f32>(), Some(1.8));
        assert!(second[1].is_failed());
        assert_eq!(memory.read_count() - reads, 1);
    }

    #[test]
    fn test_mixed_entry_types_through_references() {
        let memory = MockMemory::new(1);
        memory.map_value(Address::new(0x1000), 3u16);
        let engine = ScatterEngine::new(RawAccessor::new(&memory));

        let mut plain = ScatterReadEntry::of::<u16>(Address::new(0x1000), 0);
        let mut broken = Unresolvable;
        let mut batch: Vec<&mut dyn ScatterEntry> = vec![&mut plain, &mut broken];
        let report = engine.read(&mut batch);

        assert_eq!(report.succeeded, 1);
        assert_eq!(plain.value::<u16>(), Some(3));
    }

    #[test]
    fn test_write_batch_continues_after_failure() {
        let memory = MockMemory::new(1);
        memory.map_zeroed(Address::new(0x1000), 0x10);
        memory.map_zeroed(Address::new(0x2000), 0x10);
        memory.protect(Address::new(0x2000));
        let engine = ScatterEngine::new(RawAccessor::new(&memory));

        let entries = [
            ScatterWriteEntry::new(Address::new(0x1000), 7i32),
            ScatterWriteEntry::new(Address::new(0x2000), 1.0f32),
            ScatterWriteEntry::new(Address::null(), true),
            ScatterWriteEntry::new(Address::new(0x1008), u64::MAX),
            ScatterWriteEntry::new(Address::new(0x1004), 0xABu8),
        ];
        let report = engine.write(&entries);

        assert_eq!(
            report,
            ScatterReport {
                attempted: 5,
                succeeded: 3,
                failed: 2
            }
        );
        assert_eq!(memory.peek::<i32>(Address::new(0x1000)), Some(7));
        assert_eq!(memory.peek::<u8>(Address::new(0x1004)), Some(0xAB));
        assert_eq!(memory.peek::<u64>(Address::new(0x1008)), Some(u64::MAX));
        // Null entry never reached the OS
        assert_eq!(memory.write_count(), 4);
    }
}
