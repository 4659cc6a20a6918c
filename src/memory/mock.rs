//! In-memory stand-in for a foreign address space
//!
//! Backs unit tests, integration tests and benches. Memory is mapped in
//! 4 KiB pages; a read stops at the first unmapped page, producing the same
//! short counts a real target returns at a mapping boundary.

use super::ProcessMemory;
use crate::core::types::{Address, MemoryPrimitive, ProcessId};
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

const PAGE: u64 = 0x1000;

#[derive(Default)]
struct Pages {
    pages: HashMap<u64, Box<[u8]>>,
}

impl Pages {
    fn page_mut(&mut self, index: u64) -> &mut [u8] {
        self.pages
            .entry(index)
            .or_insert_with(|| vec![0u8; PAGE as usize].into_boxed_slice())
    }

    fn copy_out(&self, address: u64, buffer: &mut [u8]) -> usize {
        let mut done = 0;
        while done < buffer.len() {
            let Some(addr) = address.checked_add(done as u64) else {
                break;
            };
            let Some(page) = self.pages.get(&(addr / PAGE)) else {
                break;
            };
            let offset = (addr % PAGE) as usize;
            let n = (PAGE as usize - offset).min(buffer.len() - done);
            buffer[done..done + n].copy_from_slice(&page[offset..offset + n]);
            done += n;
        }
        done
    }

    fn copy_in(&mut self, address: u64, data: &[u8], map: bool) -> usize {
        let mut done = 0;
        while done < data.len() {
            let Some(addr) = address.checked_add(done as u64) else {
                break;
            };
            let index = addr / PAGE;
            if !map && !self.pages.contains_key(&index) {
                break;
            }
            let offset = (addr % PAGE) as usize;
            let n = (PAGE as usize - offset).min(data.len() - done);
            self.page_mut(index)[offset..offset + n].copy_from_slice(&data[done..done + n]);
            done += n;
        }
        done
    }
}

/// A fake target process
pub struct MockMemory {
    pid: ProcessId,
    pages: RwLock<Pages>,
    short_reads: RwLock<HashMap<u64, usize>>,
    read_only_pages: RwLock<HashSet<u64>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    alive: AtomicBool,
    deny_writes: AtomicBool,
}

impl MockMemory {
    /// Create an empty address space for process `pid`
    pub fn new(pid: ProcessId) -> Self {
        MockMemory {
            pid,
            pages: RwLock::new(Pages::default()),
            short_reads: RwLock::new(HashMap::new()),
            read_only_pages: RwLock::new(HashSet::new()),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            alive: AtomicBool::new(true),
            deny_writes: AtomicBool::new(false),
        }
    }

    /// Map and fill bytes at `address`
    pub fn map_bytes(&self, address: Address, data: &[u8]) {
        if let Ok(mut pages) = self.pages.write() {
            pages.copy_in(address.0, data, true);
        }
    }

    /// Map `len` zero bytes at `address`
    pub fn map_zeroed(&self, address: Address, len: usize) {
        self.map_bytes(address, &vec![0u8; len]);
    }

    /// Map a typed value at `address`
    pub fn map_value<T: MemoryPrimitive>(&self, address: Address, value: T) {
        self.map_bytes(address, &value.to_bytes());
    }

    /// Map a pointer at `address` pointing to `target`
    pub fn map_pointer(&self, address: Address, target: Address) {
        self.map_value(address, target);
    }

    /// Unmap every page touched by `[address, address + len)`
    pub fn unmap(&self, address: Address, len: usize) {
        if len == 0 {
            return;
        }
        let first = address.0 / PAGE;
        let last = address.0.saturating_add(len as u64 - 1) / PAGE;
        if let Ok(mut pages) = self.pages.write() {
            for index in first..=last {
                pages.pages.remove(&index);
            }
        }
    }

    /// Make reads starting exactly at `address` return at most `len` bytes
    pub fn limit_read(&self, address: Address, len: usize) {
        if let Ok(mut short) = self.short_reads.write() {
            short.insert(address.0, len);
        }
    }

    /// Reject writes to the page containing `address`
    pub fn protect(&self, address: Address) {
        if let Ok(mut protected) = self.read_only_pages.write() {
            protected.insert(address.0 / PAGE);
        }
    }

    /// Reject every write with an OS error
    pub fn deny_writes(&self, deny: bool) {
        self.deny_writes.store(deny, Ordering::SeqCst);
    }

    /// Simulate the target exiting: every later access fails
    pub fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Read a value directly, bypassing the access counters
    pub fn peek<T: MemoryPrimitive>(&self, address: Address) -> Option<T> {
        let mut buffer = vec![0u8; T::SIZE];
        let pages = self.pages.read().ok()?;
        (pages.copy_out(address.0, &mut buffer) == T::SIZE).then(|| T::from_bytes(&buffer))
    }

    /// Number of OS-level reads issued against this address space
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of OS-level writes issued against this address space
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn gone(&self) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("process {} has exited", self.pid),
        )
    }
}

impl ProcessMemory for MockMemory {
    fn pid(&self) -> ProcessId {
        self.pid
    }

    fn read_memory(&self, address: Address, buffer: &mut [u8]) -> io::Result<usize> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if !self.is_alive() {
            return Err(self.gone());
        }

        let limit = self
            .short_reads
            .read()
            .ok()
            .and_then(|short| short.get(&address.0).copied())
            .unwrap_or(buffer.len())
            .min(buffer.len());

        let pages = self
            .pages
            .read()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "poisoned"))?;
        match pages.copy_out(address.0, &mut buffer[..limit]) {
            0 if !buffer.is_empty() => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("address {} is not mapped", address),
            )),
            n => Ok(n),
        }
    }

    fn write_memory(&self, address: Address, data: &[u8]) -> io::Result<usize> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if !self.is_alive() {
            return Err(self.gone());
        }
        if self.deny_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "write access denied",
            ));
        }

        let protected = self
            .read_only_pages
            .read()
            .map(|p| p.contains(&(address.0 / PAGE)))
            .unwrap_or(false);
        if protected {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("page at {} is read-only", address.align_down(PAGE)),
            ));
        }

        let mut pages = self
            .pages
            .write()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "poisoned"))?;
        match pages.copy_in(address.0, data, false) {
            0 if !data.is_empty() => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("address {} is not mapped", address),
            )),
            n => Ok(n),
        }
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}
