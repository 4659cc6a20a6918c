//! Minimal session used by the command-line binary
//!
//! Starts as soon as the module header is readable and re-reads it every
//! cycle. Enough to exercise attachment, scatter reads and liveness without
//! any domain model.

use super::{Attachment, PollOutcome, Session, SessionContext, SessionFactory, WaitOutcome};
use crate::core::types::MemoryResult;
use crate::memory::ScatterReadEntry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const HEADER_RETRY: Duration = Duration::from_millis(100);

/// Reads the first two bytes of the module on every cycle
#[derive(Debug, Default)]
pub struct ProbeSession {
    header: Option<u16>,
    cycles: u64,
}

impl ProbeSession {
    pub fn header(&self) -> Option<u16> {
        self.header
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    fn header_entry(attachment: &Attachment) -> ScatterReadEntry {
        ScatterReadEntry::of::<u16>(attachment.module_base(), 0)
    }
}

impl Session for ProbeSession {
    fn wait_for_start(&mut self, ctx: &SessionContext<'_>) -> MemoryResult<WaitOutcome> {
        let attachment = ctx.attachment();
        loop {
            let mut entries = [Self::header_entry(attachment)];
            attachment.scatter().read(&mut entries);
            if let Some(header) = entries[0].value::<u16>() {
                info!(
                    module = %attachment.module().name,
                    header = %format!("{:04X}", header),
                    "module header readable"
                );
                self.header = Some(header);
                return Ok(WaitOutcome::Started);
            }
            if !attachment.is_alive() {
                return Ok(WaitOutcome::ProcessGone);
            }
            if ctx.wait(HEADER_RETRY) {
                return Ok(WaitOutcome::Cancelled);
            }
        }
    }

    fn build_scatter_entries(&mut self, attachment: &Attachment) -> Vec<ScatterReadEntry> {
        vec![Self::header_entry(attachment)]
    }

    fn on_poll_cycle(
        &mut self,
        attachment: &Attachment,
        entries: &mut [ScatterReadEntry],
    ) -> MemoryResult<PollOutcome> {
        self.cycles += 1;
        match entries.first().and_then(|e| e.value::<u16>()) {
            Some(header) => {
                if self.header != Some(header) {
                    debug!(header = %format!("{:04X}", header), "module header changed");
                    self.header = Some(header);
                }
                Ok(PollOutcome::Continue)
            }
            None if !attachment.is_alive() => Ok(PollOutcome::ProcessGone),
            None => Ok(PollOutcome::Continue),
        }
    }
}

/// Factory for [`ProbeSession`]
#[derive(Debug, Default, Clone, Copy)]
pub struct ProbeSessionFactory;

impl SessionFactory for ProbeSessionFactory {
    type Session = ProbeSession;

    fn create(&mut self, _attachment: &Arc<Attachment>) -> ProbeSession {
        ProbeSession::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Address, ModuleInfo, ProcessInfo};
    use crate::memory::{MemoryLimits, MockMemory, StringLayout};
    use crate::supervisor::ShutdownSignal;

    fn attachment(memory: Arc<MockMemory>) -> Attachment {
        Attachment::new(
            ProcessInfo::new(9, "game.exe"),
            ModuleInfo::new("UnityPlayer.dll", Address::new(0x40000), 0x1000),
            memory,
            1,
            MemoryLimits::default(),
            StringLayout::default(),
        )
    }

    #[test]
    fn test_probe_starts_when_header_readable() {
        let memory = Arc::new(MockMemory::new(9));
        memory.map_bytes(Address::new(0x40000), b"MZ");
        let attachment = attachment(Arc::clone(&memory));
        let shutdown = ShutdownSignal::new();

        let mut session = ProbeSession::default();
        let outcome = session
            .wait_for_start(&SessionContext::new(&attachment, &shutdown))
            .unwrap();
        assert_eq!(outcome, WaitOutcome::Started);
        assert_eq!(session.header(), Some(u16::from_le_bytes(*b"MZ")));
    }

    #[test]
    fn test_probe_reports_dead_target() {
        let memory = Arc::new(MockMemory::new(9));
        memory.kill();
        let attachment = attachment(Arc::clone(&memory));
        let shutdown = ShutdownSignal::new();

        let mut session = ProbeSession::default();
        assert_eq!(
            session
                .wait_for_start(&SessionContext::new(&attachment, &shutdown))
                .unwrap(),
            WaitOutcome::ProcessGone
        );

        let mut entries = session.build_scatter_entries(&attachment);
        attachment.scatter().read(&mut entries);
        assert_eq!(
            session.on_poll_cycle(&attachment, &mut entries).unwrap(),
            PollOutcome::ProcessGone
        );
    }

    #[test]
    fn test_probe_wait_cancelled() {
        let memory = Arc::new(MockMemory::new(9));
        let attachment = attachment(Arc::clone(&memory));
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let mut session = ProbeSession::default();
        assert_eq!(
            session
                .wait_for_start(&SessionContext::new(&attachment, &shutdown))
                .unwrap(),
            WaitOutcome::Cancelled
        );
    }
}
