//! Domain collaborator interface driven by the supervisor
//!
//! A [`SessionFactory`] builds one [`Session`] per `Idle` entry. The session
//! blocks in [`Session::wait_for_start`] until its domain-level session
//! begins, then receives one [`Session::on_poll_cycle`] call per `Active`
//! iteration with the scatter entries it asked for already executed.

use super::{Attachment, ShutdownSignal};
use crate::core::types::MemoryResult;
use crate::memory::ScatterReadEntry;
use std::sync::Arc;
use std::time::Duration;

/// How a wait for session start ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Started,
    ProcessGone,
    Cancelled,
}

/// Result of one poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Continue,
    /// The domain session ended; back to `Idle`
    SessionEnded,
    /// The target exited; back to process search
    ProcessGone,
}

/// What a session may use while it waits for its start
pub struct SessionContext<'a> {
    attachment: &'a Attachment,
    shutdown: &'a ShutdownSignal,
}

impl<'a> SessionContext<'a> {
    pub(crate) fn new(attachment: &'a Attachment, shutdown: &'a ShutdownSignal) -> Self {
        SessionContext {
            attachment,
            shutdown,
        }
    }

    pub fn attachment(&self) -> &'a Attachment {
        self.attachment
    }

    pub fn is_cancelled(&self) -> bool {
        self.shutdown.is_shutdown()
    }

    /// Sleep for `duration`, returning `true` early if shutdown was requested
    pub fn wait(&self, duration: Duration) -> bool {
        self.shutdown.wait(duration)
    }
}

/// One domain-level session against an attachment
pub trait Session: Send {
    /// Block until the session begins
    fn wait_for_start(&mut self, ctx: &SessionContext<'_>) -> MemoryResult<WaitOutcome>;

    /// Reads wanted for the next cycle
    fn build_scatter_entries(&mut self, _attachment: &Attachment) -> Vec<ScatterReadEntry> {
        Vec::new()
    }

    /// Consume the executed entries and update domain state
    ///
    /// Errors are logged by the supervisor and the loop continues, unless
    /// the target is gone or the error is fatal.
    fn on_poll_cycle(
        &mut self,
        attachment: &Attachment,
        entries: &mut [ScatterReadEntry],
    ) -> MemoryResult<PollOutcome>;
}

/// Builds a fresh [`Session`] every time the supervisor enters `Idle`
pub trait SessionFactory: Send + 'static {
    type Session: Session;

    fn create(&mut self, attachment: &Arc<Attachment>) -> Self::Session;
}
