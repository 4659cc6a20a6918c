//! Attachment & lifecycle supervisor
//!
//! One dedicated worker thread drives the whole lifecycle serially:
//!
//! ```text
//! SearchingProcess -> SearchingModule -> Idle -> Active -> (Idle | SearchingProcess)
//! ```
//!
//! Other threads only observe published values (state, ready flag, tick
//! rate, module base, current [`Attachment`]). The worker never takes a lock
//! while reading or writing target memory.

mod attachment;
mod clock;
mod effects;
pub mod probe;
mod session;
mod shutdown;
mod state;

pub use attachment::Attachment;
pub use clock::TickClock;
pub use effects::{FloatOverride, WriteEffect};
pub use probe::{ProbeSession, ProbeSessionFactory};
pub use session::{PollOutcome, Session, SessionContext, SessionFactory, WaitOutcome};
pub use shutdown::ShutdownSignal;
pub use state::{Diagnostics, LifecycleState};

use crate::core::types::{Address, MemoryError, MemoryResult, ProcessInfo};
use crate::memory::{MemoryLimits, StringLayout};
use crate::process::ProcessLocator;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Runtime settings of the supervisor
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub process_name: String,
    pub module_name: String,
    /// Delay between process searches
    pub process_retry: Duration,
    /// Backoff after a failed module lookup
    pub module_retry: Duration,
    /// Pause after a session ends before re-entering `Idle`
    pub session_end_debounce: Duration,
    /// Lower bound on one `Active` iteration
    pub min_iteration_interval: Duration,
    pub limits: MemoryLimits,
    pub strings: StringLayout,
}

impl SupervisorConfig {
    pub fn new(process_name: impl Into<String>, module_name: impl Into<String>) -> Self {
        SupervisorConfig {
            process_name: process_name.into(),
            module_name: module_name.into(),
            process_retry: Duration::from_secs(15),
            module_retry: Duration::from_secs(15),
            session_end_debounce: Duration::from_millis(100),
            min_iteration_interval: Duration::from_micros(500),
            limits: MemoryLimits::default(),
            strings: StringLayout::default(),
        }
    }
}

/// Values published by the worker
struct SharedState {
    state: AtomicU8,
    ready: AtomicBool,
    ticks_per_second: AtomicU32,
    module_base: AtomicU64,
    pid: AtomicU32,
    generation: AtomicU64,
    restart_requested: AtomicBool,
    attachment: Mutex<Option<Arc<Attachment>>>,
    shutdown: ShutdownSignal,
}

impl SharedState {
    fn new() -> Self {
        SharedState {
            state: AtomicU8::new(LifecycleState::SearchingProcess as u8),
            ready: AtomicBool::new(false),
            ticks_per_second: AtomicU32::new(0),
            module_base: AtomicU64::new(0),
            pid: AtomicU32::new(0),
            generation: AtomicU64::new(0),
            restart_requested: AtomicBool::new(false),
            attachment: Mutex::new(None),
            shutdown: ShutdownSignal::new(),
        }
    }

    fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn attachment(&self) -> Option<Arc<Attachment>> {
        self.attachment
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, attachment: Option<Arc<Attachment>>) {
        let (base, pid) = attachment
            .as_ref()
            .map(|a| (a.module_base().as_u64(), a.pid()))
            .unwrap_or((0, 0));
        *self.attachment.lock().unwrap_or_else(PoisonError::into_inner) = attachment;
        self.module_base.store(base, Ordering::SeqCst);
        self.pid.store(pid, Ordering::SeqCst);
    }

    fn diagnostics(&self) -> Diagnostics {
        let pid = self.pid.load(Ordering::SeqCst);
        Diagnostics {
            state: self.state(),
            ready: self.ready.load(Ordering::SeqCst),
            ticks_per_second: self.ticks_per_second.load(Ordering::SeqCst),
            module_base: Address::new(self.module_base.load(Ordering::SeqCst)),
            pid: (pid != 0).then_some(pid),
            attach_generation: self.generation.load(Ordering::SeqCst),
        }
    }
}

/// Builder for a [`Supervisor`]
pub struct SupervisorBuilder {
    config: SupervisorConfig,
    effects: Vec<Arc<dyn WriteEffect>>,
    observer: Option<Sender<LifecycleState>>,
}

impl SupervisorBuilder {
    /// Register a write effect to revert on restart
    pub fn effect(mut self, effect: Arc<dyn WriteEffect>) -> Self {
        self.effects.push(effect);
        self
    }

    /// Receive every lifecycle state change
    pub fn observer(mut self, observer: Sender<LifecycleState>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Spawn the worker thread
    pub fn start<L, F>(self, locator: L, factory: F) -> MemoryResult<Supervisor>
    where
        L: ProcessLocator,
        F: SessionFactory,
    {
        let shared = Arc::new(SharedState::new());
        let mut worker = Worker {
            locator,
            factory,
            shared: Arc::clone(&shared),
            config: self.config,
            effects: self.effects,
            observer: self.observer,
        };

        let handle = thread::Builder::new()
            .name("memory-worker".to_string())
            .spawn(move || {
                match panic::catch_unwind(AssertUnwindSafe(|| worker.run())) {
                    Ok(Ok(())) => info!("memory worker stopped"),
                    Ok(Err(e)) => {
                        error!(error = %e, "fatal error in memory worker, aborting");
                        std::process::abort();
                    }
                    Err(_) => {
                        error!("memory worker panicked, aborting");
                        std::process::abort();
                    }
                }
            })?;

        Ok(Supervisor {
            shared,
            worker: Some(handle),
        })
    }
}

/// Owner of the background memory worker
///
/// Dropping the supervisor shuts the worker down and joins it.
pub struct Supervisor {
    shared: Arc<SharedState>,
    worker: Option<JoinHandle<()>>,
}

impl Supervisor {
    pub fn builder(config: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder {
            config,
            effects: Vec::new(),
            observer: None,
        }
    }

    /// Start with no write effects and no observer
    pub fn start<L, F>(config: SupervisorConfig, locator: L, factory: F) -> MemoryResult<Self>
    where
        L: ProcessLocator,
        F: SessionFactory,
    {
        Self::builder(config).start(locator, factory)
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.state()
    }

    /// True while a session object exists and is waiting or polling
    pub fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::SeqCst)
    }

    pub fn ticks_per_second(&self) -> u32 {
        self.shared.ticks_per_second.load(Ordering::SeqCst)
    }

    /// Module base of the current attachment; null when not attached
    pub fn module_base(&self) -> Address {
        Address::new(self.shared.module_base.load(Ordering::SeqCst))
    }

    /// The current attachment, if any
    pub fn attachment(&self) -> Option<Arc<Attachment>> {
        self.shared.attachment()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.shared.diagnostics()
    }

    /// Ask the worker to drop the active session and return to `Idle`
    ///
    /// Only honoured while `Active`; returns whether the request was recorded.
    pub fn request_restart(&self) -> bool {
        if self.state() != LifecycleState::Active {
            return false;
        }
        self.shared.restart_requested.store(true, Ordering::SeqCst);
        info!("restart requested");
        true
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .map(|w| !w.is_finished())
            .unwrap_or(false)
    }

    /// Signal the worker and wait for it to exit
    ///
    /// The current poll iteration completes first; no read or write is in
    /// flight once this returns.
    pub fn shutdown(&mut self) {
        self.shared.shutdown.trigger();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("memory worker panicked during shutdown");
            }
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionExit {
    Restart,
    SessionEnded,
    ProcessGone,
    Shutdown,
}

struct Worker<L, F> {
    locator: L,
    factory: F,
    shared: Arc<SharedState>,
    config: SupervisorConfig,
    effects: Vec<Arc<dyn WriteEffect>>,
    observer: Option<Sender<LifecycleState>>,
}

impl<L: ProcessLocator, F: SessionFactory> Worker<L, F> {
    fn run(&mut self) -> MemoryResult<()> {
        info!(
            process = %self.config.process_name,
            module = %self.config.module_name,
            "memory worker started"
        );

        while !self.shared.shutdown.is_shutdown() {
            self.transition(LifecycleState::SearchingProcess);
            let Some(process) = self.search_process() else {
                break;
            };

            let Some(attachment) = self.attach(process) else {
                self.transition(LifecycleState::SearchingProcess);
                if self.shared.shutdown.wait(self.config.module_retry) {
                    break;
                }
                continue;
            };

            let exit = self.run_sessions(&attachment)?;
            self.shared.publish(None);
            if exit == SessionExit::Shutdown {
                break;
            }
        }

        self.shared.ready.store(false, Ordering::SeqCst);
        self.shared.publish(None);
        Ok(())
    }

    fn transition(&self, next: LifecycleState) {
        let prev = LifecycleState::from_u8(self.shared.state.swap(next as u8, Ordering::SeqCst));
        debug_assert!(
            !(prev == LifecycleState::Active && next == LifecycleState::Active),
            "Active must be left before it is re-entered"
        );
        if prev == next {
            return;
        }

        info!(from = %prev, to = %next, "lifecycle transition");
        if let Some(observer) = &self.observer {
            let _ = observer.send(next);
        }
    }

    /// Poll for the target until found; `None` on shutdown
    fn search_process(&mut self) -> Option<ProcessInfo> {
        loop {
            match self.locator.find_process(&self.config.process_name) {
                Ok(Some(process)) => {
                    info!(pid = process.pid, name = %process.name, "target process found");
                    return Some(process);
                }
                Ok(None) => debug!(process = %self.config.process_name, "target process not found"),
                Err(e) => warn!(process = %self.config.process_name, error = %e, "process search failed"),
            }

            if self.shared.shutdown.wait(self.config.process_retry) {
                return None;
            }
        }
    }

    fn attach(&mut self, process: ProcessInfo) -> Option<Arc<Attachment>> {
        self.transition(LifecycleState::SearchingModule);

        let memory = match self.locator.open(&process) {
            Ok(memory) => memory,
            Err(e) => {
                warn!(pid = process.pid, error = %e, "failed to open target process");
                return None;
            }
        };

        let module = match self.locator.find_module(process.pid, &self.config.module_name) {
            Ok(Some(module)) => module,
            Ok(None) => {
                let e = MemoryError::ModuleNotFound(self.config.module_name.clone());
                warn!(pid = process.pid, error = %e, "module lookup failed");
                return None;
            }
            Err(e) => {
                warn!(pid = process.pid, error = %e, "module lookup failed");
                return None;
            }
        };

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let attachment = Arc::new(Attachment::new(
            process,
            module,
            memory,
            generation,
            self.config.limits,
            self.config.strings,
        ));
        info!(
            pid = attachment.pid(),
            module = %attachment.module().name,
            base = %attachment.module_base(),
            generation,
            "attached to target"
        );

        self.shared.publish(Some(Arc::clone(&attachment)));
        Some(attachment)
    }

    fn run_sessions(&mut self, attachment: &Arc<Attachment>) -> MemoryResult<SessionExit> {
        let shared = Arc::clone(&self.shared);

        loop {
            if shared.shutdown.is_shutdown() {
                return Ok(SessionExit::Shutdown);
            }

            let mut session = self.factory.create(attachment);
            self.transition(LifecycleState::Idle);
            shared.ready.store(true, Ordering::SeqCst);
            info!("ready, waiting for session start");

            let outcome = {
                let ctx = SessionContext::new(attachment, &shared.shutdown);
                session.wait_for_start(&ctx)
            };
            let exit = match outcome {
                Ok(WaitOutcome::Started) => {
                    // Cleared before Active is published, never after
                    shared.restart_requested.store(false, Ordering::SeqCst);
                    self.transition(LifecycleState::Active);
                    self.poll(&mut session, attachment)?
                }
                Ok(WaitOutcome::ProcessGone) => SessionExit::ProcessGone,
                Ok(WaitOutcome::Cancelled) => SessionExit::Shutdown,
                Err(e) => {
                    if Self::target_lost(e, attachment, "waiting for session start")? {
                        SessionExit::ProcessGone
                    } else {
                        SessionExit::SessionEnded
                    }
                }
            };

            // Ready drops before the state leaves Idle/Active
            shared.ready.store(false, Ordering::SeqCst);
            drop(session);

            match exit {
                SessionExit::Restart | SessionExit::SessionEnded => {
                    self.transition(LifecycleState::Idle);
                    if shared.shutdown.wait(self.config.session_end_debounce) {
                        return Ok(SessionExit::Shutdown);
                    }
                }
                SessionExit::ProcessGone => {
                    info!(pid = attachment.pid(), "target process gone");
                    self.transition(LifecycleState::SearchingProcess);
                    shared.shutdown.wait(self.config.session_end_debounce);
                    return Ok(exit);
                }
                SessionExit::Shutdown => return Ok(exit),
            }
        }
    }

    fn poll(&mut self, session: &mut F::Session, attachment: &Attachment) -> MemoryResult<SessionExit> {
        let shared = Arc::clone(&self.shared);
        let mut clock = TickClock::new();

        loop {
            let started = Instant::now();
            if let Some(ticks) = clock.tick() {
                shared.ticks_per_second.store(ticks, Ordering::SeqCst);
            }

            if shared.restart_requested.swap(false, Ordering::SeqCst) {
                info!("restarting session");
                self.revert_effects(attachment);
                return Ok(SessionExit::Restart);
            }

            let mut entries = session.build_scatter_entries(attachment);
            if !entries.is_empty() {
                attachment.scatter().read(&mut entries);
            }

            match session.on_poll_cycle(attachment, &mut entries) {
                Ok(PollOutcome::Continue) => {}
                Ok(PollOutcome::SessionEnded) => {
                    info!("session ended");
                    return Ok(SessionExit::SessionEnded);
                }
                Ok(PollOutcome::ProcessGone) => return Ok(SessionExit::ProcessGone),
                Err(e) => {
                    if Self::target_lost(e, attachment, "poll cycle")? {
                        return Ok(SessionExit::ProcessGone);
                    }
                }
            }

            // Cancellation is honoured only between iterations
            if shared.shutdown.is_shutdown() {
                return Ok(SessionExit::Shutdown);
            }
            self.pace(started);
        }
    }

    /// Classify a session error: `Ok(true)` if the target is gone, `Ok(false)`
    /// if it was logged and can be ignored, `Err` if it is fatal.
    fn target_lost(error: MemoryError, attachment: &Attachment, during: &str) -> MemoryResult<bool> {
        if matches!(error, MemoryError::ProcessGone(_)) || !attachment.is_alive() {
            debug!(error = %error, "{} failed on a dead target", during);
            return Ok(true);
        }
        if !error.is_recoverable() {
            return Err(error);
        }
        warn!(error = %error, "{} failed", during);
        Ok(false)
    }

    fn revert_effects(&self, attachment: &Attachment) {
        for effect in self.effects.iter().filter(|e| e.is_active()) {
            if let Err(e) = effect.revert(attachment) {
                warn!(effect = effect.name(), error = %e, "failed to revert write effect");
            }
        }
    }

    fn pace(&self, started: Instant) {
        match self
            .config
            .min_iteration_interval
            .checked_sub(started.elapsed())
        {
            Some(remaining) if !remaining.is_zero() => thread::sleep(remaining),
            _ => thread::yield_now(),
        }
    }
}
