//! Polling and booking orchestration
//!
//! ```text
//! ┌──────────────┐  bounded mpsc   ┌──────────┐
//! │ Orchestrator │────────────────▶│ Worker 1 │──┐
//! │ (round-robin │   Location      ├──────────┤  │  BookingLock (one at a time)
//! │  locations)  │                 │ Worker N │──┤  create → create → confirm
//! └──────┬───────┘                 └────┬─────┘  │
//!        │                              │        ▼
//!        └────────── StopSignal ◀───────┴── confirmed
//! ```
//!
//! Every worker shares one [`Session`], one [`BookingLock`] and one
//! [`StopSignal`] through a [`BookingContext`].

pub mod orchestrator;
pub mod settings;
pub mod stats;
pub mod worker;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, MutexGuard};

use crate::session::Session;

pub use orchestrator::{Orchestrator, RunSummary};
pub use settings::{SettingsResolver, DEFAULT_VISIT_MOTIVE};
pub use stats::{BookerStats, StatsSnapshot};
pub use worker::{CycleOutcome, Worker, WorkerReport};

/// Why the run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A worker issued the confirmation request
    Booked,
    /// The operator asked the process to stop
    Interrupted,
}

/// One-shot, process-wide stop flag
///
/// Backed by a watch channel so waiters are woken without polling. The first
/// trigger wins and the state never goes back.
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<Option<StopReason>>>,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Set the signal; returns false if it was already set
    pub fn trigger(&self, reason: StopReason) -> bool {
        self.tx.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some(reason);
            true
        })
    }

    pub fn is_stopped(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn reason(&self) -> Option<StopReason> {
        *self.tx.borrow()
    }

    /// Resolve once the signal is set
    pub async fn stopped(&self) -> StopReason {
        let mut rx = self.tx.subscribe();
        let reason = match rx.wait_for(Option::is_some).await {
            Ok(state) => (*state).unwrap_or(StopReason::Interrupted),
            // Unreachable while we hold the sender
            Err(_) => StopReason::Interrupted,
        };
        reason
    }
}

/// Mutual exclusion around the create → confirm booking sequence
#[derive(Debug, Clone, Default)]
pub struct BookingLock {
    inner: Arc<Mutex<()>>,
}

impl BookingLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.inner.lock().await
    }

    pub fn try_acquire(&self) -> Option<MutexGuard<'_, ()>> {
        self.inner.try_lock().ok()
    }
}

/// First-dose searches only need the earliest slot
pub const FIRST_DOSE_LIMIT: u32 = 1;

/// Window of days searched for the follow-up dose
pub const FOLLOW_UP_LIMIT: u32 = 4;

/// State shared by the orchestrator and every worker
#[derive(Debug)]
pub struct BookingContext {
    pub session: Arc<Session>,
    pub resolver: SettingsResolver,
    pub lock: BookingLock,
    pub stop: StopSignal,
    pub stats: BookerStats,

    /// Delay before each settings fetch
    pub pacing: Duration,
}

impl BookingContext {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            resolver: SettingsResolver::default(),
            lock: BookingLock::new(),
            stop: StopSignal::new(),
            stats: BookerStats::default(),
            pacing: Duration::from_secs(1),
        }
    }

    pub fn with_resolver(mut self, resolver: SettingsResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }
}
