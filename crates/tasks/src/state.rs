// crates/tasks/src/state.rs
//! Single-flight state for one task runner.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::RwLock;

use serde::Serialize;
use skyview_core::{JobId, TaskOutcome, TaskPhase};

/// Point-in-time view of a runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerSnapshot {
    pub phase: TaskPhase,
    pub running: bool,
    pub job_id: Option<JobId>,
    /// Outcome of the most recent finished invocation.
    pub last_outcome: Option<TaskOutcome>,
}

/// Running flag, phase and job id of the runner's current invocation.
///
/// Only the holder of the [`ActiveRun`] guard writes to the slot.
#[derive(Debug)]
pub struct JobSlot {
    running: AtomicBool,
    phase: AtomicU8,
    job_id: RwLock<Option<JobId>>,
    last_outcome: RwLock<Option<TaskOutcome>>,
}

impl JobSlot {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            phase: AtomicU8::new(TaskPhase::Idle as u8),
            job_id: RwLock::new(None),
            last_outcome: RwLock::new(None),
        }
    }

    /// Claim the slot for a new invocation (`Idle -> Submitting`).
    ///
    /// Returns `None` while another invocation holds it.
    pub fn try_acquire(&self) -> Option<ActiveRun<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.phase.store(TaskPhase::Submitting as u8, Ordering::Release);
        Some(ActiveRun { slot: self })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> RunnerSnapshot {
        RunnerSnapshot {
            phase: TaskPhase::from_u8(self.phase.load(Ordering::Acquire)),
            running: self.is_running(),
            job_id: match self.job_id.read() {
                Ok(guard) => guard.clone(),
                Err(e) => {
                    tracing::error!("RwLock poisoned reading job id: {e}");
                    None
                }
            },
            last_outcome: match self.last_outcome.read() {
                Ok(guard) => *guard,
                Err(e) => {
                    tracing::error!("RwLock poisoned reading outcome: {e}");
                    None
                }
            },
        }
    }

    fn write_job_id(&self, id: Option<JobId>) {
        match self.job_id.write() {
            Ok(mut guard) => *guard = id,
            Err(e) => tracing::error!("RwLock poisoned writing job id: {e}"),
        }
    }
}

impl Default for JobSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive claim on a [`JobSlot`]. Dropping it resets the slot to `Idle`.
#[derive(Debug)]
pub struct ActiveRun<'a> {
    slot: &'a JobSlot,
}

impl ActiveRun<'_> {
    /// Record the accepted job and move to `Polling`.
    pub fn start_polling(&self, id: JobId) {
        self.slot.write_job_id(Some(id));
        self.slot.phase.store(TaskPhase::Polling as u8, Ordering::Release);
    }

    pub fn record(&self, outcome: TaskOutcome) {
        match self.slot.last_outcome.write() {
            Ok(mut guard) => *guard = Some(outcome),
            Err(e) => tracing::error!("RwLock poisoned writing outcome: {e}"),
        }
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        self.slot.write_job_id(None);
        self.slot.phase.store(TaskPhase::Idle as u8, Ordering::Release);
        // Released last so a new claim never observes stale fields.
        self.slot.running.store(false, Ordering::Release);
    }
}
