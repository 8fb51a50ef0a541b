// crates/tasks/src/lib.rs
//! Long-running task execution against the observatory API server.
//!
//! Provides:
//! - `TaskRunner` — submit a job, poll for readiness, return the typed result
//! - `JobService` / `HttpJobService` — the job service contract and its HTTP client
//! - `JobSlot` — single-flight runner state
//! - `TaskHandle` — handle for runs spawned onto the runtime

pub mod client;
pub mod error;
pub mod runner;
pub mod state;
pub mod types;

pub use client::{HttpJobService, JobService, SubmitRequest};
pub use error::{failure_message, JobServiceError, TaskError};
pub use runner::TaskRunner;
pub use state::{JobSlot, RunnerSnapshot};
pub use types::TaskHandle;
