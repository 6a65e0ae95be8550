//! Scrape run state and the caller-side handle
//!
//! ```text
//!   submit ──► ScrapeJob ──spawn──► poll task ──oneshot──► JobHandle::wait()
//!                 │                     │
//!                 └ QUEUED → RUNNING* → SUCCEEDED | FAILED | ABORTED | TIMED-OUT
//! ```
//!
//! The poll task owns the [`ScrapeJob`]. The caller only ever sees the single
//! terminal result through the [`JobHandle`]. Dropping the handle or giving up
//! on it stops the local poll task; the remote run keeps going.

use std::fmt;
use std::future::Future;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::backoff::Backoff;
use super::error::JobError;

// ============================================================================
// Run Status
// ============================================================================

/// Status of a remote scrape run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum RunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Aborted,
    TimedOut,
}

impl RunStatus {
    /// Map a provider status string
    ///
    /// `READY` is the provider's name for queued. Transitional states such as
    /// `ABORTING` and `TIMING-OUT`, and anything unknown, count as running.
    pub fn from_remote(status: &str) -> Self {
        match status {
            "READY" | "QUEUED" => RunStatus::Queued,
            "SUCCEEDED" => RunStatus::Succeeded,
            "FAILED" => RunStatus::Failed,
            "ABORTED" => RunStatus::Aborted,
            "TIMED-OUT" => RunStatus::TimedOut,
            _ => RunStatus::Running,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Queued | RunStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "QUEUED",
            RunStatus::Running => "RUNNING",
            RunStatus::Succeeded => "SUCCEEDED",
            RunStatus::Failed => "FAILED",
            RunStatus::Aborted => "ABORTED",
            RunStatus::TimedOut => "TIMED-OUT",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            RunStatus::Queued => 0,
            RunStatus::Running => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Scrape Job
// ============================================================================

/// Local view of one remote run
#[derive(Debug, Clone)]
pub struct ScrapeJob {
    run_id: String,
    status: RunStatus,
    backoff: Backoff,
}

impl ScrapeJob {
    pub fn new(run_id: impl Into<String>, status: RunStatus, backoff: Backoff) -> Self {
        Self {
            run_id: run_id.into(),
            status,
            backoff,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn backoff_mut(&mut self) -> &mut Backoff {
        &mut self.backoff
    }

    /// Record a freshly polled status
    ///
    /// Statuses only move forward. A stale `QUEUED` after `RUNNING` is kept as
    /// `RUNNING`; any change out of a terminal status is rejected.
    pub fn advance(&mut self, next: RunStatus) -> Result<RunStatus, JobError> {
        if self.status.is_terminal() {
            if next == self.status {
                return Ok(self.status);
            }
            return Err(JobError::InvalidTransition {
                run_id: self.run_id.clone(),
                from: self.status,
                to: next,
            });
        }

        if next.rank() >= self.status.rank() {
            self.status = next;
        }
        Ok(self.status)
    }

    /// Error for a failing terminal status, if any
    pub fn terminal_error(&self) -> Option<JobError> {
        let run_id = self.run_id.clone();
        match self.status {
            RunStatus::Failed => Some(JobError::RunFailed { run_id }),
            RunStatus::Aborted => Some(JobError::RunAborted { run_id }),
            RunStatus::TimedOut => Some(JobError::RunTimedOut { run_id }),
            _ => None,
        }
    }
}

// ============================================================================
// Job Handle
// ============================================================================

/// Caller side of a submitted run
///
/// Exactly one terminal result is delivered: the dataset bytes or an error.
#[derive(Debug)]
pub struct JobHandle {
    run_id: String,
    rx: oneshot::Receiver<Result<Bytes, JobError>>,
}

impl JobHandle {
    pub(crate) fn new(run_id: String, rx: oneshot::Receiver<Result<Bytes, JobError>>) -> Self {
        Self { run_id, rx }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Wait for the run to finish and its dataset to be fetched
    ///
    /// # Errors
    ///
    /// Returns the poll task's error, or `JobError::TaskDropped` if the task
    /// ended without reporting.
    pub async fn wait(self) -> Result<Bytes, JobError> {
        let run_id = self.run_id;
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(JobError::TaskDropped { run_id }),
        }
    }

    /// Wait until the run finishes or `cancel` completes, whichever is first
    ///
    /// Cancelling only stops the local wait and the poll task; the remote run
    /// is left running.
    pub async fn wait_until<F>(self, cancel: F) -> Result<Bytes, JobError>
    where
        F: Future<Output = ()>,
    {
        let run_id = self.run_id.clone();
        tokio::select! {
            result = self.wait() => result,
            () = cancel => Err(JobError::Cancelled { run_id }),
        }
    }
}
