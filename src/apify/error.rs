//! Error types for the remote job client

use serde_json::Value;
use thiserror::Error;

use super::job::RunStatus;

/// Errors raised while submitting, polling or collecting a scrape run
#[derive(Error, Debug)]
pub enum JobError {
    /// Transport failure talking to the remote API
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote API answered with something other than 200 or 201
    #[error("Unexpected status code: {status}{}", format_body(.body))]
    Status { status: u16, body: Option<Value> },

    /// Response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Request URL could not be built from the configured base
    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Run finished with FAILED
    #[error("Run {run_id} failed")]
    RunFailed { run_id: String },

    /// Run finished with ABORTED
    #[error("Run {run_id} aborted")]
    RunAborted { run_id: String },

    /// Run finished with TIMED-OUT
    #[error("Run {run_id} timed out")]
    RunTimedOut { run_id: String },

    /// Status moved out of a terminal state
    #[error("Invalid status transition for run {run_id}: {from} -> {to}")]
    InvalidTransition {
        run_id: String,
        from: RunStatus,
        to: RunStatus,
    },

    /// Caller stopped waiting; the remote run keeps going
    #[error("Stopped waiting for run {run_id}")]
    Cancelled { run_id: String },

    /// Polling task ended without reporting a result
    #[error("Polling task for run {run_id} ended unexpectedly")]
    TaskDropped { run_id: String },
}

fn format_body(body: &Option<Value>) -> String {
    match body {
        Some(body) => format!(", error response: {body}"),
        None => String::new(),
    }
}

impl JobError {
    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            JobError::Http(e) => e.is_timeout() || e.is_connect(),
            JobError::Status { status, .. } => *status == 429 || *status >= 500,
            JobError::RunTimedOut { .. } | JobError::Cancelled { .. } => true,
            JobError::Decode(_)
            | JobError::InvalidUrl(_)
            | JobError::RunFailed { .. }
            | JobError::RunAborted { .. }
            | JobError::InvalidTransition { .. }
            | JobError::TaskDropped { .. } => false,
        }
    }

    /// Whether the remote run itself reached a failing terminal state
    pub fn is_terminal_run_failure(&self) -> bool {
        matches!(
            self,
            JobError::RunFailed { .. } | JobError::RunAborted { .. } | JobError::RunTimedOut { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_includes_body() {
        let err = JobError::Status {
            status: 401,
            body: Some(serde_json::json!({"error": {"type": "token-not-valid"}})),
        };
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("token-not-valid"));

        let bare = JobError::Status {
            status: 502,
            body: None,
        };
        assert_eq!(bare.to_string(), "Unexpected status code: 502");
        assert!(bare.is_recoverable());
    }

    #[test]
    fn test_terminal_failures_are_distinct() {
        let failed = JobError::RunFailed {
            run_id: "r1".to_string(),
        };
        assert!(failed.is_terminal_run_failure());
        assert!(!failed.is_recoverable());

        let cancelled = JobError::Cancelled {
            run_id: "r1".to_string(),
        };
        assert!(!cancelled.is_terminal_run_failure());
    }
}
