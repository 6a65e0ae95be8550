//! Remote scrape job client
//!
//! ```text
//! ┌────────────┐  POST actor-tasks/{task}/runs   ┌──────────────┐
//! │ ApifyClient│ ──────────────────────────────► │ remote API   │
//! │            │  GET  actor-runs/{id}  (poll)   │              │
//! │            │ ──────────────────────────────► │              │
//! │            │  GET  actor-runs/{id}/dataset/  │              │
//! │            │       items                     │              │
//! └─────┬──────┘ ──────────────────────────────► └──────────────┘
//!       │ JobHandle (dataset bytes | JobError)
//!       ▼
//!    caller
//! ```

pub mod backoff;
pub mod client;
pub mod error;
pub mod job;
pub mod models;

pub use backoff::{Backoff, INITIAL_INTERVAL, MAX_INTERVAL};
pub use client::{ApifyClient, ClientConfig, DEFAULT_BASE_URL};
pub use error::JobError;
pub use job::{JobHandle, RunStatus, ScrapeJob};
pub use models::{RunEnvelope, RunInfo};
