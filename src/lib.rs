//! poidata - POI harvesting and geographic lookup
//!
//! Runs remote scrape tasks, ingests the resulting datasets into a spatially
//! indexed store and answers geography-scoped queries.
//!
//! # Architecture
//!
//! - [`apify`] - Remote task client with backoff polling
//! - [`parser`] - Discriminator-driven dataset decoding
//! - [`models`] - Record types and task input payloads
//! - [`geo`] - H3 cell assignment and query shapes
//! - [`ingest`] - Idempotent ingestion pipeline
//! - [`storage`] - PostgreSQL/PostGIS and in-memory repositories
//! - [`query`] - Cell, box and route queries
//! - [`maps`] - Search façade tying the client to the pipeline
//! - [`server`] - HTTP surface
//! - [`config`] - Configuration management
//!
//! # Example
//!
//! ```no_run
//! use poidata::config::Config;
//! use poidata::query::GeoQueryService;
//! use poidata::storage::create_postgres_repository;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let repo = create_postgres_repository(config.postgres_config()).await?;
//!     let pois = GeoQueryService::new(repo);
//!     let mut batches = pois.list_by_cells(&["872a1072bffffff".to_string()]).await?;
//!     while let Some(batch) = batches.next_batch().await {
//!         println!("{} POIs", batch.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod apify;
pub mod config;
pub mod error;
pub mod geo;
pub mod ingest;
pub mod maps;
pub mod models;
pub mod parser;
pub mod query;
pub mod server;
pub mod storage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::apify::{ApifyClient, ClientConfig, JobHandle, RunStatus};
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, PoiErrorTrait, Result};
    pub use crate::geo::{BoundingBox, Coordinate, GeoIndexer, RouteBuffer};
    pub use crate::ingest::{DatasetKind, IngestStats, IngestionPipeline};
    pub use crate::maps::MapsService;
    pub use crate::models::{Poi, PoiKind};
    pub use crate::query::{GeoQueryService, ListPoiResponse};
    pub use crate::storage::{PoiRepository, PoiRow, SharedPoiRepository};
}

pub use error::{Error, Result};
pub use models::{Poi, PoiKind};
