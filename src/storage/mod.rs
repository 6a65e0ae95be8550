//! POI persistence
//!
//! Business logic talks to a [`PoiRepository`]; the PostgreSQL/PostGIS
//! implementation backs production and the in-memory one backs tests and
//! `serve --memory`.
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │      IngestionPipeline       │   │       GeoQueryService        │
//! └──────────────┬───────────────┘   └──────────────┬───────────────┘
//!                └────────────────┬─────────────────┘
//!                                 ▼
//!                 ┌──────────────────────────────┐
//!                 │        PoiRepository         │
//!                 └──────────────────────────────┘
//!                     │                      │
//!                     ▼                      ▼
//!           ┌──────────────────┐   ┌──────────────────┐
//!           │ PostgreSQL/PostGIS│   │    In-memory     │
//!           └──────────────────┘   └──────────────────┘
//! ```

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use h3o::CellIndex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::geo::{BoundingBox, Coordinate, RouteBuffer};
use crate::models::PoiKind;

pub use memory::MemoryPoiRepository;
pub use postgres::{PostgresConfig, PostgresPoiRepository};

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create connection pool: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    #[error("Failed to get connection from pool: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// Stored value that does not map back onto a row
    #[error("Invalid stored value in column {column}: {reason}")]
    InvalidRow { column: &'static str, reason: String },
}

impl StorageError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            StorageError::Pool(_) => true,
            // Server-side errors carry a SQLSTATE; anything else is the connection
            StorageError::Database(e) => e.as_db_error().is_none(),
            StorageError::CreatePool(_) | StorageError::InvalidRow { .. } => false,
        }
    }
}

// ============================================================================
// Row Shape
// ============================================================================

/// One persisted point of interest
///
/// Absent optional text is stored as an empty string. Payloads the system
/// does not interpret live in `attributes` under their wire names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoiRow {
    /// Storage-assigned id, absent before insert
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub place_id: String,
    pub kind: PoiKind,

    pub search_string: String,
    pub rank: i32,
    pub search_page_url: String,
    pub search_page_loaded_url: String,
    pub is_advertisement: bool,

    pub title: String,
    pub sub_title: String,
    pub description: String,
    pub price: String,
    pub category_name: String,
    pub categories: Vec<String>,

    pub address: String,
    pub neighborhood: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub state: String,
    pub country_code: String,
    pub located_in: String,
    pub plus_code: String,

    pub website: String,
    pub phone: String,
    pub phone_unformatted: String,
    pub claim_this_business: bool,

    pub location_lat: f64,
    pub location_lng: f64,
    /// Cell at the storage resolution; `None` when it could not be computed
    pub h3_index: Option<String>,

    pub total_score: f64,
    pub permanently_closed: bool,
    pub temporarily_closed: bool,
    pub reviews_count: i32,
    pub images_count: i32,
    pub image_categories: Vec<String>,

    pub scraped_at: DateTime<Utc>,
    /// Never populated from input
    pub google_food_url: Option<String>,

    pub url: String,
    pub image_url: String,
    pub image_urls: Vec<String>,
    pub images: String,
    pub kgmid: String,
    pub fid: String,
    pub cid: String,

    pub menu: String,
    pub reserve_table_url: String,
    pub hotel_stars: String,
    pub hotel_description: String,
    pub check_in_date: String,
    pub check_out_date: String,
    pub popular_times_live_text: String,
    pub popular_times_live_percent: i32,
    pub parent_place_url: String,

    pub attributes: Map<String, Value>,
}

impl PoiRow {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.location_lat, self.location_lng)
    }

    /// Case-insensitive substring match on the category name
    pub fn category_matches(&self, substring: &str) -> bool {
        self.category_name
            .to_lowercase()
            .contains(&substring.to_lowercase())
    }
}

/// Result of an insert that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Place id was already stored
    AlreadyPresent,
    /// Insert returned no row
    NoRow,
}

// ============================================================================
// Repository Trait
// ============================================================================

/// Storage of POI rows
///
/// Every list operation takes an optional category substring; `None` means
/// no category filter. Results come back in storage order.
#[async_trait]
pub trait PoiRepository: Send + Sync {
    /// Insert a row keyed by its place id
    ///
    /// Re-inserting an existing place id is not an error.
    async fn insert(&self, row: &PoiRow) -> Result<InsertOutcome, StorageError>;

    /// Rows whose cell lies inside any of the given coarser cells
    async fn list_by_cells(
        &self,
        cells: &[CellIndex],
        category: Option<&str>,
    ) -> Result<Vec<PoiRow>, StorageError>;

    /// Rows whose coordinate lies inside the box
    async fn list_in_box(
        &self,
        bbox: &BoundingBox,
        category: Option<&str>,
    ) -> Result<Vec<PoiRow>, StorageError>;

    /// Rows within the buffer distance of the route segment
    async fn list_along_route(
        &self,
        route: &RouteBuffer,
        category: Option<&str>,
    ) -> Result<Vec<PoiRow>, StorageError>;

    /// Number of stored rows
    async fn count(&self) -> Result<usize, StorageError>;
}

/// Shared repository handle
pub type SharedPoiRepository = Arc<dyn PoiRepository>;

/// Create an in-memory repository
pub fn create_memory_repository() -> SharedPoiRepository {
    Arc::new(MemoryPoiRepository::new())
}

/// Connect to PostgreSQL and make sure the schema exists
pub async fn create_postgres_repository(
    config: PostgresConfig,
) -> Result<SharedPoiRepository, StorageError> {
    let repo = PostgresPoiRepository::connect(config).await?;
    repo.init_schema().await?;
    Ok(Arc::new(repo))
}
