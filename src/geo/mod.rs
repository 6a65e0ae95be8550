//! Geospatial cell indexing
//!
//! Every stored point of interest carries an H3 cell computed at a fixed
//! storage resolution. Queries address groups of POIs through coarser parent
//! cells, so a query cell must always be strictly coarser than the storage
//! resolution.
//!
//! # Example
//!
//! ```
//! use poidata::geo::{GeoIndexer, STORAGE_RESOLUTION};
//!
//! let indexer = GeoIndexer::new();
//! let cell = indexer.assign(57.7089, 11.9746).unwrap();
//! assert_eq!(cell.len(), 15);
//! assert_eq!(indexer.resolution(), STORAGE_RESOLUTION);
//! ```

pub mod shapes;

use h3o::{CellIndex, LatLng, Resolution};
use thiserror::Error;

pub use shapes::{BoundingBox, Coordinate, RouteBuffer};

/// Resolution at which every persisted POI is indexed
pub const STORAGE_RESOLUTION: u8 = 9;

/// Errors raised by cell computation and query-cell validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    /// Coordinate is not finite or lies outside the valid range
    #[error("Invalid coordinate: lat={lat}, lng={lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },

    /// Cell identifier could not be parsed as an H3 cell
    #[error("Invalid h3 index: {cell}")]
    InvalidCell { cell: String },

    /// Cell resolution is not coarser than the storage resolution
    #[error("h3 index resolution {resolution} is too fine (must be below {max}): {cell}")]
    ResolutionTooFine { cell: String, resolution: u8, max: u8 },

    /// Bounding box has a non-finite corner
    #[error("Invalid bounding box: ({min_x}, {min_y}) - ({max_x}, {max_y})")]
    InvalidBox {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },

    /// Route buffer distance is negative or not finite
    #[error("Invalid route buffer: {buffer}")]
    InvalidBuffer { buffer: f64 },

    /// Query named no cells at all
    #[error("At least one h3 index is required")]
    EmptyCellSet,
}

/// Assigns storage cells to coordinates
#[derive(Debug, Clone, Copy)]
pub struct GeoIndexer {
    resolution: Resolution,
}

impl Default for GeoIndexer {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoIndexer {
    /// Create an indexer working at [`STORAGE_RESOLUTION`]
    pub fn new() -> Self {
        Self {
            resolution: Resolution::Nine,
        }
    }

    /// Resolution used for stored cells
    pub fn resolution(&self) -> u8 {
        u8::from(self.resolution)
    }

    /// Compute the storage cell for a latitude/longitude pair
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidCoordinate`] for non-finite or out-of-range input.
    pub fn assign(&self, lat: f64, lng: f64) -> Result<String, GeoError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::InvalidCoordinate { lat, lng });
        }

        let point = LatLng::new(lat, lng).map_err(|_| GeoError::InvalidCoordinate { lat, lng })?;

        Ok(point.to_cell(self.resolution).to_string())
    }

    /// Like [`assign`](Self::assign) but logs and swallows failures
    pub fn assign_or_log(&self, lat: f64, lng: f64) -> Option<String> {
        match self.assign(lat, lng) {
            Ok(cell) => Some(cell),
            Err(e) => {
                tracing::warn!(lat, lng, error = %e, "Failed to compute h3 index");
                None
            }
        }
    }
}

/// Parse a cell identifier and check it can be used as a query cell
///
/// # Errors
///
/// Returns [`GeoError::InvalidCell`] when the string is not a valid cell, and
/// [`GeoError::ResolutionTooFine`] when its resolution is not strictly below
/// [`STORAGE_RESOLUTION`].
pub fn parse_query_cell(cell: &str) -> Result<CellIndex, GeoError> {
    let index: CellIndex = cell.trim().parse().map_err(|_| GeoError::InvalidCell {
        cell: cell.to_string(),
    })?;

    let resolution = u8::from(index.resolution());
    if resolution >= STORAGE_RESOLUTION {
        return Err(GeoError::ResolutionTooFine {
            cell: cell.to_string(),
            resolution,
            max: STORAGE_RESOLUTION,
        });
    }

    Ok(index)
}

/// Validate a whole query cell set, rejecting it on the first bad entry
pub fn validate_query_cells(cells: &[String]) -> Result<Vec<CellIndex>, GeoError> {
    if cells.is_empty() {
        return Err(GeoError::EmptyCellSet);
    }

    cells.iter().map(|c| parse_query_cell(c)).collect()
}

/// Check whether a stored cell lies inside any of the query cells
pub fn cell_within_any(stored: &str, query_cells: &[CellIndex]) -> bool {
    let Ok(stored) = stored.parse::<CellIndex>() else {
        return false;
    };

    query_cells.iter().any(|query| {
        stored
            .parent(query.resolution())
            .is_some_and(|parent| parent == *query)
    })
}
