//! Ingestion pipeline
//!
//! ```text
//! dataset bytes ──► parse_pois ──► kind filter ──► poi_to_row ──► repository
//!                                                   (h3 cell)     (idempotent)
//! ```
//!
//! Items are processed one at a time. A failure on one item is logged and
//! counted; it never stops the rest of the batch. Duplicate place ids are
//! reported by storage and counted as already present.

pub mod row;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::geo::GeoIndexer;
use crate::models::{Poi, PoiKind};
use crate::parser::{parse_pois, ParseError};
use crate::storage::{InsertOutcome, SharedPoiRepository};

pub use row::{parse_scraped_at, poi_to_row};

// ============================================================================
// Dataset Kind
// ============================================================================

/// Engine that produced a dataset
///
/// Ingesting a dataset under a kind keeps only the records that engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    GoogleMapsExtractor,
    GoogleMapsScraper,
    Tripadvisor,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::GoogleMapsExtractor => "google_maps_extractor",
            DatasetKind::GoogleMapsScraper => "google_maps_scraper",
            DatasetKind::Tripadvisor => "tripadvisor",
        }
    }

    /// Whether records of `kind` belong to this dataset
    pub fn accepts(&self, kind: PoiKind) -> bool {
        match self {
            DatasetKind::GoogleMapsExtractor => kind == PoiKind::GooglePlaceExtractor,
            DatasetKind::GoogleMapsScraper => kind == PoiKind::GooglePlaceScraper,
            DatasetKind::Tripadvisor => kind.is_tripadvisor(),
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "google_maps_extractor" | "extractor" => Ok(DatasetKind::GoogleMapsExtractor),
            "google_maps_scraper" | "scraper" => Ok(DatasetKind::GoogleMapsScraper),
            "tripadvisor" => Ok(DatasetKind::Tripadvisor),
            _ => Err(format!("Unknown dataset kind: {s}")),
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Outcome counts of one ingestion call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Records produced by the parser
    pub parsed: usize,
    pub inserted: usize,
    /// Place id already stored
    pub already_present: usize,
    /// Records of another engine than the dataset kind
    pub skipped: usize,
    /// Records whose translation or insert failed
    pub failed: usize,
}

impl IngestStats {
    /// Records that ended up stored, new or not
    pub fn processed(&self) -> usize {
        self.inserted + self.already_present
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Parses, enriches and persists POIs
#[derive(Clone)]
pub struct IngestionPipeline {
    repo: SharedPoiRepository,
    indexer: GeoIndexer,
}

impl IngestionPipeline {
    pub fn new(repo: SharedPoiRepository) -> Self {
        Self {
            repo,
            indexer: GeoIndexer::new(),
        }
    }

    pub fn repository(&self) -> &SharedPoiRepository {
        &self.repo
    }

    /// Parse a raw dataset and ingest every record
    ///
    /// # Errors
    ///
    /// Returns the parse error when the dataset is unusable; nothing is
    /// persisted in that case.
    pub async fn ingest_bytes(
        &self,
        data: &[u8],
        kind: Option<DatasetKind>,
    ) -> Result<IngestStats, ParseError> {
        let pois = parse_pois(data)?;
        Ok(self.ingest(&pois, kind).await)
    }

    /// Ingest decoded POIs, optionally keeping only one dataset kind
    #[instrument(skip(self, pois), fields(count = pois.len()))]
    pub async fn ingest(&self, pois: &[Poi], kind: Option<DatasetKind>) -> IngestStats {
        let mut stats = IngestStats {
            parsed: pois.len(),
            ..Default::default()
        };

        for poi in pois {
            if let Some(kind) = kind {
                if !kind.accepts(poi.kind()) {
                    debug!(place_id = poi.id(), poi_kind = %poi.kind(), dataset = %kind, "Skipping POI of another kind");
                    stats.skipped += 1;
                    continue;
                }
            }

            let row = match poi_to_row(poi, &self.indexer) {
                Ok(row) => row,
                Err(e) => {
                    warn!(place_id = poi.id(), error = %e, "Failed to build row");
                    stats.failed += 1;
                    continue;
                }
            };

            match self.repo.insert(&row).await {
                Ok(InsertOutcome::Inserted) => stats.inserted += 1,
                Ok(InsertOutcome::AlreadyPresent) => {
                    debug!(place_id = %row.place_id, "POI already exists");
                    stats.already_present += 1;
                }
                Ok(InsertOutcome::NoRow) => {
                    debug!(place_id = %row.place_id, "Insert returned no row");
                    stats.already_present += 1;
                }
                Err(e) => {
                    warn!(place_id = %row.place_id, error = %e, "Failed to insert POI");
                    stats.failed += 1;
                }
            }
        }

        info!(
            parsed = stats.parsed,
            inserted = stats.inserted,
            already_present = stats.already_present,
            skipped = stats.skipped,
            failed = stats.failed,
            "Ingestion finished"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_kind_parse() {
        assert_eq!(
            "GOOGLE_MAPS_EXTRACTOR".parse::<DatasetKind>().unwrap(),
            DatasetKind::GoogleMapsExtractor
        );
        assert_eq!(
            "google-maps-scraper".parse::<DatasetKind>().unwrap(),
            DatasetKind::GoogleMapsScraper
        );
        assert_eq!(
            "tripadvisor".parse::<DatasetKind>().unwrap(),
            DatasetKind::Tripadvisor
        );
        assert!("yelp".parse::<DatasetKind>().is_err());
    }

    #[test]
    fn test_dataset_kind_accepts() {
        assert!(DatasetKind::GoogleMapsExtractor.accepts(PoiKind::GooglePlaceExtractor));
        assert!(!DatasetKind::GoogleMapsExtractor.accepts(PoiKind::GooglePlaceScraper));
        assert!(DatasetKind::Tripadvisor.accepts(PoiKind::Restaurant));
        assert!(!DatasetKind::Tripadvisor.accepts(PoiKind::GooglePlaceExtractor));
    }

    #[test]
    fn test_processed_counts_duplicates() {
        let stats = IngestStats {
            parsed: 4,
            inserted: 2,
            already_present: 1,
            skipped: 1,
            failed: 0,
        };
        assert_eq!(stats.processed(), 3);
    }
}
