//! Geography-scoped POI queries
//!
//! Input is validated before storage is touched. Every call performs exactly
//! one storage read. The cell-set query hands its result back in batches over
//! a bounded channel, so the producer waits for the consumer on every batch.
//!
//! ```text
//!  cells ──validate──► repository ──rows──► producer task ──batch──► CellBatches
//!                                           (chunks of 150)  cap 1
//! ```

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, instrument};

use crate::geo::{validate_query_cells, BoundingBox, GeoError, RouteBuffer};
use crate::storage::{PoiRow, SharedPoiRepository, StorageError};

/// Rows per streamed batch of a cell-set query
pub const BATCH_SIZE: usize = 150;

#[derive(Error, Debug)]
pub enum QueryError {
    /// Query input rejected before reaching storage
    #[error("Invalid query: {0}")]
    Invalid(#[from] GeoError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// One response worth of POIs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListPoiResponse {
    pub pois: Vec<PoiRow>,
}

impl ListPoiResponse {
    pub fn len(&self) -> usize {
        self.pois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pois.is_empty()
    }
}

/// Batches of a cell-set query, in storage order
///
/// Dropping it stops the producer.
#[derive(Debug)]
pub struct CellBatches {
    rx: mpsc::Receiver<ListPoiResponse>,
}

impl CellBatches {
    pub async fn next_batch(&mut self) -> Option<ListPoiResponse> {
        self.rx.recv().await
    }

    /// Drain every remaining batch
    pub async fn collect_all(mut self) -> Vec<ListPoiResponse> {
        let mut batches = Vec::new();
        while let Some(batch) = self.rx.recv().await {
            batches.push(batch);
        }
        batches
    }
}

impl Stream for CellBatches {
    type Item = ListPoiResponse;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Read side over the POI repository
#[derive(Clone)]
pub struct GeoQueryService {
    repo: SharedPoiRepository,
    batch_size: usize,
}

impl GeoQueryService {
    pub fn new(repo: SharedPoiRepository) -> Self {
        Self {
            repo,
            batch_size: BATCH_SIZE,
        }
    }

    /// Override the streamed batch size (minimum 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// POIs inside any of the given cells, streamed in batches
    ///
    /// # Errors
    ///
    /// Rejects the whole request if any cell is malformed or not strictly
    /// coarser than the storage resolution.
    #[instrument(skip(self, cells), fields(cells = cells.len()))]
    pub async fn list_by_cells(&self, cells: &[String]) -> Result<CellBatches, QueryError> {
        self.list_by_cells_filtered(cells, None).await
    }

    /// Like [`list_by_cells`](Self::list_by_cells) with a category filter
    pub async fn list_by_cells_with_category(
        &self,
        cells: &[String],
        category: &str,
    ) -> Result<CellBatches, QueryError> {
        self.list_by_cells_filtered(cells, Some(category)).await
    }

    async fn list_by_cells_filtered(
        &self,
        cells: &[String],
        category: Option<&str>,
    ) -> Result<CellBatches, QueryError> {
        let cells = validate_query_cells(cells)?;
        let rows = self.repo.list_by_cells(&cells, category).await?;
        debug!(rows = rows.len(), "Cell query matched");
        Ok(spawn_batches(rows, self.batch_size))
    }

    /// POIs whose coordinate lies in the box
    ///
    /// Corners may be given in either order.
    pub async fn list_in_box(&self, bbox: &BoundingBox) -> Result<ListPoiResponse, QueryError> {
        self.list_in_box_filtered(bbox, None).await
    }

    /// POIs in the box whose category contains `category`, ignoring case
    pub async fn list_in_box_with_category(
        &self,
        bbox: &BoundingBox,
        category: &str,
    ) -> Result<ListPoiResponse, QueryError> {
        self.list_in_box_filtered(bbox, Some(category)).await
    }

    async fn list_in_box_filtered(
        &self,
        bbox: &BoundingBox,
        category: Option<&str>,
    ) -> Result<ListPoiResponse, QueryError> {
        bbox.validate()?;
        let pois = self.repo.list_in_box(&bbox.normalized(), category).await?;
        Ok(ListPoiResponse { pois })
    }

    /// POIs within the route's buffer (metres) of segment AB
    pub async fn list_along_route(
        &self,
        route: &RouteBuffer,
    ) -> Result<ListPoiResponse, QueryError> {
        route.validate()?;
        let pois = self.repo.list_along_route(route, None).await?;
        Ok(ListPoiResponse { pois })
    }

    pub async fn list_along_route_with_category(
        &self,
        route: &RouteBuffer,
        category: &str,
    ) -> Result<ListPoiResponse, QueryError> {
        route.validate()?;
        let pois = self.repo.list_along_route(route, Some(category)).await?;
        Ok(ListPoiResponse { pois })
    }
}

/// Feed `rows` into a capacity-1 channel in chunks of `batch_size`
fn spawn_batches(rows: Vec<PoiRow>, batch_size: usize) -> CellBatches {
    let (tx, rx) = mpsc::channel(1);

    tokio::spawn(async move {
        let mut rows = rows.into_iter().peekable();
        let mut sent = 0usize;
        while rows.peek().is_some() {
            let batch = ListPoiResponse {
                pois: rows.by_ref().take(batch_size).collect(),
            };
            if tx.send(batch).await.is_err() {
                debug!(sent, "Batch consumer went away");
                return;
            }
            sent += 1;
        }
        debug!(batches = sent, "Cell query stream finished");
    });

    CellBatches { rx }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use h3o::CellIndex;

    use super::*;
    use crate::geo::Coordinate;
    use crate::storage::{InsertOutcome, MemoryPoiRepository, PoiRepository};

    /// Memory repository that counts every call reaching it
    #[derive(Default)]
    struct CountingRepository {
        inner: MemoryPoiRepository,
        calls: AtomicUsize,
    }

    impl CountingRepository {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl PoiRepository for CountingRepository {
        async fn insert(&self, row: &PoiRow) -> Result<InsertOutcome, StorageError> {
            self.hit();
            self.inner.insert(row).await
        }

        async fn list_by_cells(
            &self,
            cells: &[CellIndex],
            category: Option<&str>,
        ) -> Result<Vec<PoiRow>, StorageError> {
            self.hit();
            self.inner.list_by_cells(cells, category).await
        }

        async fn list_in_box(
            &self,
            bbox: &BoundingBox,
            category: Option<&str>,
        ) -> Result<Vec<PoiRow>, StorageError> {
            self.hit();
            self.inner.list_in_box(bbox, category).await
        }

        async fn list_along_route(
            &self,
            route: &RouteBuffer,
            category: Option<&str>,
        ) -> Result<Vec<PoiRow>, StorageError> {
            self.hit();
            self.inner.list_along_route(route, category).await
        }

        async fn count(&self) -> Result<usize, StorageError> {
            self.hit();
            self.inner.count().await
        }
    }

    fn counted() -> (Arc<CountingRepository>, GeoQueryService) {
        let repo = Arc::new(CountingRepository::default());
        let service = GeoQueryService::new(repo.clone());
        (repo, service)
    }

    fn rows(n: usize) -> Vec<PoiRow> {
        (0..n)
            .map(|i| PoiRow {
                place_id: format!("p{i}"),
                ..Default::default()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_batches_split_with_remainder() {
        let batches = spawn_batches(rows(301), BATCH_SIZE).collect_all().await;
        let sizes: Vec<usize> = batches.iter().map(ListPoiResponse::len).collect();
        assert_eq!(sizes, vec![150, 150, 1]);
        assert_eq!(batches[2].pois[0].place_id, "p300");
    }

    #[tokio::test]
    async fn test_exact_multiple_has_no_empty_tail() {
        let batches = spawn_batches(rows(300), BATCH_SIZE).collect_all().await;
        assert_eq!(batches.len(), 2);

        let none = spawn_batches(Vec::new(), BATCH_SIZE).collect_all().await;
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_fine_cells_before_storage() {
        let (repo, service) = counted();
        // Resolution 10
        let result = service
            .list_by_cells(&["8a2a1072b59ffff".to_string()])
            .await;
        assert!(matches!(
            result,
            Err(QueryError::Invalid(GeoError::ResolutionTooFine { .. }))
        ));

        let result = service
            .list_by_cells_with_category(&["not-a-cell".to_string()], "cafe")
            .await;
        assert!(matches!(
            result,
            Err(QueryError::Invalid(GeoError::InvalidCell { .. }))
        ));

        let result = service.list_by_cells(&[]).await;
        assert!(matches!(
            result,
            Err(QueryError::Invalid(GeoError::EmptyCellSet))
        ));

        assert_eq!(repo.calls(), 0);
    }

    #[tokio::test]
    async fn test_valid_cells_read_storage_once() {
        let (repo, service) = counted();
        let batches = service
            .list_by_cells(&["852a1073fffffff".to_string()])
            .await
            .unwrap();
        assert!(batches.collect_all().await.is_empty());
        assert_eq!(repo.calls(), 1);
    }

    #[tokio::test]
    async fn test_rejects_bad_geometry_before_storage() {
        let (repo, service) = counted();

        let bbox = BoundingBox::new(f64::NAN, 57.0, 12.0, 58.0);
        assert!(matches!(
            service.list_in_box(&bbox).await,
            Err(QueryError::Invalid(GeoError::InvalidBox { .. }))
        ));

        let route = RouteBuffer::new(Coordinate::new(57.0, 11.0), Coordinate::new(57.1, 11.1), -1.0);
        assert!(matches!(
            service.list_along_route(&route).await,
            Err(QueryError::Invalid(GeoError::InvalidBuffer { .. }))
        ));

        let route = RouteBuffer::new(Coordinate::new(91.0, 11.0), Coordinate::new(57.1, 11.1), 10.0);
        assert!(matches!(
            service.list_along_route_with_category(&route, "cafe").await,
            Err(QueryError::Invalid(GeoError::InvalidCoordinate { .. }))
        ));

        assert_eq!(repo.calls(), 0);
    }

    #[tokio::test]
    async fn test_inverted_box_matches_ordered_box() {
        let (repo, service) = counted();
        repo.insert(&PoiRow {
            place_id: "inside".to_string(),
            location_lat: 57.5,
            location_lng: 11.5,
            ..Default::default()
        })
        .await
        .unwrap();

        let ordered = service
            .list_in_box(&BoundingBox::new(11.0, 57.0, 12.0, 58.0))
            .await
            .unwrap();
        let inverted = service
            .list_in_box(&BoundingBox::new(12.0, 58.0, 11.0, 57.0))
            .await
            .unwrap();

        assert_eq!(ordered.len(), 1);
        assert_eq!(inverted.len(), 1);
        assert_eq!(inverted.pois[0].place_id, "inside");
    }
}
