//! Search and ingestion façade
//!
//! Each search submits a task run, waits for its dataset and ingests it under
//! the matching dataset kind.
//!
//! ```text
//! SearchRequest ──► payload ──► ApifyClient ──► JobHandle ──bytes──► IngestionPipeline
//!                                                   ▲
//!                                          cancel ──┘
//! ```

pub mod converter;

use std::future::Future;

use tracing::{info, instrument};

use crate::apify::{ApifyClient, JobHandle};
use crate::error::Result;
use crate::ingest::{DatasetKind, IngestStats, IngestionPipeline};
use crate::models::{InputPayloadMaps, ScraperInputPayloadMaps, TripAdvisorInput};

pub use converter::{
    AllPlacesNoSearchAction, CustomGeolocation, GeoPoint, Polygon, ScraperRequest, SearchRequest,
    TripadvisorRequest,
};

/// Runs searches against the remote tasks and persists their results
#[derive(Clone)]
pub struct MapsService {
    client: ApifyClient,
    pipeline: IngestionPipeline,
    backoff: bool,
}

impl MapsService {
    pub fn new(client: ApifyClient, pipeline: IngestionPipeline) -> Self {
        Self {
            client,
            pipeline,
            backoff: true,
        }
    }

    /// Poll at a constant interval instead of doubling it
    pub fn without_backoff(mut self) -> Self {
        self.backoff = false;
        self
    }

    pub fn client(&self) -> &ApifyClient {
        &self.client
    }

    pub fn pipeline(&self) -> &IngestionPipeline {
        &self.pipeline
    }

    /// Fetch the dataset of a finished run and ingest it
    ///
    /// # Errors
    ///
    /// Returns the job error if the dataset cannot be fetched, or the parse
    /// error if it is not a JSON array of records.
    #[instrument(skip(self))]
    pub async fn ingest_dataset(&self, dataset_id: &str, kind: DatasetKind) -> Result<IngestStats> {
        let data = self.client.fetch_dataset(dataset_id).await?;
        let stats = self.pipeline.ingest_bytes(&data, Some(kind)).await?;
        Ok(stats)
    }

    /// Search with the Google Maps extractor and ingest the results
    ///
    /// # Arguments
    ///
    /// * `request` - Search parameters; `number_of_results` caps the dataset
    /// * `cancel` - Completes when the caller gives up waiting
    pub async fn search_extractor<F>(&self, request: &SearchRequest, cancel: F) -> Result<IngestStats>
    where
        F: Future<Output = ()>,
    {
        let payload = InputPayloadMaps::from(request);
        let handle = self
            .client
            .extract_pois(&payload, request.number_of_results, self.backoff)
            .await?;
        self.finish(handle, DatasetKind::GoogleMapsExtractor, cancel).await
    }

    /// Search with the Google Maps scraper and ingest the results
    pub async fn search_scraper<F>(&self, request: &ScraperRequest, cancel: F) -> Result<IngestStats>
    where
        F: Future<Output = ()>,
    {
        let payload = ScraperInputPayloadMaps::from(request);
        let handle = self.client.scrape_pois(&payload, self.backoff).await?;
        self.finish(handle, DatasetKind::GoogleMapsScraper, cancel).await
    }

    /// Search TripAdvisor and ingest hotels, restaurants and attractions
    pub async fn search_tripadvisor<F>(
        &self,
        request: &TripadvisorRequest,
        cancel: F,
    ) -> Result<IngestStats>
    where
        F: Future<Output = ()>,
    {
        let payload = TripAdvisorInput::from(request);
        let handle = self
            .client
            .tripadvisor_pois(&payload, request.number_of_results, self.backoff)
            .await?;
        self.finish(handle, DatasetKind::Tripadvisor, cancel).await
    }

    async fn finish<F>(&self, handle: JobHandle, kind: DatasetKind, cancel: F) -> Result<IngestStats>
    where
        F: Future<Output = ()>,
    {
        let run_id = handle.run_id().to_string();
        let data = handle.wait_until(cancel).await?;
        info!(run_id, bytes = data.len(), dataset = %kind, "Run finished, ingesting dataset");
        let stats = self.pipeline.ingest_bytes(&data, Some(kind)).await?;
        Ok(stats)
    }
}
