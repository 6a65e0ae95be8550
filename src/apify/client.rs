//! HTTP client for the remote scrape task API
//!
//! Submitting a task returns a [`JobHandle`] right away. A spawned task then
//! polls the run with a per-call [`Backoff`] and, once the run succeeds,
//! fetches its dataset and hands the raw bytes back through the handle.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{header::CONTENT_TYPE, Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, error, info, instrument};
use url::Url;

use super::backoff::{Backoff, INITIAL_INTERVAL};
use super::error::JobError;
use super::job::{JobHandle, RunStatus, ScrapeJob};
use super::models::{RunEnvelope, RunInfo};
use crate::models::{InputPayloadMaps, ScraperInputPayloadMaps, TripAdvisorInput};

/// Public API root of the provider
pub const DEFAULT_BASE_URL: &str = "https://api.apify.com/v2";

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Configuration
// ============================================================================

/// Connection settings for [`ApifyClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, without trailing slash
    pub base_url: String,
    /// Bearer token
    pub api_key: String,
    /// Task running the Google Maps extractor (also used for TripAdvisor)
    pub extractor_task_id: String,
    /// Task running the Google Maps scraper
    pub scraper_task_id: String,
    pub request_timeout: Duration,
    /// First poll interval; doubled per poll when backoff is enabled
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            extractor_task_id: String::new(),
            scraper_task_id: String::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_interval: INITIAL_INTERVAL,
        }
    }
}

impl ClientConfig {
    pub fn new(
        api_key: impl Into<String>,
        extractor_task_id: impl Into<String>,
        scraper_task_id: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            extractor_task_id: extractor_task_id.into(),
            scraper_task_id: scraper_task_id.into(),
            ..Default::default()
        }
    }

    /// Point the client at another API root (mock servers in tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

// ============================================================================
// Client
// ============================================================================

/// Remote job client
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ApifyClient {
    http: Client,
    config: ClientConfig,
}

impl ApifyClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns `JobError::Http` if the HTTP client cannot be created, or
    /// `JobError::InvalidUrl` if the base URL does not parse.
    pub fn new(config: ClientConfig) -> Result<Self, JobError> {
        Url::parse(&config.base_url)?;

        let http = Client::builder()
            .timeout(config.request_timeout)
            .gzip(true)
            .build()?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run the Google Maps extractor task
    ///
    /// # Arguments
    ///
    /// * `payload` - Extractor input
    /// * `max_items` - Cap on dataset items, sent as `maxItems`
    /// * `backoff` - Whether the poll interval doubles between polls
    pub async fn extract_pois(
        &self,
        payload: &InputPayloadMaps,
        max_items: u32,
        backoff: bool,
    ) -> Result<JobHandle, JobError> {
        self.submit(&self.config.extractor_task_id, payload, Some(max_items), backoff)
            .await
    }

    /// Run the Google Maps scraper task, without an item cap
    pub async fn scrape_pois(
        &self,
        payload: &ScraperInputPayloadMaps,
        backoff: bool,
    ) -> Result<JobHandle, JobError> {
        self.submit(&self.config.scraper_task_id, payload, None, backoff)
            .await
    }

    /// Run a TripAdvisor search
    ///
    /// The TripAdvisor input is submitted to the extractor task.
    pub async fn tripadvisor_pois(
        &self,
        payload: &TripAdvisorInput,
        max_items: u32,
        backoff: bool,
    ) -> Result<JobHandle, JobError> {
        self.submit(&self.config.extractor_task_id, payload, Some(max_items), backoff)
            .await
    }

    /// Submit a task run and start polling it in the background
    ///
    /// # Errors
    ///
    /// Fails if the request cannot be sent, the provider answers with a
    /// status other than 200/201, or the answer carries no run id. Errors
    /// after submission are delivered through the returned handle.
    #[instrument(skip(self, payload))]
    pub async fn submit<P>(
        &self,
        task_id: &str,
        payload: &P,
        max_items: Option<u32>,
        backoff: bool,
    ) -> Result<JobHandle, JobError>
    where
        P: Serialize + ?Sized,
    {
        let mut url = self.endpoint(&["actor-tasks", task_id, "runs"])?;
        if let Some(max_items) = max_items {
            url.query_pairs_mut()
                .append_pair("maxItems", &max_items.to_string());
        }

        let response = self
            .request(Method::POST, url)
            .json(payload)
            .send()
            .await?;
        let body = read_body(response).await?;
        let run: RunEnvelope = serde_json::from_slice(&body)?;

        info!(
            run_id = %run.data.id,
            status = %run.data.status,
            max_items = ?max_items,
            "Submitted scrape run"
        );

        let status = run.data.run_status();
        let job = ScrapeJob::new(
            run.data.id,
            status,
            Backoff::new(self.config.poll_interval, backoff),
        );
        Ok(self.spawn_poll(job))
    }

    /// Fetch the current state of a run
    pub async fn run_status(&self, run_id: &str) -> Result<RunInfo, JobError> {
        let url = self.endpoint(&["actor-runs", run_id])?;
        let response = self.request(Method::GET, url).send().await?;
        let body = read_body(response).await?;
        let run: RunEnvelope = serde_json::from_slice(&body)?;
        Ok(run.data)
    }

    /// Fetch the dataset items of a run as raw JSON bytes
    ///
    /// Used both at the end of polling and for datasets announced out of band.
    pub async fn fetch_dataset(&self, run_id: &str) -> Result<Bytes, JobError> {
        let url = self.endpoint(&["actor-runs", run_id, "dataset", "items"])?;
        let response = self.request(Method::GET, url).send().await?;
        let body = read_body(response).await?;
        debug!(run_id, bytes = body.len(), "Fetched dataset");
        Ok(body)
    }

    fn spawn_poll(&self, job: ScrapeJob) -> JobHandle {
        let (tx, rx) = oneshot::channel();
        let handle = JobHandle::new(job.run_id().to_string(), rx);
        let client = self.clone();
        tokio::spawn(client.poll_task(job, tx));
        handle
    }

    async fn poll_task(self, mut job: ScrapeJob, mut tx: oneshot::Sender<Result<Bytes, JobError>>) {
        let run_id = job.run_id().to_string();
        let result = tokio::select! {
            result = self.poll_until_done(&mut job) => result,
            () = tx.closed() => {
                debug!(run_id, "Caller stopped waiting; leaving remote run alone");
                return;
            }
        };

        if let Err(e) = &result {
            error!(run_id, status = %job.status(), error = %e, "Scrape run did not complete");
        }
        // Receiver may have gone away between the select and now
        let _ = tx.send(result);
    }

    /// Poll until the run is terminal; transport and decode failures end the
    /// loop at once
    async fn poll_until_done(&self, job: &mut ScrapeJob) -> Result<Bytes, JobError> {
        loop {
            let info = self.run_status(job.run_id()).await?;
            let status = job.advance(info.run_status())?;

            match status {
                RunStatus::Succeeded => {
                    info!(run_id = job.run_id(), "Scrape run succeeded");
                    return self.fetch_dataset(&info.id).await;
                }
                RunStatus::Queued | RunStatus::Running => {
                    let delay = job.backoff_mut().next_delay();
                    debug!(
                        run_id = job.run_id(),
                        status = %status,
                        remote_status = %info.status,
                        backoff_ms = delay.as_millis() as u64,
                        "Run not finished"
                    );
                    tokio::time::sleep(delay).await;
                }
                RunStatus::Failed | RunStatus::Aborted | RunStatus::TimedOut => {
                    return Err(job.terminal_error().unwrap_or(JobError::RunFailed {
                        run_id: job.run_id().to_string(),
                    }));
                }
            }
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, JobError> {
        let mut url = Url::parse(self.config.base_url.trim_end_matches('/'))?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.config.api_key)
            .header(CONTENT_TYPE, "application/json")
    }
}

/// Read a response body, turning anything but 200/201 into a status error
async fn read_body(response: Response) -> Result<Bytes, JobError> {
    let status = response.status();
    let body = response.bytes().await?;

    if status != StatusCode::OK && status != StatusCode::CREATED {
        return Err(JobError::Status {
            status: status.as_u16(),
            body: serde_json::from_slice(&body).ok(),
        });
    }
    Ok(body)
}
