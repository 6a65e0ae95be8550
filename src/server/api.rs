//! REST API handlers
//!
//! Search endpoints block until their run finishes and the dataset is
//! ingested; a client that disconnects stops the wait. The cell endpoint
//! streams one JSON line per batch.

use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::apify::JobError;
use crate::error::Error;
use crate::geo::{BoundingBox, Coordinate, RouteBuffer};
use crate::ingest::{DatasetKind, IngestStats};
use crate::maps::{ScraperRequest, SearchRequest, TripadvisorRequest};
use crate::query::{ListPoiResponse, QueryError};

use super::AppState;

// ============================================================================
// API Response Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Ingest an already finished run
#[derive(Debug, Deserialize)]
pub struct IngestDatasetRequest {
    pub dataset_id: String,
    pub kind: DatasetKind,
}

#[derive(Debug, Deserialize)]
pub struct CellsRequest {
    pub cells: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BoxParams {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RouteParams {
    pub a_lat: f64,
    pub a_lng: f64,
    pub b_lat: f64,
    pub b_lng: f64,
    /// Buffer in metres
    pub buffer_m: f64,
    pub category: Option<String>,
}

fn category_filter(category: Option<String>) -> Option<String> {
    category.filter(|c| !c.trim().is_empty())
}

// ============================================================================
// Error Mapping
// ============================================================================

/// Crate error rendered as an HTTP response
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        Self(Error::Query(err))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Query(QueryError::Invalid(_)) | Error::Geo(_) | Error::Config(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::Job(JobError::Cancelled { .. }) | Error::Job(JobError::TaskDropped { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Error::Job(_) | Error::Parse(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, "Request rejected");
        }
        (status, Json(ApiResponse::<()>::error(self.0.to_string()))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        // Search and ingestion
        .route("/api/maps/datasets", post(ingest_dataset))
        .route("/api/maps/search", post(search_extractor))
        .route("/api/maps/scrape", post(search_scraper))
        .route("/api/tripadvisor/search", post(search_tripadvisor))
        // Geographic reads
        .route("/api/pois/cells", post(list_by_cells))
        .route("/api/pois/box", get(list_in_box))
        .route("/api/pois/route", get(list_along_route))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    }))
}

// ============================================================================
// Search Handlers
// ============================================================================

async fn ingest_dataset(
    State(state): State<AppState>,
    Json(request): Json<IngestDatasetRequest>,
) -> ApiResult<IngestStats> {
    let stats = state
        .maps
        .ingest_dataset(&request.dataset_id, request.kind)
        .await?;
    Ok(Json(ApiResponse::success(stats)))
}

// Dropping the handler future on disconnect drops the job handle, which
// stops the poll task; nothing else cancels the wait.
async fn search_extractor(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<IngestStats> {
    let stats = state
        .maps
        .search_extractor(&request, std::future::pending())
        .await?;
    Ok(Json(ApiResponse::success(stats)))
}

async fn search_scraper(
    State(state): State<AppState>,
    Json(request): Json<ScraperRequest>,
) -> ApiResult<IngestStats> {
    let stats = state
        .maps
        .search_scraper(&request, std::future::pending())
        .await?;
    Ok(Json(ApiResponse::success(stats)))
}

async fn search_tripadvisor(
    State(state): State<AppState>,
    Json(request): Json<TripadvisorRequest>,
) -> ApiResult<IngestStats> {
    let stats = state
        .maps
        .search_tripadvisor(&request, std::future::pending())
        .await?;
    Ok(Json(ApiResponse::success(stats)))
}

// ============================================================================
// Query Handlers
// ============================================================================

/// Newline-delimited JSON, one `ListPoiResponse` per line
async fn list_by_cells(
    State(state): State<AppState>,
    Json(request): Json<CellsRequest>,
) -> Result<Response, ApiError> {
    let batches = match category_filter(request.category) {
        Some(category) => {
            state
                .pois
                .list_by_cells_with_category(&request.cells, &category)
                .await?
        }
        None => state.pois.list_by_cells(&request.cells).await?,
    };

    let lines = batches.map(|batch| {
        serde_json::to_vec(&batch).map(|mut line| {
            line.push(b'\n');
            Bytes::from(line)
        })
    });

    Ok((
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response())
}

async fn list_in_box(
    State(state): State<AppState>,
    Query(params): Query<BoxParams>,
) -> ApiResult<ListPoiResponse> {
    let bbox = BoundingBox::new(params.min_x, params.min_y, params.max_x, params.max_y);
    let response = match category_filter(params.category) {
        Some(category) => state.pois.list_in_box_with_category(&bbox, &category).await?,
        None => state.pois.list_in_box(&bbox).await?,
    };
    Ok(Json(ApiResponse::success(response)))
}

async fn list_along_route(
    State(state): State<AppState>,
    Query(params): Query<RouteParams>,
) -> ApiResult<ListPoiResponse> {
    let route = RouteBuffer::new(
        Coordinate::new(params.a_lat, params.a_lng),
        Coordinate::new(params.b_lat, params.b_lng),
        params.buffer_m,
    );
    let response = match category_filter(params.category) {
        Some(category) => {
            state
                .pois
                .list_along_route_with_category(&route, &category)
                .await?
        }
        None => state.pois.list_along_route(&route).await?,
    };
    Ok(Json(ApiResponse::success(response)))
}
