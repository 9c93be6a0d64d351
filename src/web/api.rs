use crate::batch::{Batch, Priority};
use crate::dispatch::SharedStats;
use crate::ingest::{IngestError, IngestService, IngestionOverview, IngestionStatus};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

/// Largest id accepted by `/ingest`.
pub const MAX_ID: u64 = 1_000_000_007;

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestService>,
    pub dispatcher_stats: SharedStats,
    pub version: String,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(ingest: Arc<IngestService>, dispatcher_stats: SharedStats) -> Self {
        Self {
            ingest,
            dispatcher_stats,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

// API response types
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub ingestion_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DispatcherStatusResponse {
    pub version: String,
    pub uptime_seconds: u64,
    pub queue_depth: usize,
    pub in_flight: Option<Uuid>,
    pub batches_completed: u64,
    pub batches_abandoned: u64,
    pub items_processed: u64,
    pub last_dispatch_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub size: usize,
    pub batches: Vec<PendingBatch>,
}

#[derive(Debug, Serialize)]
pub struct PendingBatch {
    pub batch_id: Uuid,
    pub ingestion_id: Uuid,
    pub ids: Vec<u64>,
    pub priority: Priority,
    pub created_time: DateTime<Utc>,
}

impl From<Batch> for PendingBatch {
    fn from(batch: Batch) -> Self {
        Self {
            batch_id: batch.batch_id,
            ingestion_id: batch.ingestion_id,
            ids: batch.ids,
            priority: batch.priority,
            created_time: batch.created_time,
        }
    }
}

/// Validate an `/ingest` body. Checks the ids array, then the priority, then
/// each id's range.
pub fn parse_ingest_request(body: &Value) -> Result<(Vec<u64>, Priority), ApiError> {
    let raw_ids = body
        .get("ids")
        .and_then(Value::as_array)
        .filter(|ids| !ids.is_empty())
        .ok_or_else(|| ApiError::BadRequest("ids must be a non-empty array".to_string()))?;

    let priority = body
        .get("priority")
        .and_then(Value::as_str)
        .and_then(|p| p.parse::<Priority>().ok())
        .ok_or_else(|| {
            ApiError::BadRequest("priority must be HIGH, MEDIUM, or LOW".to_string())
        })?;

    let ids = raw_ids
        .iter()
        .map(parse_id)
        .collect::<Option<Vec<u64>>>()
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "All ids must be integers between 1 and {}",
                MAX_ID
            ))
        })?;

    Ok((ids, priority))
}

/// An id is a JSON integer in `[1, MAX_ID]`; `5.0` counts as an integer.
fn parse_id(value: &Value) -> Option<u64> {
    let id = match value.as_u64() {
        Some(id) => id,
        None => {
            let f = value.as_f64()?;
            if f.fract() != 0.0 || f < 1.0 || f > MAX_ID as f64 {
                return None;
            }
            f as u64
        }
    };
    (1..=MAX_ID).contains(&id).then_some(id)
}

/// POST /ingest
pub async fn ingest(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {}", e)))?;
    let (ids, priority) = parse_ingest_request(&body)?;

    let ingestion_id = state.ingest.submit(ids, priority).await.map_err(|e| match &e {
        IngestError::EmptyIds => ApiError::BadRequest(e.to_string()),
        IngestError::Storage(_) => {
            error!(error = %e, "Error in /ingest");
            ApiError::InternalError("Internal server error".to_string())
        }
    })?;

    Ok(Json(IngestResponse { ingestion_id }))
}

/// Ingestion ids are handed out in lowercase hyphenated form and only that
/// exact spelling identifies one. Braced, URN, simple and uppercase forms miss.
fn parse_ingestion_id(raw: &str) -> Option<Uuid> {
    let id = Uuid::try_parse(raw).ok()?;
    (id.hyphenated().to_string() == raw).then_some(id)
}

/// GET /status/:ingestion_id
pub async fn get_status(
    State(state): State<AppState>,
    Path(ingestion_id): Path<String>,
) -> Result<Json<IngestionStatus>, ApiError> {
    let not_found = || ApiError::NotFound("Ingestion not found".to_string());

    let ingestion_id = parse_ingestion_id(&ingestion_id).ok_or_else(not_found)?;

    let status = state.ingest.status(ingestion_id).await.map_err(|e| {
        error!(error = %e, "Error in /status");
        ApiError::InternalError("Internal server error".to_string())
    })?;

    status.map(Json).ok_or_else(not_found)
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
    })
}

/// GET /dispatcher/status
pub async fn dispatcher_status(State(state): State<AppState>) -> Json<DispatcherStatusResponse> {
    let stats = state.dispatcher_stats.read().await.clone();
    let queue_depth = state.ingest.queue_depth().await;

    Json(DispatcherStatusResponse {
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        queue_depth,
        in_flight: stats.in_flight,
        batches_completed: stats.batches_completed,
        batches_abandoned: stats.batches_abandoned,
        items_processed: stats.items_processed,
        last_dispatch_end: stats.last_dispatch_end,
    })
}

/// GET /queue
pub async fn list_queue(State(state): State<AppState>) -> Json<QueueResponse> {
    let batches: Vec<PendingBatch> = state
        .ingest
        .pending()
        .await
        .into_iter()
        .map(PendingBatch::from)
        .collect();

    Json(QueueResponse {
        size: batches.len(),
        batches,
    })
}

/// GET /ingestions
pub async fn list_ingestions(
    State(state): State<AppState>,
) -> Result<Json<Vec<IngestionOverview>>, ApiError> {
    let overview = state.ingest.list().await.map_err(|e| {
        error!(error = %e, "Error in /ingestions");
        ApiError::InternalError("Internal server error".to_string())
    })?;
    Ok(Json(overview))
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
