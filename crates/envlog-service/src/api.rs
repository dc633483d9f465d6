//! REST API endpoints for the envlog service.
//!
//! # Concurrency
//!
//! `state.store` is the only lock. Read handlers hold it only while copying
//! readings out of the store and compute their view after releasing it;
//! `POST /data` holds it for a single append.
//!
//! ## Error Handling
//!
//! Endpoints return structured JSON errors via [`AppError`]. Store and
//! export failures return HTTP 500; malformed input returns 400.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use envlog_core::{
    BucketGrid, ExportError, ExportFormat, FilteredRow, GridBuilder, HistoryFilter,
    export_filename, export_rows, render,
};
use envlog_types::{DEFAULT_ZONE, Reading};

use crate::middleware::require_api_key;
use crate::state::AppState;

/// Plain-text response for `GET /`.
pub const BANNER: &str = "envlog API OK. Use /data, /history, /grid, /history/filtered and /export";

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/data", get(get_latest).post(post_reading))
        .route("/history", get(get_history))
        .route("/history/filtered", get(get_filtered))
        .route("/grid", get(get_grid))
        .route("/export", get(get_export))
}

/// Create the complete application: routes, ingest authentication, request
/// tracing and permissive CORS.
pub fn app(state: Arc<AppState>) -> Router {
    router()
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            require_api_key,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn home() -> &'static str {
    BANNER
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Number of stored readings.
    pub readings: u64,
    /// Storage backend in use.
    pub backend: String,
    /// Time zone used for dates.
    pub timezone: &'static str,
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, AppError> {
    let (readings, backend) = {
        let store = state.store.lock().await;
        (store.count()?, store.backend().to_string())
    };

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
        readings,
        backend,
        timezone: state.resolver.name(),
    }))
}

/// Latest reading, or 404 with `{"status": "no_data"}`.
async fn get_latest(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let latest = state.store.lock().await.latest()?;
    Ok(match latest {
        Some(reading) => Json(reading).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "status": "no_data" })),
        )
            .into_response(),
    })
}

/// Ingest a reading.
///
/// The body is parsed as JSON regardless of `Content-Type`. Missing fields
/// are filled in before storing:
///
/// - `zone` defaults to [`DEFAULT_ZONE`].
/// - A missing or blank `timestamp` becomes the receipt time in UTC,
///   `YYYY-MM-DD HH:MM:SS`.
/// - `ts_server` is always set to the receipt time in UTC with microseconds.
async fn post_reading(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(AppError::BadRequest(
            "Reading must be a JSON object".to_string(),
        ));
    }
    let mut reading: Reading = serde_json::from_value(value)
        .map_err(|e| AppError::BadRequest(format!("Invalid reading: {}", e)))?;

    let now = state.clock.now();
    if reading.zone.as_deref().is_none_or(|z| z.is_empty()) {
        reading.zone = Some(DEFAULT_ZONE.to_string());
    }
    if reading.lacks_device_timestamp() {
        reading.device_timestamp = Some(now.format("%Y-%m-%d %H:%M:%S").to_string());
    }
    reading.server_timestamp = Some(now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string());

    state.store.lock().await.append(&reading)?;
    info!("Stored reading for zone {}", reading.zone());

    Ok(Json(serde_json::json!({ "status": "ok" })))
}

/// Query parameters for `GET /history`.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Number of most recent readings to return.
    pub count: Option<String>,
}

/// The most recent stored readings, oldest first, exactly as stored.
async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Reading>>, AppError> {
    let count = parse_count(query.count.as_deref())?
        .unwrap_or(state.config.query.history_default_count);
    Ok(Json(state.recent(Some(count)).await?))
}

/// Query parameters for `GET /grid`.
#[derive(Debug, Default, Deserialize)]
pub struct GridQuery {
    pub zone: Option<String>,
}

/// Five-day summary grid for a zone.
async fn get_grid(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GridQuery>,
) -> Result<Json<BucketGrid>, AppError> {
    let zone = zone_or_default(query.zone.as_deref());
    let readings = state
        .recent(Some(state.config.query.grid_scan_limit))
        .await?;

    let grid = GridBuilder::new(state.resolver).build(&readings, zone, state.clock.now());
    Ok(Json(grid))
}

/// Query parameters for `GET /history/filtered`.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub zone: Option<String>,
    /// `YYYY-MM` prefix.
    pub month: Option<String>,
    /// `YYYY-MM-DD` prefix.
    pub date: Option<String>,
    /// `HH:MM`.
    pub hour: Option<String>,
    pub count: Option<String>,
}

/// Month/date/hour filtered rows for a zone.
async fn get_filtered(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Vec<FilteredRow>>, AppError> {
    let limits = &state.config.query;
    let count = parse_count(query.count.as_deref())?
        .unwrap_or(limits.history_default_count)
        .min(limits.filter_scan_limit);

    let filter = HistoryFilter::new(zone_or_default(query.zone.as_deref()))
        .month(query.month.unwrap_or_default())
        .date(query.date.unwrap_or_default())
        .hour(query.hour.unwrap_or_default())
        .count(count);

    let readings = state.recent(Some(limits.filter_scan_limit)).await?;
    Ok(Json(filter.apply(&readings)))
}

/// Query parameters for `GET /export`.
#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub zone: Option<String>,
    /// `YYYY-MM` prefix.
    pub month: Option<String>,
    /// `csv` (default) or `xlsx`.
    pub format: Option<String>,
}

/// Download a zone's readings as CSV or XLSX.
async fn get_export(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let format = match query.format.as_deref().map(str::trim) {
        None | Some("") => ExportFormat::default(),
        Some(raw) => raw.parse()?,
    };
    let zone = zone_or_default(query.zone.as_deref());
    let month = query.month.as_deref();

    let readings = state.recent(None).await?;
    let rows = export_rows(&readings, zone, month);
    let bytes = render(&rows, format, month)?;
    let filename = export_filename(zone, month, format);

    debug!("Serving export {} ({} rows)", filename, rows.len());

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Zone query parameter, falling back to [`DEFAULT_ZONE`] when absent or blank.
fn zone_or_default(zone: Option<&str>) -> &str {
    zone.map(str::trim)
        .filter(|z| !z.is_empty())
        .unwrap_or(DEFAULT_ZONE)
}

/// Parse an optional `count` parameter. Blank is treated as absent.
fn parse_count(raw: Option<&str>) -> Result<Option<usize>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(|_| {
            AppError::BadRequest(format!("Invalid count '{}': expected a non-negative integer", s))
        }),
    }
}

/// API error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Forbidden(String),
    Store(envlog_store::Error),
    Export(ExportError),
}

impl From<envlog_store::Error> for AppError {
    fn from(e: envlog_store::Error) -> Self {
        AppError::Store(e)
    }
}

impl From<ExportError> for AppError {
    fn from(e: ExportError) -> Self {
        match e {
            ExportError::UnknownFormat(format) => AppError::BadRequest(format!(
                "Unknown export format '{}': expected csv or xlsx",
                format
            )),
            other => AppError::Export(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            AppError::Export(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}
