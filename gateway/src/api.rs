//! HTTP API for the attendance gateway.
//!
//! Thin axum handlers over the InProcess service router. Handlers only
//! translate between the wire shapes and the attendance service; all
//! business rules live in `attendance-service`.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use attendance_service::punch::PunchError;
use attendance_service::service::{MetricsQuery, ServiceError, TimesheetQuery};
use attendance_service::Coordinate;
use error::ErrorResponse;

use crate::router::ServiceRouter;

/// Shared application state.
pub type AppState = Arc<ServiceRouter>;

/// Clock event request body.
#[derive(Debug, Deserialize)]
pub struct TrackingRequest {
    pub employee_id: String,
    pub lat: f64,
    pub long: f64,
    /// Punch timestamp; defaults to the server clock when omitted.
    pub timestamp: Option<DateTime<Utc>>,
}

impl TrackingRequest {
    fn coordinate(&self) -> Coordinate {
        Coordinate {
            lat: self.lat,
            long: self.long,
        }
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp.unwrap_or_else(Utc::now)
    }
}

/// Service error wrapper carrying the HTTP mapping.
pub struct GatewayError(ServiceError);

impl From<ServiceError> for GatewayError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            ServiceError::NoSchedule => (StatusCode::FORBIDDEN, "NO_SCHEDULE"),
            ServiceError::NotScheduledToday => (StatusCode::FORBIDDEN, "NOT_SCHEDULED_TODAY"),
            ServiceError::Punch(PunchError::AlreadyTracking) => {
                (StatusCode::FORBIDDEN, "ALREADY_TRACKING")
            }
            ServiceError::Punch(PunchError::NoOpenPunch) => {
                (StatusCode::FORBIDDEN, "NO_OPEN_PUNCH")
            }
            ServiceError::OutOfRange(_) => (StatusCode::FORBIDDEN, "OUT_OF_RANGE"),
            ServiceError::EmployeeNotFound(_) => (StatusCode::NOT_FOUND, "EMPLOYEE_NOT_FOUND"),
            ServiceError::LocationNotFound(_) => (StatusCode::NOT_FOUND, "LOCATION_NOT_FOUND"),
            ServiceError::InvalidRange => (StatusCode::BAD_REQUEST, "INVALID_RANGE"),
            ServiceError::Conflict => (StatusCode::CONFLICT, "PUNCH_CONFLICT"),
            ServiceError::ReportTimeout => (StatusCode::GATEWAY_TIMEOUT, "REPORT_TIMEOUT"),
            ServiceError::Repository(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = ErrorResponse::new(code, self.0.to_string());
        (status, Json(body)).into_response()
    }
}

/// Build the gateway router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/tracking/start", post(start_tracking))
        .route("/api/tracking/stop", post(stop_tracking))
        .route("/api/tracking/current/:employee_id", get(current_tracking))
        .route("/api/timesheet", get(get_timesheet))
        .route("/api/timesheet/export", get(export_timesheet))
        .route("/api/dashboard/metrics", get(dashboard_metrics))
        .route("/api/dashboard/snapshot", get(dashboard_snapshot))
        .with_state(state)
}

/// Handler for GET /health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Handler for POST /api/tracking/start
async fn start_tracking(
    State(state): State<AppState>,
    Json(request): Json<TrackingRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let status = state
        .attendance()
        .clock_in(&request.employee_id, request.coordinate(), request.timestamp())
        .await?;
    Ok(Json(status))
}

/// Handler for POST /api/tracking/stop
async fn stop_tracking(
    State(state): State<AppState>,
    Json(request): Json<TrackingRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let status = state
        .attendance()
        .clock_out(&request.employee_id, request.coordinate(), request.timestamp())
        .await?;
    Ok(Json(status))
}

/// Handler for GET /api/tracking/current/{employee_id}
async fn current_tracking(
    State(state): State<AppState>,
    Path(employee_id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let status = state.attendance().current_mode(&employee_id).await?;
    Ok(Json(status))
}

/// Handler for GET /api/timesheet
async fn get_timesheet(
    State(state): State<AppState>,
    Query(query): Query<TimesheetQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let response = state.attendance().timesheet(&query).await?;
    Ok(Json(response))
}

/// Handler for GET /api/timesheet/export
async fn export_timesheet(
    State(state): State<AppState>,
    Query(query): Query<MetricsQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let rows = state.attendance().export_rows(&query).await?;
    Ok(Json(rows))
}

/// Handler for GET /api/dashboard/metrics
async fn dashboard_metrics(
    State(state): State<AppState>,
    Query(query): Query<MetricsQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let metrics = state.attendance().dashboard_metrics(&query).await?;
    Ok(Json(metrics))
}

/// Handler for GET /api/dashboard/snapshot
async fn dashboard_snapshot(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, GatewayError> {
    let entries = state.attendance().snapshot().await?;
    Ok(Json(entries))
}
