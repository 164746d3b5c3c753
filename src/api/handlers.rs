//! v2 API handlers for health reports and profiles.

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::envelope::{ApiErrorResponse, ApiResponse, ErrorCode};
use crate::config::defaults::MAX_LIST_LIMIT;
use crate::report::{EngineError, ReportAssembler, ReportRequest};
use crate::storage::PersistenceError;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub assembler: ReportAssembler,
}

impl AppState {
    pub const fn new(assembler: ReportAssembler) -> Self {
        Self { assembler }
    }
}

const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub equipment_id: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RemarksBody {
    pub remarks: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub backend: &'static str,
    pub reports: usize,
}

fn engine_error_code(err: &EngineError) -> ErrorCode {
    match err {
        EngineError::InvalidRequest(_) => ErrorCode::BadRequest,
        EngineError::NotFound(_) => ErrorCode::NotFound,
        EngineError::Timeout { .. } => ErrorCode::Timeout,
        EngineError::Store(_) => ErrorCode::Unavailable,
        EngineError::Persistence(PersistenceError::Duplicate { .. }) => ErrorCode::Conflict,
        EngineError::Persistence(_) | EngineError::Scoring(_) => ErrorCode::Internal,
    }
}

fn parse_id(raw: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(raw)
        .map_err(|_| ApiErrorResponse::new(ErrorCode::BadRequest, format!("'{raw}' is not a valid report id")))
}

/// POST /api/v2/reports
pub async fn create_report(State(state): State<AppState>, Json(request): Json<ReportRequest>) -> Response {
    match state.assembler.generate_report(request).await {
        Ok(report) => ApiResponse::created(report),
        Err(e) => {
            let code = engine_error_code(&e);
            if matches!(code, ErrorCode::Internal | ErrorCode::Unavailable | ErrorCode::Timeout) {
                error!(error = %e, "Report generation failed");
            } else {
                info!(error = %e, "Report request rejected");
            }
            ApiErrorResponse::new(code, e.to_string())
        }
    }
}

/// GET /api/v2/reports?equipment_id=&limit=
pub async fn list_reports(State(state): State<AppState>, Query(params): Query<ListParams>) -> Response {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);
    match state
        .assembler
        .repository()
        .list(params.equipment_id.as_deref(), limit)
    {
        Ok(reports) => ApiResponse::ok(reports),
        Err(e) => {
            error!(error = %e, "Failed to list reports");
            ApiErrorResponse::new(ErrorCode::Internal, e.to_string())
        }
    }
}

/// GET /api/v2/reports/:id
pub async fn get_report(State(state): State<AppState>, Path(raw_id): Path<String>) -> Response {
    let id = match parse_id(&raw_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.assembler.repository().get(id) {
        Ok(Some(report)) => ApiResponse::ok(report),
        Ok(None) => ApiErrorResponse::new(ErrorCode::NotFound, format!("report {id} not found")),
        Err(e) => {
            error!(error = %e, "Failed to load report");
            ApiErrorResponse::new(ErrorCode::Internal, e.to_string())
        }
    }
}

/// PATCH /api/v2/reports/:id/remarks
pub async fn annotate_report(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Json(body): Json<RemarksBody>,
) -> Response {
    let id = match parse_id(&raw_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.assembler.repository().annotate(id, body.remarks) {
        Ok(report) => ApiResponse::ok(report),
        Err(PersistenceError::NotFound) => ApiErrorResponse::new(ErrorCode::NotFound, format!("report {id} not found")),
        Err(e) => {
            warn!(error = %e, "Failed to annotate report");
            ApiErrorResponse::new(ErrorCode::Internal, e.to_string())
        }
    }
}

/// GET /api/v2/profiles
pub async fn list_profiles(State(state): State<AppState>) -> Response {
    ApiResponse::ok(state.assembler.engine().profiles().entries())
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Response {
    let repository = state.assembler.repository();
    match repository.count() {
        Ok(reports) => ApiResponse::ok(HealthStatus {
            status: "ok",
            backend: repository.backend_name(),
            reports,
        }),
        Err(e) => ApiErrorResponse::new(ErrorCode::Unavailable, e.to_string()),
    }
}
