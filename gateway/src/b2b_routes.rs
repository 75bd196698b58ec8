//! Partner endpoints gated by `x-api-key`

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use risk_engine::regional::Region;
use risk_engine::report::DetailedReport;
use risk_engine::statistics::{RiskStatistics, NATIONAL_REGION};
use risk_engine::RiskError;
use risk_sources::{AnalysisOutcome, AnalysisRequest};
use serde::Deserialize;
use tracing::{info, warn};

use crate::routes::{api_error, query_error, ApiError, ApiResult};
use crate::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    pub region: Option<String>,
}

pub fn b2b_router() -> Router<AppState> {
    Router::new()
        .route("/batch-analyze", post(batch_analyze))
        .route("/premium-analyze", post(premium_analyze))
        .route("/risk-statistics", get(risk_statistics))
}

fn require_api_key(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "API key required"))?;

    if state.ctx.config().b2b_api_keys.iter().any(|k| k == key) {
        Ok(())
    } else {
        warn!("Rejected partner request with unknown API key");
        Err(api_error(StatusCode::UNAUTHORIZED, "Invalid API key"))
    }
}

fn analysis_error(e: RiskError) -> ApiError {
    let status = match &e {
        RiskError::BatchTooLarge { .. } => StatusCode::BAD_REQUEST,
        RiskError::GeocodeFailed(_) => StatusCode::NOT_FOUND,
        RiskError::AggregationInputMissing | RiskError::UpstreamUnavailable { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        RiskError::Io(_) | RiskError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, e.to_string())
}

pub async fn batch_analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(requests): Json<Vec<AnalysisRequest>>,
) -> ApiResult<Vec<AnalysisOutcome>> {
    require_api_key(&state, &headers)?;
    info!("Partner batch of {} addresses", requests.len());
    state
        .ctx
        .pipeline()
        .analyze_batch(&requests)
        .await
        .map(Json)
        .map_err(analysis_error)
}

pub async fn premium_analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AnalysisRequest>,
) -> ApiResult<DetailedReport> {
    require_api_key(&state, &headers)?;
    state
        .ctx
        .pipeline()
        .try_analyze_detailed(&request)
        .await
        .map(Json)
        .map_err(analysis_error)
}

pub async fn risk_statistics(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<StatisticsQuery>, QueryRejection>,
) -> ApiResult<RiskStatistics> {
    require_api_key(&state, &headers)?;
    let Query(query) = query.map_err(query_error)?;

    let region = match query.region.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(name) if name.eq_ignore_ascii_case(NATIONAL_REGION) => None,
        Some(name) => Some(Region::from_name(name).ok_or_else(|| {
            api_error(StatusCode::NOT_FOUND, format!("Unknown region '{}'", name))
        })?),
    };
    Ok(Json(state.ctx.statistics(region).await))
}
