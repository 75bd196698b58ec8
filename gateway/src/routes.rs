use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use risk_engine::feed::DashboardStats;
use risk_engine::map::{Bounds, MapPoint, MapScene, MAX_ZOOM, MIN_ZOOM};
use risk_engine::preferences::Preferences;
use risk_engine::report::{visualize, DetailedReport, Visualization};
use risk_sources::{AnalysisOutcome, AnalysisRequest, HistoryEntry};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::AppState;

pub const SESSION_HEADER: &str = "x-session-id";
pub const ANONYMOUS_SESSION: &str = "anonymous";

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Malformed query strings answer in the JSON error shape
pub fn query_error(rejection: QueryRejection) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, rejection.body_text())
}

#[derive(Debug, Deserialize)]
pub struct MapQuery {
    /// Clamped into the supported zoom range
    pub zoom: Option<i64>,
    /// `false` when the client's tile layer failed to load
    pub tiles: Option<bool>,
    pub south: Option<f64>,
    pub west: Option<f64>,
    pub north: Option<f64>,
    pub east: Option<f64>,
}

impl MapQuery {
    /// All four edges or none
    fn viewport(&self) -> Result<Option<Bounds>, ApiError> {
        match (self.south, self.west, self.north, self.east) {
            (None, None, None, None) => Ok(None),
            (Some(south), Some(west), Some(north), Some(east)) => {
                if south > north || west > east {
                    return Err(api_error(
                        StatusCode::BAD_REQUEST,
                        "viewport corners are reversed",
                    ));
                }
                Ok(Some(Bounds {
                    south,
                    west,
                    north,
                    east,
                }))
            }
            _ => Err(api_error(
                StatusCode::BAD_REQUEST,
                "viewport needs south, west, north and east",
            )),
        }
    }
}

pub fn risk_router() -> Router<AppState> {
    Router::new()
        .route("/risk/analyze", post(analyze))
        .route("/risk/analyze/detailed", post(analyze_detailed))
        .route("/risk/visualize", post(visualize_risk))
        .route("/risk/map-data", get(map_data))
        .route("/risk/map", get(map_scene))
        .route("/risk/latest", get(latest))
        .route("/dashboard/stats", get(dashboard_stats))
        .route("/analyses/history", get(history))
        .route("/preferences", get(get_preferences).put(put_preferences))
}

fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(ANONYMOUS_SESSION)
        .to_string()
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

pub async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AnalysisRequest>,
) -> Json<AnalysisOutcome> {
    let session = session_id(&headers);
    let outcome = state.ctx.analyze(&session, &request).await;

    if let Some(token) = bearer_token(&headers) {
        state.ctx.record_history(&token, &outcome).await;
    }
    Json(outcome)
}

pub async fn analyze_detailed(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Json<DetailedReport> {
    Json(state.ctx.pipeline().analyze_detailed(&request).await)
}

pub async fn visualize_risk(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Json<Visualization> {
    let outcome = state.ctx.pipeline().analyze(&request).await;
    Json(visualize(&outcome.result))
}

pub async fn map_data(State(state): State<AppState>) -> Json<Vec<MapPoint>> {
    Json(state.ctx.map_points().to_vec())
}

pub async fn map_scene(
    State(state): State<AppState>,
    query: Result<Query<MapQuery>, QueryRejection>,
) -> ApiResult<MapScene> {
    let Query(query) = query.map_err(query_error)?;
    let viewport = query.viewport()?;
    let zoom = match query.zoom {
        Some(zoom) => zoom.clamp(MIN_ZOOM as i64, MAX_ZOOM as i64) as u8,
        None => state
            .ctx
            .load_preferences()
            .map(|p| p.default_zoom)
            .unwrap_or_else(|_| Preferences::default().default_zoom),
    };
    let tiles_ok = query.tiles.unwrap_or(true);
    Ok(Json(state.ctx.render_map(zoom, viewport, tiles_ok).await))
}

pub async fn latest(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<AnalysisOutcome> {
    let session = session_id(&headers);
    state
        .ctx
        .latest(&session)
        .await
        .map(Json)
        .ok_or_else(|| {
            api_error(
                StatusCode::NOT_FOUND,
                format!("No analysis yet for session '{}'", session),
            )
        })
}

pub async fn dashboard_stats(State(state): State<AppState>) -> Json<DashboardStats> {
    Json(state.ctx.dashboard_stats().await)
}

pub async fn history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Vec<HistoryEntry>> {
    let token = bearer_token(&headers)
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "Missing bearer token"))?;
    let entries = state.ctx.history(&token).await;
    debug!("History lookup returned {} entries", entries.len());
    Ok(Json(entries))
}

pub async fn get_preferences(State(state): State<AppState>) -> ApiResult<Preferences> {
    state.ctx.load_preferences().map(Json).map_err(|e| {
        warn!("Failed to load preferences: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })
}

pub async fn put_preferences(
    State(state): State<AppState>,
    Json(prefs): Json<Preferences>,
) -> ApiResult<Preferences> {
    state.ctx.save_preferences(&prefs).map(Json).map_err(|e| {
        warn!("Failed to save preferences: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::app;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use risk_sources::{AppContext, RiskoConfig};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    pub(crate) fn test_state(dir: &TempDir) -> AppState {
        let ctx = AppContext::create(RiskoConfig::offline(), dir.path().join("prefs.json")).unwrap();
        AppState { ctx: Arc::new(ctx) }
    }

    pub(crate) async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = app(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);
        send(&state, post_json("/api/v1/risk/analyze", json!({ "address": "Bursa" }))).await;

        let (status, body) = send(&state, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["sessions"], 1);
        assert_eq!(body["history_tokens"], 0);
        assert!(body["uptime_secs"].as_i64().unwrap() >= 0);
    }

    #[tokio::test]
    async fn test_analyze_offline_istanbul() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);
        let (status, body) = send(
            &state,
            post_json("/api/v1/risk/analyze", json!({ "address": "Istanbul" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "partial");
        let score = body["result"]["overall_score"].as_f64().unwrap();
        assert!((score - 52.75).abs() <= 0.1);
        assert_eq!(body["result"]["data_sources"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_latest_is_per_session() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);

        let (status, _) = send(&state, get("/api/v1/risk/latest")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let request = Request::post("/api/v1/risk/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .header(SESSION_HEADER, "tab-1")
            .body(Body::from(json!({ "address": "Ankara" }).to_string()))
            .unwrap();
        let (_, analyzed) = send(&state, request).await;

        let request = Request::get("/api/v1/risk/latest")
            .header(SESSION_HEADER, "tab-1")
            .body(Body::empty())
            .unwrap();
        let (status, latest) = send(&state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(latest["request_id"], analyzed["request_id"]);

        let (status, _) = send(&state, get("/api/v1/risk/latest")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_detailed_and_visualize() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);

        let (status, body) = send(
            &state,
            post_json("/api/v1/risk/analyze/detailed", json!({ "address": "Izmir" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["recommendations"].is_array());
        assert!(body["prevention_tips"].is_array());

        let (status, body) = send(
            &state,
            post_json("/api/v1/risk/visualize", json!({ "address": "Izmir" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["risk_map_data"]["type"], "FeatureCollection");
        assert_eq!(body["risk_map_data"]["features"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_map_zoom_and_viewport() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);

        let (status, wide) = send(&state, get("/api/v1/risk/map?zoom=6")).await;
        assert_eq!(status, StatusCode::OK);
        let wide_count = wide["markers"].as_array().unwrap().len();
        assert!(wide["markers"]
            .as_array()
            .unwrap()
            .iter()
            .all(|m| m["tier"] == "city"));

        let (_, close) = send(&state, get("/api/v1/risk/map?zoom=14")).await;
        assert!(close["markers"].as_array().unwrap().len() > wide_count);

        let (status, _) = send(&state, get("/api/v1/risk/map?zoom=6&south=40")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, boxed) = send(
            &state,
            get("/api/v1/risk/map?zoom=6&south=40.8&west=28.5&north=41.3&east=29.5"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(boxed["markers"].as_array().unwrap().len() < wide_count);
    }

    #[tokio::test]
    async fn test_map_zoom_out_of_range_is_clamped() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);

        let (status, body) = send(&state, get("/api/v1/risk/map?zoom=300")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["zoom"], 18);

        let (status, body) = send(&state, get("/api/v1/risk/map?zoom=-4")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["zoom"], 1);
    }

    #[tokio::test]
    async fn test_malformed_map_query_is_json_error() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(&test_state(&dir), get("/api/v1/risk/map?zoom=abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to deserialize query string"));
    }

    #[tokio::test]
    async fn test_map_tile_failure_flag() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(&test_state(&dir), get("/api/v1/risk/map?zoom=9&tiles=false")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["background"]["kind"], "plain");
    }

    #[tokio::test]
    async fn test_map_data_lists_catalog() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);
        let (status, body) = send(&state, get("/api/v1/risk/map-data")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), state.ctx.map_points().len());
    }

    #[tokio::test]
    async fn test_history_requires_bearer() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);

        let (status, body) = send(&state, get("/api/v1/analyses/history")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());

        for address in ["Ankara", "Izmir"] {
            let request = Request::post("/api/v1/risk/analyze")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, "Bearer abc")
                .body(Body::from(json!({ "address": address }).to_string()))
                .unwrap();
            send(&state, request).await;
        }

        let request = Request::get("/api/v1/analyses/history")
            .header(header::AUTHORIZATION, "Bearer abc")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&state, request).await;
        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["address"], "Izmir");
    }

    #[tokio::test]
    async fn test_preferences_round_trip_and_clamp() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);

        let (status, body) = send(&state, get("/api/v1/preferences")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["default_zoom"], 6);

        let request = Request::put("/api/v1/preferences")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "theme": "dark", "default_zoom": 40 }).to_string(),
            ))
            .unwrap();
        let (status, saved) = send(&state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(saved["theme"], "dark");
        assert_eq!(saved["default_zoom"], 18);

        let (_, reloaded) = send(&state, get("/api/v1/preferences")).await;
        assert_eq!(reloaded, saved);
    }

    #[tokio::test]
    async fn test_dashboard_stats() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(&test_state(&dir), get("/api/v1/dashboard/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["total_analyses"].as_u64().unwrap() > 0);
    }
}
