//! Raw upstream passthrough
//!
//! Keeps API keys server-side. An unconfigured upstream answers 503, a
//! transport failure 502, and an upstream error status is passed through.
//! Kandilli failures of any kind answer 502.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use risk_sources::SourceError;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::routes::{api_error, query_error, ApiError, ApiResult};
use crate::AppState;

const DEFAULT_EVENT_LIMIT: u32 = 50;
const MAX_EVENT_LIMIT: u32 = 500;

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<u32>,
}

pub fn proxy_router() -> Router<AppState> {
    Router::new()
        .route("/weather", get(proxy_weather))
        .route("/afad/events", get(proxy_afad_events))
        .route("/kandilli/recent", get(proxy_kandilli_recent))
}

fn upstream_error(upstream: &str, e: SourceError) -> ApiError {
    warn!("{} proxy failed: {}", upstream, e);
    let status = match &e {
        SourceError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        SourceError::Status(code) => {
            StatusCode::from_u16(*code).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        SourceError::Request(_) | SourceError::Parse(_) => StatusCode::BAD_GATEWAY,
    };
    api_error(status, e.to_string())
}

pub async fn proxy_weather(
    State(state): State<AppState>,
    query: Result<Query<WeatherQuery>, QueryRejection>,
) -> ApiResult<Value> {
    let Query(query) = query.map_err(query_error)?;
    if state.ctx.config().weather_api_key.is_none() {
        warn!("Weather proxy called without an API key configured");
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "No weather API key configured",
        ));
    }
    let client = state
        .ctx
        .pipeline()
        .fetcher()
        .weather_client()
        .ok_or_else(|| upstream_error("Weather", SourceError::NotConfigured("weather")))?;
    client
        .raw_current(query.lat, query.lon)
        .await
        .map(Json)
        .map_err(|e| upstream_error("Weather", e))
}

pub async fn proxy_afad_events(
    State(state): State<AppState>,
    query: Result<Query<EventsQuery>, QueryRejection>,
) -> ApiResult<Value> {
    let Query(query) = query.map_err(query_error)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .clamp(1, MAX_EVENT_LIMIT);
    let client = state
        .ctx
        .pipeline()
        .fetcher()
        .seismic_client()
        .ok_or_else(|| upstream_error("AFAD", SourceError::NotConfigured("seismic")))?;
    client
        .raw_events(limit)
        .await
        .map(Json)
        .map_err(|e| upstream_error("AFAD", e))
}

pub async fn proxy_kandilli_recent(State(state): State<AppState>) -> ApiResult<Value> {
    let client = state.ctx.pipeline().fetcher().kandilli_client().ok_or_else(|| {
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Kandilli endpoint not configured",
        )
    })?;
    client.raw_recent().await.map(Json).map_err(|e| {
        warn!("Kandilli proxy failed: {}", e);
        api_error(StatusCode::BAD_GATEWAY, e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::tests::{send, test_state};
    use crate::AppState;
    use axum::body::Body;
    use axum::http::Request;
    use risk_sources::{AppContext, RiskoConfig};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn spawn_upstream() -> String {
        let app = Router::new()
            .route(
                "/weather",
                axum::routing::get(|| async {
                    Json(json!({ "main": { "temp": 21.5, "humidity": 40 } }))
                }),
            )
            .route(
                "/events",
                axum::routing::post(|| async { StatusCode::TOO_MANY_REQUESTS }),
            )
            .route(
                "/limited",
                axum::routing::post(|Json(filter): Json<Value>| async move { Json(filter) }),
            )
            .route(
                "/kandilli",
                axum::routing::get(|| async { Json(json!({ "result": [{ "mag": 4.1 }] })) }),
            )
            .route(
                "/kandilli-down",
                axum::routing::get(|| async { StatusCode::NOT_FOUND }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn state_with(dir: &TempDir, config: RiskoConfig) -> AppState {
        let ctx = AppContext::create(config, dir.path().join("prefs.json")).unwrap();
        AppState { ctx: Arc::new(ctx) }
    }

    #[tokio::test]
    async fn test_unconfigured_upstreams_are_503() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);

        let (status, _) = send(&state, get("/api/v1/proxy/weather?lat=41&lon=29")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let (status, _) = send(&state, get("/api/v1/proxy/afad/events")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let (status, body) = send(&state, get("/api/v1/proxy/kandilli/recent")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Kandilli endpoint not configured");
    }

    #[tokio::test]
    async fn test_weather_without_key_is_503() {
        let base = spawn_upstream().await;
        let dir = TempDir::new().unwrap();
        let state = state_with(
            &dir,
            RiskoConfig {
                weather_url: Some(format!("{}/weather", base)),
                ..RiskoConfig::offline()
            },
        );
        let (status, body) = send(&state, get("/api/v1/proxy/weather?lat=41&lon=29")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "No weather API key configured");
    }

    #[tokio::test]
    async fn test_event_limit_clamped_to_500() {
        let base = spawn_upstream().await;
        let dir = TempDir::new().unwrap();
        let state = state_with(
            &dir,
            RiskoConfig {
                seismic_url: Some(format!("{}/limited", base)),
                ..RiskoConfig::offline()
            },
        );

        let (status, echoed) = send(&state, get("/api/v1/proxy/afad/events?limit=5000")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(echoed["limit"], 500);

        let (_, echoed) = send(&state, get("/api/v1/proxy/afad/events")).await;
        assert_eq!(echoed["limit"], 50);

        let (_, echoed) = send(&state, get("/api/v1/proxy/afad/events?limit=0")).await;
        assert_eq!(echoed["limit"], 1);

        let (status, body) = send(&state, get("/api/v1/proxy/afad/events?limit=lots")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_kandilli_passthrough_and_failure() {
        let base = spawn_upstream().await;
        let dir = TempDir::new().unwrap();
        let state = state_with(
            &dir,
            RiskoConfig {
                kandilli_url: Some(format!("{}/kandilli", base)),
                ..RiskoConfig::offline()
            },
        );
        let (status, body) = send(&state, get("/api/v1/proxy/kandilli/recent")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"][0]["mag"], 4.1);

        let dir = TempDir::new().unwrap();
        let state = state_with(
            &dir,
            RiskoConfig {
                kandilli_url: Some(format!("{}/kandilli-down", base)),
                ..RiskoConfig::offline()
            },
        );
        let (status, body) = send(&state, get("/api/v1/proxy/kandilli/recent")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_502() {
        let dir = TempDir::new().unwrap();
        let state = state_with(
            &dir,
            RiskoConfig {
                weather_url: Some("http://127.0.0.1:9/weather".to_string()),
                weather_api_key: Some("test-key".to_string()),
                ..RiskoConfig::offline()
            },
        );
        let (status, body) = send(&state, get("/api/v1/proxy/weather?lat=41&lon=29")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_passthrough_body_and_status() {
        let base = spawn_upstream().await;
        let dir = TempDir::new().unwrap();
        let state = state_with(
            &dir,
            RiskoConfig {
                weather_url: Some(format!("{}/weather", base)),
                weather_api_key: Some("test-key".to_string()),
                seismic_url: Some(format!("{}/events", base)),
                ..RiskoConfig::offline()
            },
        );

        let (status, body) = send(&state, get("/api/v1/proxy/weather?lat=41&lon=29")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["main"]["temp"], 21.5);

        let (status, _) = send(&state, get("/api/v1/proxy/afad/events?limit=5")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }
}
