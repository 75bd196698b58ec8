//! Demo payloads served without touching any upstream

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use risk_engine::demo::{DemoKind, DemoPayload, DemoProvider};
use risk_engine::Location;

use crate::routes::{api_error, ApiResult};
use crate::AppState;

pub fn demo_router() -> Router<AppState> {
    Router::new().route("/:kind", get(demo_payload))
}

pub async fn demo_payload(
    State(_state): State<AppState>,
    Path(kind): Path<String>,
) -> ApiResult<DemoPayload> {
    let kind: DemoKind = kind
        .parse()
        .map_err(|e: String| api_error(StatusCode::NOT_FOUND, e))?;
    let location = Location::centroid().with_address("Demo location");
    Ok(Json(DemoProvider::from_entropy().payload(kind, &location)))
}

#[cfg(test)]
mod tests {
    use crate::routes::tests::{send, test_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_demo_analysis_shape() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(&test_state(&dir), get("/api/v1/demo/analysis")).await;
        assert_eq!(status, StatusCode::OK);
        let score = body["overall_score"].as_f64().unwrap();
        assert!((0.0..=100.0).contains(&score));
        assert_eq!(body["risk_breakdown"].as_object().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_demo_map_data_and_activities() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);

        let (status, body) = send(&state, get("/api/v1/demo/map-data")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), state.ctx.map_points().len());

        let (status, body) = send(&state, get("/api/v1/demo/activities")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.as_array().unwrap().iter().all(|a| a["type"].is_string()));
    }

    #[tokio::test]
    async fn test_unknown_demo_kind() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(&test_state(&dir), get("/api/v1/demo/bogus")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("bogus"));
    }
}
