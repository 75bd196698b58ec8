use anyhow::Result;
use axum::{extract::State, routing::get, Json, Router};
use risk_sources::{AppContext, RiskoConfig};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod b2b_routes;
mod demo_routes;
mod proxy_routes;
mod realtime;
mod routes;

pub const DEFAULT_PREFERENCES_PATH: &str = ".risko-preferences.json";

#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<AppContext>,
}

/// Full HTTP surface over an application context
pub fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(routes::risk_router())
        .nest("/b2b", b2b_routes::b2b_router())
        .nest("/demo", demo_routes::demo_router())
        .nest("/proxy", proxy_routes::proxy_router());

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "risko_gateway=debug,risk_sources=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RiskoConfig::load()?;
    let preferences_path = std::env::var("RISKO_PREFERENCES_PATH")
        .unwrap_or_else(|_| DEFAULT_PREFERENCES_PATH.to_string());

    let ctx = Arc::new(AppContext::create(config, &preferences_path)?);
    tracing::info!("   Preferences stored at {}", preferences_path);
    tracing::info!(
        "   Static fallback: {}, demo fallback: {}",
        ctx.config().static_fallback,
        ctx.config().demo_fallback
    );

    let refresh = realtime::start_feed_refresh(ctx.clone());

    let state = AppState { ctx: ctx.clone() };
    let app = app(state);

    let port = std::env::var("RISKO_GATEWAY_PORT")
        .or_else(|_| std::env::var("PORT"))
        .unwrap_or_else(|_| "8000".to_string());
    let addr = format!("0.0.0.0:{}", port);

    tracing::info!("Risko Gateway starting on {}", addr);
    tracing::info!("   Map places: {}", ctx.map_points().len());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    refresh.abort();
    ctx.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "risko-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.ctx.uptime().num_seconds(),
        "sessions": state.ctx.session_count().await,
        "history_tokens": state.ctx.history_token_count().await
    }))
}
