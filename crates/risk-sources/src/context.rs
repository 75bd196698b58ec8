//! Application context
//!
//! Owns every long-lived component: the pipeline, the map view, the
//! dashboard feed, preferences and the per-session result slots. Built once
//! with `create` and torn down with `shutdown`. Session and history tables
//! hold at most `max_sessions` keys; the least recently used key goes first.

use crate::config::RiskoConfig;
use crate::pipeline::{AnalysisMode, AnalysisOutcome, AnalysisRequest, RiskPipeline};
use crate::Result;
use chrono::{DateTime, Duration, Utc};
use risk_engine::feed::{Clock, DashboardStats, LiveFeed, SystemClock};
use risk_engine::map::{Bounds, MapCatalog, MapPoint, MapScene, MapView};
use risk_engine::preferences::{PreferenceStore, Preferences};
use risk_engine::regional::Region;
use risk_engine::session::{AnalysisSlot, History, KeyedTable, RequestId};
use risk_engine::statistics::{summarize, RiskStatistics};
use risk_engine::RiskLevel;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_FEED_INTERVAL_SECS: i64 = 30;

/// Compact record of one analysis in a user's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub request_id: RequestId,
    pub address: Option<String>,
    pub overall_risk_score: f64,
    pub risk_level: RiskLevel,
    pub mode: AnalysisMode,
    pub created_at: DateTime<Utc>,
}

impl From<&AnalysisOutcome> for HistoryEntry {
    fn from(outcome: &AnalysisOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id: outcome.request_id,
            address: outcome.result.location.address.clone(),
            overall_risk_score: outcome.result.overall_score,
            risk_level: outcome.result.risk_level,
            mode: outcome.mode,
            created_at: outcome.result.timestamp,
        }
    }
}

pub struct AppContext {
    config: RiskoConfig,
    pipeline: RiskPipeline,
    catalog: MapCatalog,
    map: RwLock<MapView>,
    feed: RwLock<LiveFeed>,
    preferences: PreferenceStore,
    sessions: RwLock<KeyedTable<AnalysisSlot<AnalysisOutcome>>>,
    history: RwLock<KeyedTable<History<HistoryEntry>>>,
    started_at: DateTime<Utc>,
}

impl AppContext {
    pub fn create(config: RiskoConfig, preferences_path: impl Into<PathBuf>) -> Result<Self> {
        let pipeline = RiskPipeline::from_config(&config)?;
        let preferences = PreferenceStore::new(preferences_path);
        let zoom = preferences
            .load()
            .map(|p| p.default_zoom)
            .unwrap_or_else(|_| Preferences::default().default_zoom);
        let tiles = config.tile_url.clone();

        let seed = Utc::now().timestamp_millis() as u64;
        let mut feed = LiveFeed::new(Duration::seconds(DEFAULT_FEED_INTERVAL_SECS), seed);
        feed.poll(&SystemClock);

        info!(
            "Application context created (map zoom {}, {} sessions max)",
            zoom, config.max_sessions
        );
        Ok(Self {
            sessions: RwLock::new(KeyedTable::with_capacity(config.max_sessions)),
            history: RwLock::new(KeyedTable::with_capacity(config.max_sessions)),
            config,
            pipeline,
            catalog: MapCatalog::seeded(),
            map: RwLock::new(MapView::new(zoom, tiles)),
            feed: RwLock::new(feed),
            preferences,
            started_at: Utc::now(),
        })
    }

    pub fn config(&self) -> &RiskoConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &RiskPipeline {
        &self.pipeline
    }

    pub fn uptime(&self) -> Duration {
        Utc::now() - self.started_at
    }

    pub fn map_points(&self) -> &[MapPoint] {
        self.catalog.points()
    }

    /// Run an analysis for a session, keeping only the newest result
    pub async fn analyze(&self, session: &str, request: &AnalysisRequest) -> AnalysisOutcome {
        let id = self.pipeline.sequencer().next_id();
        self.sessions.write().await.touch(session).begin(id);

        let outcome = self.pipeline.analyze_as(id, request).await;

        let committed = self
            .sessions
            .write()
            .await
            .touch(session)
            .commit(id, outcome.clone());
        if !committed {
            debug!("Session '{}' already has a newer result than {}", session, id);
        }
        outcome
    }

    pub async fn latest(&self, session: &str) -> Option<AnalysisOutcome> {
        self.sessions
            .read()
            .await
            .get(session)
            .and_then(|slot| slot.latest().cloned())
    }

    pub async fn record_history(&self, token: &str, outcome: &AnalysisOutcome) {
        self.history
            .write()
            .await
            .touch(token)
            .push(HistoryEntry::from(outcome));
    }

    /// Newest first
    pub async fn history(&self, token: &str) -> Vec<HistoryEntry> {
        self.history
            .read()
            .await
            .get(token)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn history_token_count(&self) -> usize {
        self.history.read().await.len()
    }

    /// Re-render the map at a zoom and optional viewport
    pub async fn render_map(&self, zoom: u8, viewport: Option<Bounds>, tiles_ok: bool) -> MapScene {
        let mut view = self.map.write().await;
        view.set_zoom(zoom);
        view.set_viewport(viewport);
        view.set_tiles_available(tiles_ok);
        view.refresh(self.catalog.points()).clone()
    }

    pub async fn poll_feed(&self, clock: &dyn Clock) -> bool {
        self.feed.write().await.poll(clock)
    }

    pub async fn dashboard_stats(&self) -> DashboardStats {
        self.feed.read().await.snapshot().clone()
    }

    pub async fn feed_interval(&self) -> std::time::Duration {
        let interval = self.feed.read().await.interval();
        interval
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(DEFAULT_FEED_INTERVAL_SECS as u64))
    }

    /// Catalog averages for one metro, or nationally when `region` is `None`
    pub async fn statistics(&self, region: Option<Region>) -> RiskStatistics {
        let total = self.feed.read().await.snapshot().total_analyses;
        summarize(region, self.catalog.results(), total)
    }

    pub fn load_preferences(&self) -> risk_engine::Result<Preferences> {
        self.preferences.load()
    }

    pub fn save_preferences(&self, prefs: &Preferences) -> risk_engine::Result<Preferences> {
        self.preferences.save(prefs)
    }

    /// Drop all session state and the rendered map
    pub async fn shutdown(&self) {
        self.map.write().await.destroy();
        self.sessions.write().await.clear();
        self.history.write().await.clear();
        info!("Application context shut down");
    }
}
