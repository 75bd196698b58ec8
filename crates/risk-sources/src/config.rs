//! Runtime configuration
//!
//! Defaults, then an optional JSON file named by `RISKO_CONFIG`, then
//! `RISKO_*` environment overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_TIMEOUT_SEC: u64 = 10;
pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const DEFAULT_USER_AGENT: &str = "risko/0.1 (risk-analysis)";
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskoConfig {
    /// Geocoding search endpoint; `None` resolves from the city table only
    pub geocoder_url: Option<String>,
    /// Appended to every geocoding query
    pub country_qualifier: String,
    pub seismic_url: Option<String>,
    pub weather_url: Option<String>,
    pub weather_api_key: Option<String>,
    pub demographic_url: Option<String>,
    pub geological_url: Option<String>,
    pub municipal_url: Option<String>,
    /// Kandilli observatory recent-quake feed, proxied raw
    pub kandilli_url: Option<String>,
    /// Keys accepted in `x-api-key` by the partner endpoints
    pub b2b_api_keys: Vec<String>,
    /// Sessions and history tokens tracked before the idlest is evicted
    pub max_sessions: usize,
    /// Map tile template; `None` draws markers on a plain background
    pub tile_url: Option<String>,
    /// Host HTTP timeout; `None` disables it
    pub timeout_sec: Option<u64>,
    /// Substitute the regional table when a live call fails
    pub static_fallback: bool,
    /// Serve a demo result when every source is unavailable
    pub demo_fallback: bool,
    pub user_agent: String,
}

impl Default for RiskoConfig {
    fn default() -> Self {
        Self {
            geocoder_url: Some(DEFAULT_GEOCODER_URL.to_string()),
            country_qualifier: "Turkey".to_string(),
            seismic_url: None,
            weather_url: None,
            weather_api_key: None,
            demographic_url: None,
            geological_url: None,
            municipal_url: None,
            kandilli_url: None,
            b2b_api_keys: Vec::new(),
            max_sessions: DEFAULT_MAX_SESSIONS,
            tile_url: Some(DEFAULT_TILE_URL.to_string()),
            timeout_sec: Some(DEFAULT_TIMEOUT_SEC),
            static_fallback: true,
            demo_fallback: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl RiskoConfig {
    /// No network access at all: every source comes from the static tables
    pub fn offline() -> Self {
        Self::default().without_upstreams()
    }

    pub fn without_upstreams(mut self) -> Self {
        self.geocoder_url = None;
        self.seismic_url = None;
        self.weather_url = None;
        self.demographic_url = None;
        self.geological_url = None;
        self.municipal_url = None;
        self.kandilli_url = None;
        self.tile_url = None;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_sec.map(Duration::from_secs)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load from `RISKO_CONFIG` (if set) and apply environment overrides
    pub fn load() -> anyhow::Result<Self> {
        let base = match std::env::var("RISKO_CONFIG") {
            Ok(path) => {
                info!("Loading config from {}", path);
                Self::from_file(Path::new(&path))?
            }
            Err(_) => Self::default(),
        };
        Ok(base.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply `RISKO_*` overrides from any key lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = url("RISKO_GEOCODER_URL") {
            self.geocoder_url = Some(v);
        }
        if let Some(v) = url("RISKO_SEISMIC_URL") {
            self.seismic_url = Some(v);
        }
        if let Some(v) = url("RISKO_WEATHER_URL") {
            self.weather_url = Some(v);
        }
        if let Some(v) = url("RISKO_WEATHER_API_KEY") {
            self.weather_api_key = Some(v);
        }
        if let Some(v) = url("RISKO_DEMOGRAPHIC_URL") {
            self.demographic_url = Some(v);
        }
        if let Some(v) = url("RISKO_GEOLOGICAL_URL") {
            self.geological_url = Some(v);
        }
        if let Some(v) = url("RISKO_MUNICIPAL_URL") {
            self.municipal_url = Some(v);
        }
        if let Some(v) = url("RISKO_KANDILLI_URL") {
            self.kandilli_url = Some(v);
        }
        if let Some(v) = lookup("RISKO_B2B_API_KEYS") {
            self.b2b_api_keys = v
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = lookup("RISKO_MAX_SESSIONS") {
            match v.parse::<usize>() {
                Ok(n) if n > 0 => self.max_sessions = n,
                _ => debug!("Ignoring invalid RISKO_MAX_SESSIONS={}", v),
            }
        }
        if let Some(v) = url("RISKO_TILE_URL") {
            self.tile_url = Some(v);
        }
        if let Some(v) = lookup("RISKO_TIMEOUT_SEC") {
            match v.parse::<u64>() {
                Ok(0) => self.timeout_sec = None,
                Ok(secs) => self.timeout_sec = Some(secs),
                Err(_) => debug!("Ignoring invalid RISKO_TIMEOUT_SEC={}", v),
            }
        }
        if matches!(lookup("RISKO_OFFLINE").as_deref(), Some("1") | Some("true")) {
            self = self.without_upstreams();
        }
        self
    }
}
