//! Risko Risk Engine
//!
//! Combines five independent hazard sources into a single location risk
//! score, buckets it, derives triggered risk factors and advice, and turns
//! scored places into zoom-tiered map markers.
//!
//! # Scoring Model (linear weighted sum)
//!
//! ```text
//! Score = 0.25·EQ + 0.10·LS + 0.05·FI      (seismic)
//!       + 0.15·FL + 0.05·HT                (weather)
//!       + 0.15·D(density, income)          (demographic, capped 50)
//!       + 0.15·G(soil, fault_distance)     (geological, capped 55)
//!       + 0.10·M(building_age, infra)      (municipal, capped 35)
//! ```
//!
//! | Source      | Terms                        | Weight |
//! |-------------|------------------------------|--------|
//! | Seismic     | earthquake, landslide, fire  | 0.40   |
//! | Weather     | flood, heat                  | 0.20   |
//! | Demographic | density + income buckets     | 0.15   |
//! | Geological  | soil + fault proximity       | 0.15   |
//! | Municipal   | building age + infrastructure| 0.10   |
//!
//! An unavailable source contributes zero. Its weight is not redistributed,
//! so scores computed with missing sources are biased low.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod aggregator;
pub mod demo;
pub mod feed;
pub mod map;
pub mod preferences;
pub mod recommendations;
pub mod regional;
pub mod report;
pub mod session;
pub mod sources;
pub mod statistics;

pub use aggregator::{aggregate, aggregate_at, AggregateResult, RiskFactor};
pub use map::{MapPoint, MapScene, MapView, Marker, Tier};
pub use sources::{PartialSources, SourceKind, SourceReading};

/// Fixed national centroid used when an address cannot be resolved
pub const TURKEY_CENTROID: (f64, f64) = (39.0, 35.0);

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Upstream source {kind} unavailable: {reason}")]
    UpstreamUnavailable { kind: SourceKind, reason: String },
    #[error("Could not geocode address: {0}")]
    GeocodeFailed(String),
    #[error("All risk sources are unavailable")]
    AggregationInputMissing,
    #[error("Batch size cannot exceed {limit} addresses")]
    BatchTooLarge { size: usize, limit: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RiskError>;

/// A resolved geographic position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            address: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn centroid() -> Self {
        Self::new(TURKEY_CENTROID.0, TURKEY_CENTROID.1)
    }
}

/// The four hazards reported in every risk breakdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hazard {
    Earthquake,
    Flood,
    Fire,
    Landslide,
}

impl Hazard {
    pub const ALL: [Hazard; 4] = [
        Hazard::Earthquake,
        Hazard::Flood,
        Hazard::Fire,
        Hazard::Landslide,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Hazard::Earthquake => "earthquake",
            Hazard::Flood => "flood",
            Hazard::Fire => "fire",
            Hazard::Landslide => "landslide",
        }
    }
}

impl std::fmt::Display for Hazard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical three-band risk level
///
/// `low` below 40, `medium` from 40 up to and including 70, `high` above 70.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Lower bound (inclusive) of the medium band
pub const MEDIUM_THRESHOLD: f64 = 40.0;
/// Upper bound (inclusive) of the medium band
pub const HIGH_THRESHOLD: f64 = 70.0;

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score > HIGH_THRESHOLD {
            RiskLevel::High
        } else if score >= MEDIUM_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
