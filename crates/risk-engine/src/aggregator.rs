//! Risk aggregation
//!
//! Implements the five-source linear model:
//! Score = Σ wᵢ·componentᵢ, with the demographic, geological and municipal
//! sub-scores capped before weighting. See the crate docs for the table.

use crate::recommendations::{factor_advice, general_advice};
use crate::sources::{PartialSources, SourceKind};
use crate::{round1, Hazard, Location, RiskLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Source weights (sum = 1.0 with all sources present)
pub const W_EARTHQUAKE: f64 = 0.25;
pub const W_LANDSLIDE: f64 = 0.10;
pub const W_FIRE: f64 = 0.05;
pub const W_FLOOD: f64 = 0.15;
pub const W_HEAT: f64 = 0.05;
pub const W_DEMOGRAPHIC: f64 = 0.15;
pub const W_GEOLOGICAL: f64 = 0.15;
pub const W_MUNICIPAL: f64 = 0.10;

/// Breakdown value reported for a hazard whose source was unavailable
pub const BREAKDOWN_BASELINE: f64 = 0.0;

/// Factor trigger thresholds (unweighted sub-scores, exclusive)
pub const EARTHQUAKE_TRIGGER: f64 = 60.0;
pub const FLOOD_TRIGGER: f64 = 50.0;
pub const FIRE_TRIGGER: f64 = 50.0;
pub const LANDSLIDE_TRIGGER: f64 = 50.0;
pub const GEOLOGICAL_TRIGGER: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorType {
    Earthquake,
    Flood,
    Fire,
    Landslide,
    Other,
}

impl From<Hazard> for FactorType {
    fn from(h: Hazard) -> Self {
        match h {
            Hazard::Earthquake => FactorType::Earthquake,
            Hazard::Flood => FactorType::Flood,
            Hazard::Fire => FactorType::Fire,
            Hazard::Landslide => FactorType::Landslide,
        }
    }
}

/// A thresholded hazard surfaced to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    #[serde(rename = "type")]
    pub factor_type: FactorType,
    pub score: f64,
    pub level: RiskLevel,
    pub description: String,
}

/// Result of one analysis; rebuilt from scratch on every call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub location: Location,
    /// Weighted overall score (0-100, one decimal)
    pub overall_score: f64,
    pub risk_level: RiskLevel,
    /// Always exactly the four hazards
    pub risk_breakdown: BTreeMap<Hazard, f64>,
    pub risk_factors: Vec<RiskFactor>,
    pub recommendations: Vec<String>,
    pub data_sources: BTreeSet<SourceKind>,
    /// Weighted term contributed by each source
    pub contributions: BTreeMap<SourceKind, f64>,
    pub timestamp: DateTime<Utc>,
}

impl AggregateResult {
    pub fn hazard_score(&self, hazard: Hazard) -> f64 {
        self.risk_breakdown
            .get(&hazard)
            .copied()
            .unwrap_or(BREAKDOWN_BASELINE)
    }
}

/// Aggregate gathered sources into a result stamped with the current time
pub fn aggregate(sources: &PartialSources, location: &Location) -> AggregateResult {
    aggregate_at(sources, location, Utc::now())
}

/// Aggregate with an explicit timestamp
pub fn aggregate_at(
    sources: &PartialSources,
    location: &Location,
    timestamp: DateTime<Utc>,
) -> AggregateResult {
    let sources = sources.clone().normalized();
    let mut contributions = BTreeMap::new();

    let seismic = sources
        .seismic
        .signal()
        .map(|s| {
            W_EARTHQUAKE * s.earthquake_risk + W_LANDSLIDE * s.landslide_risk + W_FIRE * s.fire_risk
        })
        .unwrap_or(0.0);
    contributions.insert(SourceKind::Seismic, seismic);

    let weather = sources
        .weather
        .signal()
        .map(|w| W_FLOOD * w.flood_risk + W_HEAT * w.heat_risk)
        .unwrap_or(0.0);
    contributions.insert(SourceKind::Weather, weather);

    let demographic = sources
        .demographic
        .signal()
        .map(|d| W_DEMOGRAPHIC * d.risk())
        .unwrap_or(0.0);
    contributions.insert(SourceKind::Demographic, demographic);

    let geological = sources
        .geological
        .signal()
        .map(|g| W_GEOLOGICAL * g.risk())
        .unwrap_or(0.0);
    contributions.insert(SourceKind::Geological, geological);

    let municipal = sources
        .municipal
        .signal()
        .map(|m| W_MUNICIPAL * m.risk())
        .unwrap_or(0.0);
    contributions.insert(SourceKind::Municipal, municipal);

    let overall_score = round1(seismic + weather + demographic + geological + municipal);
    let risk_level = RiskLevel::from_score(overall_score);

    let risk_breakdown = breakdown(&sources);
    let risk_factors = risk_factors(&sources, &risk_breakdown);

    let mut recommendations: Vec<String> = general_advice(risk_level)
        .iter()
        .map(|s| s.to_string())
        .collect();
    for factor in &risk_factors {
        recommendations.push(factor_advice(factor.factor_type).to_string());
    }

    let data_sources = sources.available();

    debug!(
        "Aggregated {:.1} ({}) seismic={:.2} weather={:.2} demo={:.2} geo={:.2} muni={:.2} sources={}",
        overall_score,
        risk_level,
        seismic,
        weather,
        demographic,
        geological,
        municipal,
        data_sources.len()
    );

    AggregateResult {
        location: location.clone(),
        overall_score,
        risk_level,
        risk_breakdown,
        risk_factors,
        recommendations,
        data_sources,
        contributions,
        timestamp,
    }
}

fn breakdown(sources: &PartialSources) -> BTreeMap<Hazard, f64> {
    let seismic = sources.seismic.signal();
    let weather = sources.weather.signal();

    let mut map = BTreeMap::new();
    map.insert(
        Hazard::Earthquake,
        seismic.map_or(BREAKDOWN_BASELINE, |s| round1(s.earthquake_risk)),
    );
    map.insert(
        Hazard::Flood,
        weather.map_or(BREAKDOWN_BASELINE, |w| round1(w.flood_risk)),
    );
    map.insert(
        Hazard::Fire,
        seismic.map_or(BREAKDOWN_BASELINE, |s| round1(s.fire_risk)),
    );
    map.insert(
        Hazard::Landslide,
        seismic.map_or(BREAKDOWN_BASELINE, |s| round1(s.landslide_risk)),
    );
    map
}

/// Hazard factor rules: trigger (exclusive), factor level and description
const HAZARD_TRIGGERS: [(Hazard, f64, RiskLevel, &str); 4] = [
    (
        Hazard::Earthquake,
        EARTHQUAKE_TRIGGER,
        RiskLevel::High,
        "Location lies in a highly active seismic zone",
    ),
    (
        Hazard::Flood,
        FLOOD_TRIGGER,
        RiskLevel::Medium,
        "Heavy precipitation and drainage load raise flood exposure",
    ),
    (
        Hazard::Fire,
        FIRE_TRIGGER,
        RiskLevel::Medium,
        "Building stock and climate raise fire exposure",
    ),
    (
        Hazard::Landslide,
        LANDSLIDE_TRIGGER,
        RiskLevel::Medium,
        "Slope and soil conditions are prone to landslides",
    ),
];

fn risk_factors(sources: &PartialSources, breakdown: &BTreeMap<Hazard, f64>) -> Vec<RiskFactor> {
    let mut factors: Vec<RiskFactor> = HAZARD_TRIGGERS
        .into_iter()
        .filter_map(|(hazard, trigger, level, description)| {
            let score = breakdown.get(&hazard).copied().unwrap_or(BREAKDOWN_BASELINE);
            (score > trigger).then(|| RiskFactor {
                factor_type: hazard.into(),
                score,
                level,
                description: description.to_string(),
            })
        })
        .collect();

    if let Some(geo) = sources.geological.signal() {
        let geological = geo.risk();
        if geological > GEOLOGICAL_TRIGGER {
            factors.push(RiskFactor {
                factor_type: FactorType::Other,
                score: geological,
                level: RiskLevel::Medium,
                description: format!(
                    "Soft ground {:.0} km from an active fault amplifies shaking",
                    geo.fault_distance_km
                ),
            });
        }
    }

    factors
}
