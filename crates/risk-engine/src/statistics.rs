//! Regional risk statistics for partner clients

use crate::aggregator::AggregateResult;
use crate::regional::Region;
use crate::{round1, Hazard, RiskLevel};
use serde::{Deserialize, Serialize};

/// Label used when no region filter is applied
pub const NATIONAL_REGION: &str = "Turkey";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskStatistics {
    pub region: String,
    pub average_earthquake_risk: f64,
    pub average_flood_risk: f64,
    pub average_fire_risk: f64,
    pub average_landslide_risk: f64,
    pub total_analyzed_addresses: u32,
    /// Share of places with at least one hazard in the high band
    pub high_risk_percentage: f64,
}

/// Average the results inside `region` (all of them when `None`)
pub fn summarize(
    region: Option<Region>,
    results: &[AggregateResult],
    total_analyzed: u32,
) -> RiskStatistics {
    let selected: Vec<&AggregateResult> = results
        .iter()
        .filter(|r| region.map_or(true, |want| Region::of(&r.location) == want))
        .collect();

    let average = |hazard: Hazard| {
        if selected.is_empty() {
            return 0.0;
        }
        round1(selected.iter().map(|r| r.hazard_score(hazard)).sum::<f64>() / selected.len() as f64)
    };
    let high = selected
        .iter()
        .filter(|r| {
            Hazard::ALL
                .into_iter()
                .any(|h| RiskLevel::from_score(r.hazard_score(h)) == RiskLevel::High)
        })
        .count();
    let high_risk_percentage = if selected.is_empty() {
        0.0
    } else {
        round1(100.0 * high as f64 / selected.len() as f64)
    };

    RiskStatistics {
        region: region.map_or_else(|| NATIONAL_REGION.to_string(), |r| format!("{:?}", r)),
        average_earthquake_risk: average(Hazard::Earthquake),
        average_flood_risk: average(Hazard::Flood),
        average_fire_risk: average(Hazard::Fire),
        average_landslide_risk: average(Hazard::Landslide),
        total_analyzed_addresses: total_analyzed,
        high_risk_percentage,
    }
}
