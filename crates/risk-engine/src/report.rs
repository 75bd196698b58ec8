//! Detailed reports and map visualization payloads

use crate::aggregator::AggregateResult;
use crate::recommendations::{narrative, prioritized, Recommendation, PREVENTION_TIPS};
use crate::{Hazard, RiskLevel};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate result enriched with prioritized advice and narratives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedReport {
    pub result: AggregateResult,
    pub recommendations: Vec<Recommendation>,
    pub analysis: BTreeMap<Hazard, String>,
    pub prevention_tips: Vec<String>,
}

impl DetailedReport {
    pub fn from_result(result: AggregateResult) -> Self {
        let scores: Vec<(Hazard, f64)> = Hazard::ALL
            .into_iter()
            .map(|h| (h, result.hazard_score(h)))
            .collect();

        let analysis = scores
            .iter()
            .map(|(h, score)| (*h, narrative(*h, RiskLevel::from_score(*score)).to_string()))
            .collect();

        Self {
            recommendations: prioritized(scores),
            analysis,
            prevention_tips: PREVENTION_TIPS.iter().map(|s| s.to_string()).collect(),
            result,
        }
    }
}

/// One weighted point of a hazard heat layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatPoint {
    pub lat: f64,
    pub lon: f64,
    pub intensity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visualization {
    pub address: Option<String>,
    pub risk_map_data: FeatureCollection,
    pub heat_map_layers: BTreeMap<Hazard, Vec<HeatPoint>>,
}

/// Build a single-point GeoJSON layer plus one heat layer per hazard
pub fn visualize(result: &AggregateResult) -> Visualization {
    let loc = &result.location;

    let mut properties = JsonObject::new();
    properties.insert(
        "address".to_string(),
        loc.address
            .clone()
            .map_or(serde_json::Value::Null, serde_json::Value::from),
    );
    properties.insert("overall_risk".to_string(), result.overall_score.into());
    properties.insert("risk_level".to_string(), result.risk_level.as_str().into());

    let feature = Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![loc.longitude, loc.latitude]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    };

    let heat_map_layers = Hazard::ALL
        .into_iter()
        .map(|h| {
            (
                h,
                vec![HeatPoint {
                    lat: loc.latitude,
                    lon: loc.longitude,
                    intensity: result.hazard_score(h),
                }],
            )
        })
        .collect();

    Visualization {
        address: loc.address.clone(),
        risk_map_data: FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        },
        heat_map_layers,
    }
}
