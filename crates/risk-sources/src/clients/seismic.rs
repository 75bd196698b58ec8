//! AFAD event filter client

use super::check_status;
use crate::{Result, SourceError};
use risk_engine::regional::RegionalProfile;
use risk_engine::sources::{clamp_score, SeismicSignal};
use risk_engine::Location;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Search radius around the location, in km
pub const SEARCH_RADIUS_KM: u32 = 100;
pub const EVENT_LIMIT: u32 = 50;

/// Event count beyond which extra events add nothing
const EVENT_COUNT_CAP: u32 = 50;
const REGIONAL_WEIGHT: f64 = 0.6;
const PER_EVENT: f64 = 0.8;
const PER_MAGNITUDE_ABOVE_3: f64 = 10.0;

#[derive(Debug, Serialize)]
struct EventFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    maxrad: Option<u32>,
    limit: u32,
}

/// AFAD sends magnitudes either as numbers or numeric strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Magnitude {
    Number(f64),
    Text(String),
}

impl Magnitude {
    fn value(&self) -> Option<f64> {
        match self {
            Magnitude::Number(m) => Some(*m),
            Magnitude::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(default)]
    magnitude: Option<Magnitude>,
}

pub struct SeismicClient {
    client: reqwest::Client,
    url: String,
}

impl SeismicClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Recent events near the location blended with the regional baseline
    pub async fn fetch(
        &self,
        location: &Location,
        regional: &RegionalProfile,
    ) -> Result<SeismicSignal> {
        let filter = EventFilter {
            lat: Some(location.latitude),
            lon: Some(location.longitude),
            maxrad: Some(SEARCH_RADIUS_KM),
            limit: EVENT_LIMIT,
        };
        let response = self.client.post(&self.url).json(&filter).send().await?;
        let events: Vec<Event> = check_status(response)?.json().await?;

        let count = events.len() as u32;
        let max_magnitude = events
            .iter()
            .filter_map(|e| e.magnitude.as_ref().and_then(Magnitude::value))
            .fold(None, |acc: Option<f64>, m| Some(acc.map_or(m, |a| a.max(m))));

        debug!(
            "AFAD returned {} events near {:.3},{:.3} (max M{:?})",
            count, location.latitude, location.longitude, max_magnitude
        );

        Ok(seismic_signal(regional, count, max_magnitude))
    }

    /// Raw event list for passthrough
    pub async fn raw_events(&self, limit: u32) -> Result<serde_json::Value> {
        let filter = EventFilter {
            lat: None,
            lon: None,
            maxrad: None,
            limit,
        };
        let response = self.client.post(&self.url).json(&filter).send().await?;
        check_status(response)?
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))
    }
}

/// Blend regional earthquake exposure with recent activity
pub fn seismic_signal(
    regional: &RegionalProfile,
    event_count: u32,
    max_magnitude: Option<f64>,
) -> SeismicSignal {
    let activity = PER_EVENT * event_count.min(EVENT_COUNT_CAP) as f64;
    let magnitude = max_magnitude
        .map(|m| PER_MAGNITUDE_ABOVE_3 * (m - 3.0).max(0.0))
        .unwrap_or(0.0);

    SeismicSignal {
        earthquake_risk: clamp_score(REGIONAL_WEIGHT * regional.earthquake + activity + magnitude),
        landslide_risk: regional.landslide,
        fire_risk: regional.fire,
        recent_event_count: event_count,
        max_magnitude,
    }
}
