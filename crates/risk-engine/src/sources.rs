//! Per-source risk signals and their availability
//!
//! Each of the five providers yields a typed signal. A reading records
//! whether it came from the live upstream, from the regional static table,
//! or not at all.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The five independent risk-signal providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Seismic,
    Weather,
    Municipal,
    Demographic,
    Geological,
}

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Seismic,
        SourceKind::Weather,
        SourceKind::Municipal,
        SourceKind::Demographic,
        SourceKind::Geological,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Seismic => "seismic",
            SourceKind::Weather => "weather",
            SourceKind::Municipal => "municipal",
            SourceKind::Demographic => "demographic",
            SourceKind::Geological => "geological",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one source query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceReading<T> {
    /// Parsed from a successful upstream response
    Live { signal: T },
    /// Substituted from the regional static table after a failed or absent upstream
    Fallback { signal: T },
    /// No signal; contributes nothing to the score
    Unavailable { reason: String },
}

impl<T> SourceReading<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        SourceReading::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn signal(&self) -> Option<&T> {
        match self {
            SourceReading::Live { signal } | SourceReading::Fallback { signal } => Some(signal),
            SourceReading::Unavailable { .. } => None,
        }
    }

    pub fn signal_mut(&mut self) -> Option<&mut T> {
        match self {
            SourceReading::Live { signal } | SourceReading::Fallback { signal } => Some(signal),
            SourceReading::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, SourceReading::Unavailable { .. })
    }

    pub fn is_live(&self) -> bool {
        matches!(self, SourceReading::Live { .. })
    }
}

// ---- Signals ----

/// Seismic history signal (earthquake, landslide and fire components)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeismicSignal {
    pub earthquake_risk: f64,
    pub landslide_risk: f64,
    pub fire_risk: f64,
    /// Recent events recorded near the location
    pub recent_event_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_magnitude: Option<f64>,
}

/// Weather and climate signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSignal {
    pub flood_risk: f64,
    pub heat_risk: f64,
    /// Precipitation over the last hour (mm)
    pub precipitation_mm: f64,
    pub temperature_c: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Density {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Income {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicSignal {
    pub density: Density,
    pub income: Income,
}

impl DemographicSignal {
    pub const CAP: f64 = 50.0;

    /// Density and income buckets summed, capped at 50
    pub fn risk(&self) -> f64 {
        let density: f64 = match self.density {
            Density::High => 30.0,
            Density::Medium => 15.0,
            Density::Low => 0.0,
        };
        let income: f64 = match self.income {
            Income::Low => 20.0,
            Income::Medium => 10.0,
            Income::High => 0.0,
        };
        (density + income).min(Self::CAP)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoilType {
    Soft,
    Medium,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeologicalSignal {
    pub soil_type: SoilType,
    pub fault_distance_km: f64,
}

impl GeologicalSignal {
    pub const CAP: f64 = 55.0;

    /// Soil bucket plus fault proximity bonus, capped at 55
    pub fn risk(&self) -> f64 {
        let soil: f64 = match self.soil_type {
            SoilType::Soft => 25.0,
            SoilType::Medium => 10.0,
            SoilType::Hard => 0.0,
        };
        let fault: f64 = if self.fault_distance_km < 10.0 {
            30.0
        } else if self.fault_distance_km < 50.0 {
            15.0
        } else {
            0.0
        };
        (soil + fault).min(Self::CAP)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildingAge {
    New,
    Old,
}

impl BuildingAge {
    /// Buildings of 30 years or more count as old stock
    pub const OLD_AFTER_YEARS: u32 = 30;

    pub fn from_years(years: u32) -> Self {
        if years >= Self::OLD_AFTER_YEARS {
            BuildingAge::Old
        } else {
            BuildingAge::New
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Infrastructure {
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MunicipalSignal {
    pub building_age: BuildingAge,
    pub infrastructure: Infrastructure,
}

impl MunicipalSignal {
    pub const CAP: f64 = 35.0;

    /// Old building stock and poor infrastructure, capped at 35
    pub fn risk(&self) -> f64 {
        let age: f64 = match self.building_age {
            BuildingAge::Old => 20.0,
            BuildingAge::New => 0.0,
        };
        let infra: f64 = match self.infrastructure {
            Infrastructure::Poor => 15.0,
            Infrastructure::Fair | Infrastructure::Good => 0.0,
        };
        (age + infra).min(Self::CAP)
    }
}

/// All five readings gathered for one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialSources {
    pub seismic: SourceReading<SeismicSignal>,
    pub weather: SourceReading<WeatherSignal>,
    pub municipal: SourceReading<MunicipalSignal>,
    pub demographic: SourceReading<DemographicSignal>,
    pub geological: SourceReading<GeologicalSignal>,
}

impl PartialSources {
    /// Every source marked unavailable with the same reason
    pub fn all_unavailable(reason: &str) -> Self {
        Self {
            seismic: SourceReading::unavailable(reason),
            weather: SourceReading::unavailable(reason),
            municipal: SourceReading::unavailable(reason),
            demographic: SourceReading::unavailable(reason),
            geological: SourceReading::unavailable(reason),
        }
    }

    pub fn is_available(&self, kind: SourceKind) -> bool {
        match kind {
            SourceKind::Seismic => self.seismic.is_available(),
            SourceKind::Weather => self.weather.is_available(),
            SourceKind::Municipal => self.municipal.is_available(),
            SourceKind::Demographic => self.demographic.is_available(),
            SourceKind::Geological => self.geological.is_available(),
        }
    }

    pub fn is_live(&self, kind: SourceKind) -> bool {
        match kind {
            SourceKind::Seismic => self.seismic.is_live(),
            SourceKind::Weather => self.weather.is_live(),
            SourceKind::Municipal => self.municipal.is_live(),
            SourceKind::Demographic => self.demographic.is_live(),
            SourceKind::Geological => self.geological.is_live(),
        }
    }

    /// Names of the sources that produced a signal
    pub fn available(&self) -> BTreeSet<SourceKind> {
        SourceKind::ALL
            .into_iter()
            .filter(|k| self.is_available(*k))
            .collect()
    }

    pub fn all_live(&self) -> bool {
        SourceKind::ALL.into_iter().all(|k| self.is_live(k))
    }

    /// Flattened subtype scores keyed by subtype name ("earthquake_risk", ...)
    pub fn subtype_scores(&self) -> BTreeMap<&'static str, f64> {
        let mut scores = BTreeMap::new();
        if let Some(s) = self.seismic.signal() {
            scores.insert("earthquake_risk", s.earthquake_risk);
            scores.insert("landslide_risk", s.landslide_risk);
            scores.insert("fire_risk", s.fire_risk);
        }
        if let Some(w) = self.weather.signal() {
            scores.insert("flood_risk", w.flood_risk);
            scores.insert("heat_risk", w.heat_risk);
        }
        if let Some(d) = self.demographic.signal() {
            scores.insert("demographic_risk", d.risk());
        }
        if let Some(g) = self.geological.signal() {
            scores.insert("geological_risk", g.risk());
        }
        if let Some(m) = self.municipal.signal() {
            scores.insert("municipal_risk", m.risk());
        }
        scores
    }

    /// Clamp every numeric component into [0, 100]
    pub fn normalized(mut self) -> Self {
        if let Some(s) = self.seismic.signal_mut() {
            s.earthquake_risk = clamp_score(s.earthquake_risk);
            s.landslide_risk = clamp_score(s.landslide_risk);
            s.fire_risk = clamp_score(s.fire_risk);
        }
        if let Some(w) = self.weather.signal_mut() {
            w.flood_risk = clamp_score(w.flood_risk);
            w.heat_risk = clamp_score(w.heat_risk);
        }
        if let Some(g) = self.geological.signal_mut() {
            if !g.fault_distance_km.is_finite() || g.fault_distance_km < 0.0 {
                g.fault_distance_km = f64::MAX;
            }
        }
        self
    }
}

/// Clamp a component score into [0, 100]; non-finite values collapse to 0
pub fn clamp_score(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regional::Region;

    #[test]
    fn test_subtype_scores_skip_unavailable() {
        let mut sources = Region::Istanbul.profile().fallback_sources();
        sources.weather = SourceReading::unavailable("down");
        let scores = sources.subtype_scores();

        let keys: Vec<_> = scores.keys().copied().collect();
        assert_eq!(
            keys,
            vec![
                "demographic_risk",
                "earthquake_risk",
                "fire_risk",
                "geological_risk",
                "landslide_risk",
                "municipal_risk",
            ]
        );
        assert_eq!(scores["earthquake_risk"], 85.0);
        assert_eq!(scores["geological_risk"], 55.0);
        assert_eq!(scores["municipal_risk"], 35.0);
    }

    #[test]
    fn test_demographic_buckets() {
        let d = DemographicSignal {
            density: Density::High,
            income: Income::Medium,
        };
        assert_eq!(d.risk(), 40.0);
        let d = DemographicSignal {
            density: Density::High,
            income: Income::Low,
        };
        assert_eq!(d.risk(), 50.0);
    }

    #[test]
    fn test_geological_fault_bonus() {
        let near = GeologicalSignal {
            soil_type: SoilType::Soft,
            fault_distance_km: 5.0,
        };
        assert_eq!(near.risk(), 55.0);

        let mid = GeologicalSignal {
            soil_type: SoilType::Medium,
            fault_distance_km: 10.0,
        };
        assert_eq!(mid.risk(), 25.0);

        let far = GeologicalSignal {
            soil_type: SoilType::Hard,
            fault_distance_km: 50.0,
        };
        assert_eq!(far.risk(), 0.0);
    }

    #[test]
    fn test_municipal_cap() {
        let m = MunicipalSignal {
            building_age: BuildingAge::Old,
            infrastructure: Infrastructure::Poor,
        };
        assert_eq!(m.risk(), 35.0);
        assert_eq!(BuildingAge::from_years(29), BuildingAge::New);
        assert_eq!(BuildingAge::from_years(30), BuildingAge::Old);
    }

    #[test]
    fn test_normalized_clamps_components() {
        let mut sources = PartialSources::all_unavailable("test");
        sources.seismic = SourceReading::Live {
            signal: SeismicSignal {
                earthquake_risk: 140.0,
                landslide_risk: -3.0,
                fire_risk: f64::NAN,
                recent_event_count: 0,
                max_magnitude: None,
            },
        };
        let sources = sources.normalized();
        let s = sources.seismic.signal().unwrap();
        assert_eq!(s.earthquake_risk, 100.0);
        assert_eq!(s.landslide_risk, 0.0);
        assert_eq!(s.fire_risk, 0.0);
    }

    #[test]
    fn test_reading_serializes_with_status_tag() {
        let reading: SourceReading<DemographicSignal> = SourceReading::unavailable("timeout");
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["reason"], "timeout");
    }
}
