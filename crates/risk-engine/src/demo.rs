//! Synthetic data shaped exactly like live responses
//!
//! Demo analyses are built from random source readings run through the
//! real aggregator, so every invariant of a live result also holds here.

use crate::aggregator::{aggregate_at, AggregateResult};
use crate::map::{MapCatalog, MapPoint};
use crate::sources::{
    BuildingAge, Density, DemographicSignal, GeologicalSignal, Income, Infrastructure,
    MunicipalSignal, PartialSources, SeismicSignal, SoilType, SourceReading, WeatherSignal,
};
use crate::{round1, Location};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Maximum jitter applied to catalog scores in demo map data
const MAP_JITTER: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DemoKind {
    Analysis,
    MapData,
    Activities,
}

impl std::str::FromStr for DemoKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "analysis" => Ok(DemoKind::Analysis),
            "map-data" => Ok(DemoKind::MapData),
            "activities" => Ok(DemoKind::Activities),
            other => Err(format!("unknown demo endpoint: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Analysis,
    Report,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DemoPayload {
    Analysis(AggregateResult),
    MapData(Vec<MapPoint>),
    Activities(Vec<Activity>),
}

pub struct DemoProvider {
    rng: StdRng,
}

impl DemoProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn payload(&mut self, kind: DemoKind, location: &Location) -> DemoPayload {
        match kind {
            DemoKind::Analysis => DemoPayload::Analysis(self.analysis(location)),
            DemoKind::MapData => DemoPayload::MapData(self.map_data()),
            DemoKind::Activities => DemoPayload::Activities(self.activities(Utc::now())),
        }
    }

    /// Random readings for all five sources, tagged as fallback data
    pub fn sources(&mut self) -> PartialSources {
        let rng = &mut self.rng;
        PartialSources {
            seismic: SourceReading::Fallback {
                signal: SeismicSignal {
                    earthquake_risk: round1(rng.gen_range(0.0..100.0)),
                    landslide_risk: round1(rng.gen_range(0.0..100.0)),
                    fire_risk: round1(rng.gen_range(0.0..100.0)),
                    recent_event_count: rng.gen_range(0..20),
                    max_magnitude: None,
                },
            },
            weather: SourceReading::Fallback {
                signal: WeatherSignal {
                    flood_risk: round1(rng.gen_range(0.0..100.0)),
                    heat_risk: round1(rng.gen_range(0.0..100.0)),
                    precipitation_mm: round1(rng.gen_range(0.0..10.0)),
                    temperature_c: round1(rng.gen_range(-5.0..40.0)),
                },
            },
            municipal: SourceReading::Fallback {
                signal: MunicipalSignal {
                    building_age: pick(rng, &[BuildingAge::New, BuildingAge::Old]),
                    infrastructure: pick(
                        rng,
                        &[Infrastructure::Good, Infrastructure::Fair, Infrastructure::Poor],
                    ),
                },
            },
            demographic: SourceReading::Fallback {
                signal: DemographicSignal {
                    density: pick(rng, &[Density::Low, Density::Medium, Density::High]),
                    income: pick(rng, &[Income::Low, Income::Medium, Income::High]),
                },
            },
            geological: SourceReading::Fallback {
                signal: GeologicalSignal {
                    soil_type: pick(rng, &[SoilType::Hard, SoilType::Medium, SoilType::Soft]),
                    fault_distance_km: round1(rng.gen_range(1.0..120.0)),
                },
            },
        }
    }

    pub fn analysis(&mut self, location: &Location) -> AggregateResult {
        let sources = self.sources();
        aggregate_at(&sources, location, Utc::now())
    }

    /// Seed catalog with each score nudged by a bounded random offset
    pub fn map_data(&mut self) -> Vec<MapPoint> {
        MapCatalog::seeded()
            .into_points()
            .into_iter()
            .map(|mut p| {
                let jitter = self.rng.gen_range(-MAP_JITTER..=MAP_JITTER);
                p.risk_score = round1((p.risk_score + jitter).clamp(0.0, 100.0));
                p
            })
            .collect()
    }

    pub fn activities(&mut self, now: DateTime<Utc>) -> Vec<Activity> {
        let mut items = vec![
            Activity {
                title: "Istanbul Beyoglu risk analysis".to_string(),
                description: "Comprehensive risk analysis completed".to_string(),
                kind: ActivityKind::Analysis,
                created_at: now - Duration::hours(1),
            },
            Activity {
                title: "Ankara Cankaya report".to_string(),
                description: "PDF report generated".to_string(),
                kind: ActivityKind::Report,
                created_at: now - Duration::hours(2),
            },
            Activity {
                title: "Izmir Konak analysis".to_string(),
                description: "High risk level detected".to_string(),
                kind: ActivityKind::Analysis,
                created_at: now - Duration::hours(3),
            },
        ];
        let keep = self.rng.gen_range(1..=items.len());
        items.truncate(keep);
        items
    }
}

fn pick<T: Copy>(rng: &mut StdRng, options: &[T]) -> T {
    // options are never empty
    *options.choose(rng).unwrap_or(&options[0])
}
