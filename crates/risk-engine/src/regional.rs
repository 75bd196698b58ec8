//! Regional static risk tables
//!
//! Used whenever a live source cannot be reached. A location is matched
//! against three metropolitan bounding boxes; anything outside them gets
//! the generic national row.

use crate::sources::{
    BuildingAge, Density, DemographicSignal, GeologicalSignal, Income, Infrastructure,
    MunicipalSignal, PartialSources, SeismicSignal, SoilType, SourceReading, WeatherSignal,
};
use crate::Location;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Istanbul,
    Ankara,
    Izmir,
    Default,
}

/// Metropolitan bounding boxes (lat_min, lat_max, lng_min, lng_max, region)
const REGION_BOUNDS: &[(f64, f64, f64, f64, Region)] = &[
    (40.8, 41.3, 28.5, 29.5, Region::Istanbul),
    (39.7, 40.1, 32.5, 33.1, Region::Ankara),
    (38.2, 38.6, 26.9, 27.4, Region::Izmir),
];

impl Region {
    /// First bounding box containing the point, or the generic default
    pub fn locate(lat: f64, lng: f64) -> Self {
        REGION_BOUNDS
            .iter()
            .find(|(lat_min, lat_max, lng_min, lng_max, _)| {
                (*lat_min..=*lat_max).contains(&lat) && (*lng_min..=*lng_max).contains(&lng)
            })
            .map(|(_, _, _, _, region)| *region)
            .unwrap_or(Region::Default)
    }

    /// Metro named by `name`, ignoring case; `None` for anything else
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "istanbul" => Some(Region::Istanbul),
            "ankara" => Some(Region::Ankara),
            "izmir" => Some(Region::Izmir),
            _ => None,
        }
    }

    pub fn of(location: &Location) -> Self {
        Self::locate(location.latitude, location.longitude)
    }

    pub fn profile(&self) -> &'static RegionalProfile {
        match self {
            Region::Istanbul => &ISTANBUL,
            Region::Ankara => &ANKARA,
            Region::Izmir => &IZMIR,
            Region::Default => &DEFAULT,
        }
    }
}

/// One row of the static table, covering all five sources
#[derive(Debug, Clone)]
pub struct RegionalProfile {
    pub earthquake: f64,
    pub landslide: f64,
    pub fire: f64,
    pub recent_events: u32,
    pub flood: f64,
    pub heat: f64,
    pub precipitation_mm: f64,
    pub temperature_c: f64,
    pub density: Density,
    pub income: Income,
    pub soil_type: SoilType,
    pub fault_distance_km: f64,
    pub building_age: BuildingAge,
    pub infrastructure: Infrastructure,
}

const ISTANBUL: RegionalProfile = RegionalProfile {
    earthquake: 85.0,
    landslide: 40.0,
    fire: 35.0,
    recent_events: 12,
    flood: 45.0,
    heat: 25.0,
    precipitation_mm: 2.5,
    temperature_c: 18.0,
    density: Density::High,
    income: Income::Medium,
    soil_type: SoilType::Soft,
    fault_distance_km: 5.0,
    building_age: BuildingAge::Old,
    infrastructure: Infrastructure::Poor,
};

const ANKARA: RegionalProfile = RegionalProfile {
    earthquake: 45.0,
    landslide: 25.0,
    fire: 30.0,
    recent_events: 3,
    flood: 20.0,
    heat: 35.0,
    precipitation_mm: 0.8,
    temperature_c: 14.0,
    density: Density::High,
    income: Income::High,
    soil_type: SoilType::Medium,
    fault_distance_km: 60.0,
    building_age: BuildingAge::New,
    infrastructure: Infrastructure::Good,
};

const IZMIR: RegionalProfile = RegionalProfile {
    earthquake: 75.0,
    landslide: 30.0,
    fire: 45.0,
    recent_events: 9,
    flood: 35.0,
    heat: 45.0,
    precipitation_mm: 1.2,
    temperature_c: 22.0,
    density: Density::Medium,
    income: Income::Medium,
    soil_type: SoilType::Soft,
    fault_distance_km: 15.0,
    building_age: BuildingAge::Old,
    infrastructure: Infrastructure::Fair,
};

const DEFAULT: RegionalProfile = RegionalProfile {
    earthquake: 50.0,
    landslide: 20.0,
    fire: 25.0,
    recent_events: 4,
    flood: 25.0,
    heat: 30.0,
    precipitation_mm: 1.0,
    temperature_c: 16.0,
    density: Density::Low,
    income: Income::Medium,
    soil_type: SoilType::Medium,
    fault_distance_km: 80.0,
    building_age: BuildingAge::New,
    infrastructure: Infrastructure::Fair,
};

impl RegionalProfile {
    pub fn seismic(&self) -> SeismicSignal {
        SeismicSignal {
            earthquake_risk: self.earthquake,
            landslide_risk: self.landslide,
            fire_risk: self.fire,
            recent_event_count: self.recent_events,
            max_magnitude: None,
        }
    }

    pub fn weather(&self) -> WeatherSignal {
        WeatherSignal {
            flood_risk: self.flood,
            heat_risk: self.heat,
            precipitation_mm: self.precipitation_mm,
            temperature_c: self.temperature_c,
        }
    }

    pub fn demographic(&self) -> DemographicSignal {
        DemographicSignal {
            density: self.density,
            income: self.income,
        }
    }

    pub fn geological(&self) -> GeologicalSignal {
        GeologicalSignal {
            soil_type: self.soil_type,
            fault_distance_km: self.fault_distance_km,
        }
    }

    pub fn municipal(&self) -> MunicipalSignal {
        MunicipalSignal {
            building_age: self.building_age,
            infrastructure: self.infrastructure,
        }
    }

    /// Every source filled from this row, tagged as fallback
    pub fn fallback_sources(&self) -> PartialSources {
        PartialSources {
            seismic: SourceReading::Fallback { signal: self.seismic() },
            weather: SourceReading::Fallback { signal: self.weather() },
            municipal: SourceReading::Fallback { signal: self.municipal() },
            demographic: SourceReading::Fallback { signal: self.demographic() },
            geological: SourceReading::Fallback { signal: self.geological() },
        }
    }
}
