//! Zoom-tiered map markers
//!
//! Points carry one of three display tiers. The city tier is always drawn;
//! district markers join at zoom 10 and neighborhood markers at zoom 13.
//! Once a finer tier is active the coarser ones stay on the map, drawn
//! smaller and fainter. Each refresh rebuilds the whole scene.

use crate::aggregator::{aggregate, AggregateResult};
use crate::regional::Region;
use crate::Location;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DISTRICT_MIN_ZOOM: u8 = 10;
pub const NEIGHBORHOOD_MIN_ZOOM: u8 = 13;
pub const MIN_ZOOM: u8 = 1;
pub const MAX_ZOOM: u8 = 18;

pub const EMPHASIZED_OPACITY: f64 = 0.85;
pub const DEEMPHASIZED_OPACITY: f64 = 0.35;
pub const DEEMPHASIZED_RADIUS_FACTOR: f64 = 0.6;

/// Marker color buckets (independent of the risk level thresholds)
pub const SAFE_BELOW: f64 = 30.0;
pub const CAUTION_BELOW: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    City,
    District,
    Neighborhood,
}

impl Tier {
    pub fn min_zoom(&self) -> u8 {
        match self {
            Tier::City => 0,
            Tier::District => DISTRICT_MIN_ZOOM,
            Tier::Neighborhood => NEIGHBORHOOD_MIN_ZOOM,
        }
    }

    pub fn is_active(&self, zoom: u8) -> bool {
        zoom >= self.min_zoom()
    }

    /// Finest tier visible at this zoom
    pub fn finest_at(zoom: u8) -> Self {
        if Tier::Neighborhood.is_active(zoom) {
            Tier::Neighborhood
        } else if Tier::District.is_active(zoom) {
            Tier::District
        } else {
            Tier::City
        }
    }

    pub fn base_radius(&self) -> f64 {
        match self {
            Tier::City => 12.0,
            Tier::District => 8.0,
            Tier::Neighborhood => 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerColor {
    Safe,
    Caution,
    Danger,
}

impl MarkerColor {
    pub fn from_score(score: f64) -> Self {
        if score < SAFE_BELOW {
            MarkerColor::Safe
        } else if score < CAUTION_BELOW {
            MarkerColor::Caution
        } else {
            MarkerColor::Danger
        }
    }

    pub fn hex(&self) -> &'static str {
        match self {
            MarkerColor::Safe => "#28a745",
            MarkerColor::Caution => "#ffc107",
            MarkerColor::Danger => "#dc3545",
        }
    }
}

/// A scored place on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub location: Location,
    pub risk_score: f64,
    pub display_tier: Tier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
}

/// Geographic viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    pub fn contains(&self, location: &Location) -> bool {
        (self.south..=self.north).contains(&location.latitude)
            && (self.west..=self.east).contains(&location.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub location: Location,
    pub risk_score: f64,
    pub tier: Tier,
    pub color: MarkerColor,
    pub radius: f64,
    pub opacity: f64,
    pub emphasized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Build the marker set for a zoom level, optionally clipped to a viewport
pub fn render(points: &[MapPoint], zoom: u8, viewport: Option<&Bounds>) -> Vec<Marker> {
    let finest = Tier::finest_at(zoom);

    points
        .iter()
        .filter(|p| p.display_tier.is_active(zoom))
        .filter(|p| viewport.map_or(true, |b| b.contains(&p.location)))
        .map(|p| {
            let emphasized = p.display_tier == finest;
            let base = p.display_tier.base_radius();
            Marker {
                location: p.location.clone(),
                risk_score: p.risk_score,
                tier: p.display_tier,
                color: MarkerColor::from_score(p.risk_score),
                radius: if emphasized {
                    base
                } else {
                    base * DEEMPHASIZED_RADIUS_FACTOR
                },
                opacity: if emphasized {
                    EMPHASIZED_OPACITY
                } else {
                    DEEMPHASIZED_OPACITY
                },
                emphasized,
                label: p.location.address.clone(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Background {
    Tiles { url: String },
    Plain,
}

/// A fully rendered map frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapScene {
    pub zoom: u8,
    pub background: Background,
    pub markers: Vec<Marker>,
}

impl MapScene {
    pub fn to_geojson(&self) -> FeatureCollection {
        let features = self
            .markers
            .iter()
            .map(|m| {
                let mut properties = JsonObject::new();
                if let Some(label) = &m.label {
                    properties.insert("name".to_string(), label.clone().into());
                }
                properties.insert("risk_score".to_string(), m.risk_score.into());
                properties.insert("tier".to_string(), serde_json::json!(m.tier));
                properties.insert("color".to_string(), m.color.hex().into());
                properties.insert("radius".to_string(), m.radius.into());
                properties.insert("opacity".to_string(), m.opacity.into());

                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(Value::Point(vec![
                        m.location.longitude,
                        m.location.latitude,
                    ]))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

/// Owns the current zoom and the last rendered scene
#[derive(Debug, Clone)]
pub struct MapView {
    zoom: u8,
    viewport: Option<Bounds>,
    tile_url: Option<String>,
    tiles_available: bool,
    scene: Option<MapScene>,
}

impl MapView {
    pub fn new(zoom: u8, tile_url: Option<String>) -> Self {
        Self {
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            viewport: None,
            tile_url,
            tiles_available: true,
            scene: None,
        }
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: u8) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn set_viewport(&mut self, viewport: Option<Bounds>) {
        self.viewport = viewport;
    }

    /// Tile provider failures degrade the background to plain
    pub fn set_tiles_available(&mut self, available: bool) {
        self.tiles_available = available;
    }

    /// Replace the scene wholesale with a fresh render
    pub fn refresh(&mut self, points: &[MapPoint]) -> &MapScene {
        let background = match (&self.tile_url, self.tiles_available) {
            (Some(url), true) => Background::Tiles { url: url.clone() },
            _ => Background::Plain,
        };
        let markers = render(points, self.zoom, self.viewport.as_ref());
        debug!(
            "Map refresh at zoom {}: {} of {} points drawn",
            self.zoom,
            markers.len(),
            points.len()
        );
        self.scene.insert(MapScene {
            zoom: self.zoom,
            background,
            markers,
        })
    }

    pub fn scene(&self) -> Option<&MapScene> {
        self.scene.as_ref()
    }

    pub fn destroy(&mut self) {
        self.scene = None;
    }
}

struct Place {
    name: &'static str,
    parent: Option<&'static str>,
    tier: Tier,
    lat: f64,
    lon: f64,
}

const fn city(name: &'static str, lat: f64, lon: f64) -> Place {
    Place {
        name,
        parent: None,
        tier: Tier::City,
        lat,
        lon,
    }
}

const fn district(name: &'static str, parent: &'static str, lat: f64, lon: f64) -> Place {
    Place {
        name,
        parent: Some(parent),
        tier: Tier::District,
        lat,
        lon,
    }
}

const fn neighborhood(name: &'static str, parent: &'static str, lat: f64, lon: f64) -> Place {
    Place {
        name,
        parent: Some(parent),
        tier: Tier::Neighborhood,
        lat,
        lon,
    }
}

const SEED: &[Place] = &[
    city("Istanbul", 41.0082, 28.9784),
    city("Ankara", 39.9334, 32.8597),
    city("Izmir", 38.4192, 27.1287),
    city("Bursa", 40.1885, 29.0610),
    city("Antalya", 36.8969, 30.7133),
    city("Adana", 37.0000, 35.3213),
    city("Konya", 37.8746, 32.4932),
    city("Gaziantep", 37.0662, 37.3833),
    district("Kadikoy", "Istanbul", 40.9927, 29.0277),
    district("Besiktas", "Istanbul", 41.0422, 29.0083),
    district("Fatih", "Istanbul", 41.0186, 28.9397),
    district("Cankaya", "Ankara", 39.9179, 32.8627),
    district("Kecioren", "Ankara", 39.9833, 32.8667),
    district("Konak", "Izmir", 38.4189, 27.1287),
    district("Karsiyaka", "Izmir", 38.4602, 27.1103),
    neighborhood("Moda", "Kadikoy", 40.9844, 29.0261),
    neighborhood("Fenerbahce", "Kadikoy", 40.9697, 29.0367),
    neighborhood("Levent", "Besiktas", 41.0819, 29.0106),
    neighborhood("Balat", "Fatih", 41.0294, 28.9487),
    neighborhood("Kizilay", "Cankaya", 39.9208, 32.8541),
    neighborhood("Alsancak", "Konak", 38.4375, 27.1427),
];

/// Seed catalog of Turkish places scored through the regional tables
#[derive(Debug, Clone)]
pub struct MapCatalog {
    points: Vec<MapPoint>,
    results: Vec<AggregateResult>,
}

impl MapCatalog {
    pub fn seeded() -> Self {
        let (points, results) = SEED
            .iter()
            .map(|place| {
                let location = Location::new(place.lat, place.lon).with_address(place.name);
                let sources = Region::of(&location).profile().fallback_sources();
                let result = aggregate(&sources, &location);
                let point = MapPoint {
                    risk_score: result.overall_score,
                    location,
                    display_tier: place.tier,
                    parent_name: place.parent.map(str::to_string),
                };
                (point, result)
            })
            .unzip();
        Self { points, results }
    }

    pub fn points(&self) -> &[MapPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<MapPoint> {
        self.points
    }

    /// Full aggregate behind each point, in the same order
    pub fn results(&self) -> &[AggregateResult] {
        &self.results
    }
}

impl Default for MapCatalog {
    fn default() -> Self {
        Self::seeded()
    }
}
