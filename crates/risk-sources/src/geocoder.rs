//! Address resolution
//!
//! Queries a Nominatim-style search endpoint first. When that fails or
//! finds nothing, the address is matched against a small table of major
//! cities, and when that misses too the national centroid is returned.
//! `resolve` never fails.

use crate::{Result, SourceError};
use risk_engine::{Location, RiskError};
use serde::Deserialize;
use tracing::{debug, warn};

/// Major cities checked by substring when the service cannot help
pub const CITY_TABLE: &[(&str, f64, f64)] = &[
    ("istanbul", 41.0082, 28.9784),
    ("ankara", 39.9334, 32.8597),
    ("izmir", 38.4237, 27.1428),
    ("bursa", 40.1885, 29.0610),
    ("antalya", 36.8969, 30.7133),
    ("adana", 37.0000, 35.3213),
    ("konya", 37.8746, 32.4932),
    ("gaziantep", 37.0662, 37.3833),
];

#[derive(Debug, Deserialize)]
struct NominatimCandidate {
    lat: String,
    lon: String,
}

/// How an address was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Service,
    CityTable,
    Centroid,
}

pub struct Geocoder {
    client: reqwest::Client,
    service_url: Option<String>,
    country_qualifier: String,
}

impl Geocoder {
    pub fn new(
        client: reqwest::Client,
        service_url: Option<String>,
        country_qualifier: impl Into<String>,
    ) -> Self {
        Self {
            client,
            service_url,
            country_qualifier: country_qualifier.into(),
        }
    }

    /// City table and centroid only
    pub fn offline() -> Self {
        Self::new(reqwest::Client::new(), None, "Turkey")
    }

    pub async fn resolve(&self, address: &str) -> Location {
        self.resolve_with(address).await.0
    }

    /// Resolve via the service or city table; the centroid counts as a failure
    pub async fn resolve_strict(&self, address: &str) -> risk_engine::Result<Location> {
        match self.resolve_with(address).await {
            (_, Resolution::Centroid) => Err(RiskError::GeocodeFailed(address.trim().to_string())),
            (location, _) => Ok(location),
        }
    }

    /// Resolve and report which path produced the coordinates
    pub async fn resolve_with(&self, address: &str) -> (Location, Resolution) {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            debug!("Empty address, using national centroid");
            return (Location::centroid(), Resolution::Centroid);
        }

        if let Some(url) = &self.service_url {
            match self.query_service(url, trimmed).await {
                Ok(Some((lat, lon))) => {
                    debug!("Geocoded '{}' via service: {:.4}, {:.4}", trimmed, lat, lon);
                    return (
                        Location::new(lat, lon).with_address(trimmed),
                        Resolution::Service,
                    );
                }
                Ok(None) => debug!("Geocoding service found nothing for '{}'", trimmed),
                Err(e) => warn!("Geocoding service failed for '{}': {}", trimmed, e),
            }
        }

        match match_city(trimmed) {
            Some((lat, lon)) => {
                debug!("Geocoded '{}' from city table", trimmed);
                (
                    Location::new(lat, lon).with_address(trimmed),
                    Resolution::CityTable,
                )
            }
            None => {
                debug!("No city match for '{}', using national centroid", trimmed);
                (
                    Location::centroid().with_address(trimmed),
                    Resolution::Centroid,
                )
            }
        }
    }

    async fn query_service(&self, url: &str, address: &str) -> Result<Option<(f64, f64)>> {
        let query = format!("{}, {}", address, self.country_qualifier);
        let response = self
            .client
            .get(url)
            .query(&[("format", "json"), ("q", query.as_str()), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }

        let candidates: Vec<NominatimCandidate> = response.json().await?;
        let Some(first) = candidates.first() else {
            return Ok(None);
        };

        let lat = first
            .lat
            .parse::<f64>()
            .map_err(|e| SourceError::Parse(format!("lat '{}': {}", first.lat, e)))?;
        let lon = first
            .lon
            .parse::<f64>()
            .map_err(|e| SourceError::Parse(format!("lon '{}': {}", first.lon, e)))?;
        Ok(Some((lat, lon)))
    }
}

/// Fold Turkish letters to ASCII and lowercase
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'İ' | 'I' | 'ı' => 'i',
            'Ş' | 'ş' => 's',
            'Ğ' | 'ğ' => 'g',
            'Ü' | 'ü' => 'u',
            'Ö' | 'ö' => 'o',
            'Ç' | 'ç' => 'c',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// First city in table order whose name occurs in the address
pub fn match_city(address: &str) -> Option<(f64, f64)> {
    let needle = normalize(address);
    CITY_TABLE
        .iter()
        .find(|(name, _, _)| needle.contains(name))
        .map(|(_, lat, lon)| (*lat, *lon))
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_engine::TURKEY_CENTROID;

    #[test]
    fn test_normalize_turkish() {
        assert_eq!(normalize("İSTANBUL"), "istanbul");
        assert_eq!(normalize("Beşiktaş, İzmir"), "besiktas, izmir");
        assert_eq!(normalize("Çankaya Gölbaşı"), "cankaya golbasi");
    }

    #[test]
    fn test_match_city() {
        assert_eq!(match_city("Kadıköy, İstanbul"), Some((41.0082, 28.9784)));
        assert_eq!(match_city("ANKARA"), Some((39.9334, 32.8597)));
        assert_eq!(match_city("zzz-unknown-place"), None);
    }

    #[tokio::test]
    async fn test_empty_address_is_centroid() {
        let geocoder = Geocoder::offline();
        let (loc, how) = geocoder.resolve_with("   ").await;
        assert_eq!((loc.latitude, loc.longitude), TURKEY_CENTROID);
        assert_eq!(how, Resolution::Centroid);
        assert!(loc.address.is_none());
    }

    #[tokio::test]
    async fn test_unknown_address_is_centroid() {
        let loc = Geocoder::offline().resolve("zzz-unknown-place").await;
        assert_eq!((loc.latitude, loc.longitude), TURKEY_CENTROID);
        assert_eq!(loc.address.as_deref(), Some("zzz-unknown-place"));
    }

    #[tokio::test]
    async fn test_strict_resolution_rejects_centroid() {
        let geocoder = Geocoder::offline();
        let err = geocoder.resolve_strict(" zzz-unknown-place ").await.unwrap_err();
        assert!(matches!(err, RiskError::GeocodeFailed(ref a) if a == "zzz-unknown-place"));
        assert!(geocoder.resolve_strict("").await.is_err());

        let loc = geocoder.resolve_strict("Bursa").await.unwrap();
        assert_eq!((loc.latitude, loc.longitude), (40.1885, 29.0610));
    }

    #[tokio::test]
    async fn test_unreachable_service_falls_back_to_table() {
        // Port 9 (discard) is not listening
        let geocoder = Geocoder::new(
            reqwest::Client::new(),
            Some("http://127.0.0.1:9/search".to_string()),
            "Turkey",
        );
        let (loc, how) = geocoder.resolve_with("Izmir Konak").await;
        assert_eq!(how, Resolution::CityTable);
        assert_eq!((loc.latitude, loc.longitude), (38.4237, 27.1428));
    }
}
