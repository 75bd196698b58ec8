//! OpenWeatherMap current-weather client

use super::check_status;
use crate::{Result, SourceError};
use risk_engine::regional::RegionalProfile;
use risk_engine::sources::{clamp_score, WeatherSignal};
use risk_engine::Location;
use serde::Deserialize;
use tracing::debug;

const REGIONAL_WEIGHT: f64 = 0.5;
const PER_MM_RAIN: f64 = 8.0;
const HUMIDITY_BASE: f64 = 60.0;
const PER_HUMIDITY_POINT: f64 = 0.5;
const HEAT_BASE_C: f64 = 25.0;
const PER_DEGREE: f64 = 5.0;

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    main: MainBlock,
    #[serde(default)]
    rain: Option<RainBlock>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct RainBlock {
    #[serde(rename = "1h", default)]
    one_hour: f64,
}

pub struct WeatherClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl WeatherClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            url: url.into(),
            api_key,
        }
    }

    async fn current(&self, lat: f64, lon: f64) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .get(&self.url)
            .query(&[("lat", lat), ("lon", lon)])
            .query(&[("units", "metric")]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("appid", key.as_str())]);
        }
        check_status(request.send().await?)
    }

    pub async fn fetch(
        &self,
        location: &Location,
        regional: &RegionalProfile,
    ) -> Result<WeatherSignal> {
        let data: CurrentWeather = self
            .current(location.latitude, location.longitude)
            .await?
            .json()
            .await?;
        let rain = data.rain.map(|r| r.one_hour).unwrap_or(0.0);

        debug!(
            "Weather at {:.3},{:.3}: {:.1}C, {:.0}% humidity, {:.1}mm/h",
            location.latitude, location.longitude, data.main.temp, data.main.humidity, rain
        );

        Ok(weather_signal(regional, data.main.temp, data.main.humidity, rain))
    }

    /// Raw current-weather document for passthrough
    pub async fn raw_current(&self, lat: f64, lon: f64) -> Result<serde_json::Value> {
        self.current(lat, lon)
            .await?
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))
    }
}

pub fn weather_signal(
    regional: &RegionalProfile,
    temperature_c: f64,
    humidity: f64,
    rain_1h_mm: f64,
) -> WeatherSignal {
    let flood = REGIONAL_WEIGHT * regional.flood
        + PER_MM_RAIN * rain_1h_mm
        + PER_HUMIDITY_POINT * (humidity - HUMIDITY_BASE).max(0.0);
    let heat = PER_DEGREE * (temperature_c - HEAT_BASE_C);

    WeatherSignal {
        flood_risk: clamp_score(flood),
        heat_risk: clamp_score(heat),
        precipitation_mm: rain_1h_mm,
        temperature_c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_engine::regional::Region;

    #[test]
    fn test_parse_without_rain_block() {
        let data: CurrentWeather =
            serde_json::from_str(r#"{"main": {"temp": 31.0, "humidity": 40}, "name": "Adana"}"#)
                .unwrap();
        assert!(data.rain.is_none());
        assert_eq!(data.main.temp, 31.0);
    }

    #[test]
    fn test_rainy_humid_day() {
        // 22.5 + 8*2 + 0.5*30
        let signal = weather_signal(Region::Istanbul.profile(), 18.0, 90.0, 2.0);
        assert!((signal.flood_risk - 53.5).abs() < 1e-9);
        assert_eq!(signal.heat_risk, 0.0);
    }

    #[test]
    fn test_heatwave() {
        let signal = weather_signal(Region::Default.profile(), 39.0, 20.0, 0.0);
        assert!((signal.heat_risk - 70.0).abs() < 1e-9);
        assert!((signal.flood_risk - 12.5).abs() < 1e-9);

        let extreme = weather_signal(Region::Default.profile(), 50.0, 20.0, 0.0);
        assert_eq!(extreme.heat_risk, 100.0);
    }
}
