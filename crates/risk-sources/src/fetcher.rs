//! Settle-all multi-source fetcher
//!
//! The five source queries run concurrently on the same task and every one
//! of them is awaited to completion; one failure never cancels the others.
//! Each query makes a single attempt.

use crate::clients::{http_client, BucketClient, KandilliClient, SeismicClient, WeatherClient};
use crate::config::RiskoConfig;
use crate::Result;
use risk_engine::regional::Region;
use risk_engine::sources::{PartialSources, SourceKind, SourceReading};
use risk_engine::{Location, RiskError};
use std::future::Future;
use tracing::{debug, info, warn};

pub struct SourceFetcher {
    seismic: Option<SeismicClient>,
    weather: Option<WeatherClient>,
    demographic: Option<BucketClient>,
    geological: Option<BucketClient>,
    municipal: Option<BucketClient>,
    kandilli: Option<KandilliClient>,
    static_fallback: bool,
}

impl SourceFetcher {
    pub fn from_config(config: &RiskoConfig) -> Result<Self> {
        let client = http_client(config)?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: &RiskoConfig) -> Self {
        let bucket = |url: &Option<String>, name| {
            url.as_ref()
                .map(|u| BucketClient::new(client.clone(), u.clone(), name))
        };

        Self {
            seismic: config
                .seismic_url
                .as_ref()
                .map(|u| SeismicClient::new(client.clone(), u.clone())),
            weather: config.weather_url.as_ref().map(|u| {
                WeatherClient::new(client.clone(), u.clone(), config.weather_api_key.clone())
            }),
            demographic: bucket(&config.demographic_url, "demographic"),
            geological: bucket(&config.geological_url, "geological"),
            municipal: bucket(&config.municipal_url, "municipal"),
            kandilli: config
                .kandilli_url
                .as_ref()
                .map(|u| KandilliClient::new(client.clone(), u.clone())),
            static_fallback: config.static_fallback,
        }
    }

    pub fn seismic_client(&self) -> Option<&SeismicClient> {
        self.seismic.as_ref()
    }

    pub fn weather_client(&self) -> Option<&WeatherClient> {
        self.weather.as_ref()
    }

    /// Passthrough only; never scored
    pub fn kandilli_client(&self) -> Option<&KandilliClient> {
        self.kandilli.as_ref()
    }

    /// Query every source and wait for all of them
    pub async fn gather(&self, location: &Location) -> PartialSources {
        let region = Region::of(location);
        let profile = region.profile();
        debug!(
            "Gathering sources for {:.4},{:.4} (region {:?})",
            location.latitude, location.longitude, region
        );

        let (seismic, weather, demographic, geological, municipal) = futures::join!(
            self.settle(
                SourceKind::Seismic,
                self.seismic.as_ref().map(|c| c.fetch(location, profile)),
                || profile.seismic(),
            ),
            self.settle(
                SourceKind::Weather,
                self.weather.as_ref().map(|c| c.fetch(location, profile)),
                || profile.weather(),
            ),
            self.settle(
                SourceKind::Demographic,
                self.demographic.as_ref().map(|c| c.fetch(location)),
                || profile.demographic(),
            ),
            self.settle(
                SourceKind::Geological,
                self.geological.as_ref().map(|c| c.fetch(location)),
                || profile.geological(),
            ),
            self.settle(
                SourceKind::Municipal,
                self.municipal.as_ref().map(|c| c.fetch(location)),
                || profile.municipal(),
            ),
        );

        let sources = PartialSources {
            seismic,
            weather,
            municipal,
            demographic,
            geological,
        };
        info!(
            "Sources settled: {} available, live={}",
            sources.available().len(),
            SourceKind::ALL
                .into_iter()
                .filter(|k| sources.is_live(*k))
                .count()
        );
        sources
    }

    async fn settle<T, F, D>(&self, kind: SourceKind, live: Option<F>, regional: D) -> SourceReading<T>
    where
        F: Future<Output = Result<T>>,
        D: FnOnce() -> T,
    {
        let Some(live) = live else {
            debug!("No upstream configured for {}, using regional table", kind);
            return SourceReading::Fallback { signal: regional() };
        };

        match live.await {
            Ok(signal) => SourceReading::Live { signal },
            Err(e) if self.static_fallback => {
                warn!("{} upstream failed ({}), substituting regional table", kind, e);
                SourceReading::Fallback { signal: regional() }
            }
            Err(e) => {
                let error = RiskError::UpstreamUnavailable {
                    kind,
                    reason: e.to_string(),
                };
                warn!("{}, marking unavailable", error);
                SourceReading::unavailable(error.to_string())
            }
        }
    }
}
