//! Bucketed sources: demographic, geological and municipal
//!
//! All three answer `GET ?lat=&lon=` with a flat JSON object of lowercase
//! bucket names that maps directly onto the engine's signal types.

use super::check_status;
use crate::Result;
use risk_engine::Location;
use serde::de::DeserializeOwned;
use tracing::debug;

pub struct BucketClient {
    client: reqwest::Client,
    url: String,
    name: &'static str,
}

impl BucketClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>, name: &'static str) -> Self {
        Self {
            client,
            url: url.into(),
            name,
        }
    }

    pub async fn fetch<T: DeserializeOwned>(&self, location: &Location) -> Result<T> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("lat", location.latitude), ("lon", location.longitude)])
            .send()
            .await?;
        let signal = check_status(response)?.json().await?;
        debug!(
            "{} source answered for {:.3},{:.3}",
            self.name, location.latitude, location.longitude
        );
        Ok(signal)
    }
}
