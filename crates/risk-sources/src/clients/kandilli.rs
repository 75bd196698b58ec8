//! Kandilli observatory recent-earthquake feed

use super::check_status;
use crate::{Result, SourceError};
use tracing::debug;

pub struct KandilliClient {
    client: reqwest::Client,
    url: String,
}

impl KandilliClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Raw recent-events document for passthrough
    pub async fn raw_recent(&self) -> Result<serde_json::Value> {
        debug!("Fetching Kandilli recent events from {}", self.url);
        let response = self.client.get(&self.url).send().await?;
        check_status(response)?
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))
    }
}
