//! Upstream HTTP clients, one per hazard source

pub mod buckets;
pub mod kandilli;
pub mod seismic;
pub mod weather;

pub use buckets::BucketClient;
pub use kandilli::KandilliClient;
pub use seismic::SeismicClient;
pub use weather::WeatherClient;

use crate::config::RiskoConfig;
use crate::{Result, SourceError};

/// Shared HTTP client honouring the configured timeout and user agent
pub fn http_client(config: &RiskoConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
    if let Some(timeout) = config.timeout() {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| SourceError::Request(format!("Failed to create HTTP client: {}", e)))
}

/// Map a non-success status to an error
pub(crate) fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(SourceError::Status(response.status().as_u16()))
    }
}
