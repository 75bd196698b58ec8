//! Risko source integration
//!
//! Everything that talks to the outside world on behalf of the risk engine:
//! address geocoding, the five hazard upstreams, the settle-all fetcher and
//! the analysis pipeline that ties them to the aggregator.
//!
//! Upstream failures never surface as errors past the fetcher. A failed live
//! call becomes a regional fallback reading, or an unavailable marker when
//! static fallback is switched off.

use thiserror::Error;

pub mod clients;
pub mod config;
pub mod context;
pub mod fetcher;
pub mod geocoder;
pub mod pipeline;

pub use config::RiskoConfig;
pub use context::{AppContext, HistoryEntry};
pub use fetcher::SourceFetcher;
pub use geocoder::Geocoder;
pub use pipeline::{AnalysisMode, AnalysisOutcome, AnalysisRequest, RiskPipeline};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Upstream returned status {0}")]
    Status(u16),
    #[error("Could not parse upstream response: {0}")]
    Parse(String),
    #[error("No upstream configured for {0}")]
    NotConfigured(&'static str),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SourceError::Parse(e.to_string())
        } else {
            SourceError::Request(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, SourceError>;
