//! Address in, scored result out

use crate::clients::http_client;
use crate::config::RiskoConfig;
use crate::fetcher::SourceFetcher;
use crate::geocoder::Geocoder;
use crate::Result;
use chrono::Utc;
use risk_engine::demo::DemoProvider;
use risk_engine::report::DetailedReport;
use risk_engine::session::{RequestId, RequestSequencer};
use risk_engine::sources::{BuildingAge, PartialSources, SourceKind};
use risk_engine::{aggregate, AggregateResult, Location, RiskError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Most addresses accepted by one batch analysis
pub const MAX_BATCH: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub address: String,
    #[serde(default)]
    pub building_age: Option<u32>,
    #[serde(default)]
    pub building_type: Option<String>,
}

impl AnalysisRequest {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Every source answered live
    Live,
    /// At least one source came from a table or was unavailable
    Partial,
    /// Synthetic result; no source produced data
    Demo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub request_id: RequestId,
    pub mode: AnalysisMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    pub result: AggregateResult,
}

pub struct RiskPipeline {
    geocoder: Geocoder,
    fetcher: SourceFetcher,
    sequencer: Arc<RequestSequencer>,
    demo_fallback: bool,
}

impl RiskPipeline {
    pub fn from_config(config: &RiskoConfig) -> Result<Self> {
        let client = http_client(config)?;
        Ok(Self {
            geocoder: Geocoder::new(
                client.clone(),
                config.geocoder_url.clone(),
                config.country_qualifier.clone(),
            ),
            fetcher: SourceFetcher::with_client(client, config),
            sequencer: Arc::new(RequestSequencer::new()),
            demo_fallback: config.demo_fallback,
        })
    }

    pub fn new(geocoder: Geocoder, fetcher: SourceFetcher, demo_fallback: bool) -> Self {
        Self {
            geocoder,
            fetcher,
            sequencer: Arc::new(RequestSequencer::new()),
            demo_fallback,
        }
    }

    pub fn fetcher(&self) -> &SourceFetcher {
        &self.fetcher
    }

    pub fn geocoder(&self) -> &Geocoder {
        &self.geocoder
    }

    pub fn sequencer(&self) -> Arc<RequestSequencer> {
        self.sequencer.clone()
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> AnalysisOutcome {
        let id = self.sequencer.next_id();
        self.analyze_as(id, request).await
    }

    /// Run an analysis under an id issued by the caller
    pub async fn analyze_as(&self, request_id: RequestId, request: &AnalysisRequest) -> AnalysisOutcome {
        info!("[{}] Analyzing '{}'", request_id, request.address);

        let location = self.geocoder.resolve(&request.address).await;
        let sources = self.gather(request_id, request, &location).await;

        if sources.available().is_empty() && self.demo_fallback {
            warn!("[{}] No source produced data, serving demo result", request_id);
            return self.demo_outcome(request_id, &location);
        }
        self.score(request_id, &sources, &location)
    }

    /// Analysis that fails instead of guessing a location or serving demo data
    pub async fn try_analyze(&self, request: &AnalysisRequest) -> risk_engine::Result<AnalysisOutcome> {
        let request_id = self.sequencer.next_id();
        info!("[{}] Analyzing '{}' (strict)", request_id, request.address);

        let location = self.geocoder.resolve_strict(&request.address).await?;
        let sources = self.gather(request_id, request, &location).await;
        if sources.available().is_empty() {
            return Err(RiskError::AggregationInputMissing);
        }
        Ok(self.score(request_id, &sources, &location))
    }

    /// Analyze up to `MAX_BATCH` addresses concurrently, skipping failures
    pub async fn analyze_batch(
        &self,
        requests: &[AnalysisRequest],
    ) -> risk_engine::Result<Vec<AnalysisOutcome>> {
        if requests.len() > MAX_BATCH {
            return Err(RiskError::BatchTooLarge {
                size: requests.len(),
                limit: MAX_BATCH,
            });
        }

        let settled = futures::future::join_all(requests.iter().map(|r| self.try_analyze(r))).await;
        let outcomes: Vec<AnalysisOutcome> = settled
            .into_iter()
            .zip(requests)
            .filter_map(|(result, request)| match result {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    warn!("Skipping '{}' in batch: {}", request.address, e);
                    None
                }
            })
            .collect();
        info!("Batch analyzed {} of {} addresses", outcomes.len(), requests.len());
        Ok(outcomes)
    }

    pub async fn analyze_detailed(&self, request: &AnalysisRequest) -> DetailedReport {
        DetailedReport::from_result(self.analyze(request).await.result)
    }

    /// Detailed report through the strict path
    pub async fn try_analyze_detailed(
        &self,
        request: &AnalysisRequest,
    ) -> risk_engine::Result<DetailedReport> {
        Ok(DetailedReport::from_result(self.try_analyze(request).await?.result))
    }

    async fn gather(
        &self,
        request_id: RequestId,
        request: &AnalysisRequest,
        location: &Location,
    ) -> PartialSources {
        let mut sources = self.fetcher.gather(location).await;
        apply_building_attributes(&mut sources, request);
        debug!("[{}] Subtype scores: {:?}", request_id, sources.subtype_scores());
        sources
    }

    fn score(&self, request_id: RequestId, sources: &PartialSources, location: &Location) -> AnalysisOutcome {
        let missing = missing_sources(sources);
        if !missing.is_empty() {
            warn!("[{}] Scoring without {:?}; missing weight is not redistributed", request_id, missing);
        }

        let mode = if sources.all_live() {
            AnalysisMode::Live
        } else {
            AnalysisMode::Partial
        };
        let result = aggregate(sources, location);
        info!(
            "[{}] Score {:.1} ({}) from {} sources",
            request_id,
            result.overall_score,
            result.risk_level,
            result.data_sources.len()
        );

        AnalysisOutcome {
            request_id,
            mode,
            notice: None,
            result,
        }
    }

    fn demo_outcome(&self, request_id: RequestId, location: &Location) -> AnalysisOutcome {
        let seed = Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64 ^ request_id.0;
        AnalysisOutcome {
            request_id,
            mode: AnalysisMode::Demo,
            notice: Some(RiskError::AggregationInputMissing.to_string()),
            result: DemoProvider::new(seed).analysis(location),
        }
    }
}

/// A supplied building age overrides the municipal age bucket
pub fn apply_building_attributes(sources: &mut PartialSources, request: &AnalysisRequest) {
    if let (Some(years), Some(municipal)) = (request.building_age, sources.municipal.signal_mut()) {
        municipal.building_age = BuildingAge::from_years(years);
    }
    if let Some(kind) = &request.building_type {
        debug!("Building type '{}' recorded, not scored", kind);
    }
}

/// Sources that produced no data, for logging and notices
pub fn missing_sources(sources: &PartialSources) -> Vec<SourceKind> {
    SourceKind::ALL
        .into_iter()
        .filter(|k| !sources.is_available(*k))
        .collect()
}
