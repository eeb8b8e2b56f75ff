pub mod api;
pub mod classifier;
pub mod config;
pub mod delivery;
pub mod errors;
pub mod ingestion;
pub mod metrics;
pub mod models;
pub mod narrative;
pub mod scoring;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::delivery::ReportMailer;
use crate::narrative::NarrativeClient;
use crate::scoring::ScoringPipeline;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub pipeline: Arc<ScoringPipeline>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
    pub narrator: Option<NarrativeClient>,
    pub mailer: Option<Arc<ReportMailer>>,
}
