use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use metrics::{counter, histogram};
use thiserror::Error;

use crate::classifier::{ModelError, ModelHandle};
use crate::models::{PredictionResponse, RawTable, ScoredRecord};

use super::normalizer::normalize;
use super::summary::summarize;

/// Probability at or above which a customer is labelled as churning.
pub const DECISION_THRESHOLD: f64 = 0.30;

/// Ground-truth columns that must never reach the model.
pub const LABEL_COLUMNS: &[&str] = &["churn", "churned", "exited"];

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("input batch has no rows")]
    EmptyInput,

    #[error("churn model unavailable: {0}")]
    ModelUnavailable(#[source] ModelError),

    #[error("classifier returned {got} probabilities for {expected} rows")]
    OutputMismatch { expected: usize, got: usize },
}

impl ScoringError {
    fn reason(&self) -> &'static str {
        match self {
            ScoringError::EmptyInput => "empty_input",
            ScoringError::ModelUnavailable(_) => "model_unavailable",
            ScoringError::OutputMismatch { .. } => "output_mismatch",
        }
    }
}

/// Binary churn label for one probability.
pub fn label(probability: f64) -> u8 {
    u8::from(probability >= DECISION_THRESHOLD)
}

/// Row-aligned model output for one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchScores {
    pub probabilities: Vec<f64>,
    pub predictions: Vec<u8>,
}

/// Normalize column names and strip label columns.
pub fn prepare(table: &RawTable) -> RawTable {
    let normalized = table.with_normalized_columns();
    let leaked: Vec<&str> = LABEL_COLUMNS
        .iter()
        .copied()
        .filter(|c| normalized.has_column(c))
        .collect();
    if !leaked.is_empty() {
        tracing::debug!(columns = ?leaked, "Dropping label columns before scoring");
    }
    normalized.without_columns(LABEL_COLUMNS)
}

/// Normalizer + cached classifier + threshold, for one request at a time.
pub struct ScoringPipeline {
    model: Arc<ModelHandle>,
}

impl ScoringPipeline {
    pub fn new(model: Arc<ModelHandle>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    /// Score every row of `table` with a single batched classifier call.
    pub async fn score(&self, table: &RawTable) -> Result<BatchScores, ScoringError> {
        let started = Instant::now();
        let result = self.score_inner(table).await;

        match &result {
            Ok(scores) => {
                counter!("rows_scored_total").increment(scores.predictions.len() as u64);
                histogram!("prediction_latency_seconds").record(started.elapsed().as_secs_f64());
            }
            Err(e) => {
                counter!("prediction_failures_total", "reason" => e.reason()).increment(1);
            }
        }

        result
    }

    async fn score_inner(&self, table: &RawTable) -> Result<BatchScores, ScoringError> {
        if table.is_empty() {
            return Err(ScoringError::EmptyInput);
        }

        let features = normalize(&prepare(table));
        let model = self
            .model
            .get()
            .await
            .map_err(ScoringError::ModelUnavailable)?;

        let probabilities = model.predict_proba(&features);
        if probabilities.len() != features.len() {
            return Err(ScoringError::OutputMismatch {
                expected: features.len(),
                got: probabilities.len(),
            });
        }

        let predictions = probabilities.iter().map(|&p| label(p)).collect();

        Ok(BatchScores {
            probabilities,
            predictions,
        })
    }

    /// Score `table` and assemble the annotated response.
    pub async fn predict(&self, table: &RawTable) -> Result<PredictionResponse, ScoringError> {
        let scores = self.score(table).await?;
        let summary = summarize(&scores.predictions);

        let results = table
            .records()
            .zip(scores.probabilities.iter().zip(&scores.predictions))
            .map(|(record, (&p, &y))| ScoredRecord::new(record, p, y))
            .collect();

        tracing::info!(
            rows = summary.total_customers,
            high_risk = summary.high_risk_count,
            churn_rate = summary.churn_rate,
            "Batch scored"
        );

        Ok(PredictionResponse {
            summary,
            results,
            scored_at: Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
