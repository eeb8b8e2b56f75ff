use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use super::{RawRecord, RawValue};

pub const PROBABILITY_COLUMN: &str = "churn_probability";
pub const PREDICTION_COLUMN: &str = "churn_prediction";

/// One caller row echoed back with its churn score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub fields: Vec<(String, RawValue)>,
    pub churn_probability: f64,
    pub churn_prediction: u8,
}

impl ScoredRecord {
    /// Annotate a raw row. Existing score columns in the input are replaced.
    pub fn new(record: RawRecord<'_>, churn_probability: f64, churn_prediction: u8) -> Self {
        let fields = record
            .iter()
            .filter(|(c, _)| *c != PROBABILITY_COLUMN && *c != PREDICTION_COLUMN)
            .map(|(c, v)| (c.to_string(), v.clone()))
            .collect();

        Self {
            fields,
            churn_probability,
            churn_prediction,
        }
    }

    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.fields.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }
}

impl Serialize for ScoredRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 2))?;
        for (column, value) in &self.fields {
            map.serialize_entry(column, value)?;
        }
        map.serialize_entry(PROBABILITY_COLUMN, &self.churn_probability)?;
        map.serialize_entry(PREDICTION_COLUMN, &self.churn_prediction)?;
        map.end()
    }
}

/// Aggregate over one scored batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSummary {
    pub total_customers: usize,
    /// Fraction of rows predicted to churn (mean of the binary labels).
    pub churn_rate: f64,
    pub high_risk_count: usize,
}

/// Body returned by the predict endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    pub summary: PredictionSummary,
    pub results: Vec<ScoredRecord>,
    pub scored_at: DateTime<Utc>,
}
