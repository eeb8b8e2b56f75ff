use crate::models::PredictionSummary;

/// Reduce binary predictions to batch totals.
///
/// `churn_rate` is the mean of the labels, not of the probabilities. An empty
/// batch reports a zero rate; the pipeline rejects empty batches before this.
pub fn summarize(predictions: &[u8]) -> PredictionSummary {
    let total_customers = predictions.len();
    let high_risk_count = predictions.iter().filter(|&&p| p == 1).count();
    let churn_rate = if total_customers == 0 {
        0.0
    } else {
        high_risk_count as f64 / total_customers as f64
    };

    PredictionSummary {
        total_customers,
        churn_rate,
        high_risk_count,
    }
}
