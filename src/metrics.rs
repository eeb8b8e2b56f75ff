use anyhow::Context;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the process-wide Prometheus recorder and register the scoring,
/// model and narrative metrics at zero.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    describe_counter!("prediction_requests_total", "Predict calls by input source");
    describe_counter!("rows_scored_total", "Customer rows scored");
    describe_counter!("prediction_failures_total", "Failed scoring batches by reason");
    describe_counter!("narrative_failures_total", "LLM responses replaced by fallback text");
    describe_counter!("reports_sent_total", "Report emails handed to the mail transport");
    describe_gauge!("model_loaded", "1 once the churn model is cached");
    describe_histogram!("prediction_latency_seconds", Unit::Seconds, "Batch scoring latency");
    describe_histogram!("model_load_seconds", Unit::Seconds, "Model artifact load time");

    counter!("prediction_requests_total").absolute(0);
    counter!("rows_scored_total").absolute(0);
    counter!("prediction_failures_total").absolute(0);
    counter!("narrative_failures_total").absolute(0);
    counter!("reports_sent_total").absolute(0);
    gauge!("model_loaded").set(0.0);

    Ok(handle)
}

/// Handle backed by a recorder that is not installed globally. Renders an
/// empty payload; used where no process-wide exporter exists (tests).
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}
