#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use churnlens::api::router::create_router;
use churnlens::classifier::{ChurnClassifier, ModelHandle, TypeRegistry};
use churnlens::config::AppConfig;
use churnlens::delivery::ReportMailer;
use churnlens::models::{CanonicalFeatureRow, NumericFeature};
use churnlens::scoring::ScoringPipeline;
use churnlens::AppState;

pub const BOUNDARY: &str = "churnlens-test-boundary";

/// Scores short-tenure customers as likely churners.
pub struct TenureRule;

impl ChurnClassifier for TenureRule {
    fn predict_proba(&self, rows: &[CanonicalFeatureRow]) -> Vec<f64> {
        rows.iter()
            .map(|r| {
                if r.numeric(NumericFeature::TenureMonths) < 12.0 {
                    0.8
                } else {
                    0.1
                }
            })
            .collect()
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        service_root: PathBuf::from(env!("CARGO_MANIFEST_DIR")),
        model_path: PathBuf::from("universal_churn_model.json"),
        preload_model: false,
        max_upload_bytes: 1024 * 1024,
        genai_api_key: None,
        genai_model: "test-model".into(),
        genai_base_url: "http://127.0.0.1:9".into(),
        smtp_host: None,
        smtp_port: 587,
        smtp_username: None,
        smtp_password: None,
        smtp_starttls: true,
        email_from: "ChurnLens <reports@churnlens.local>".into(),
        email_outbox_dir: None,
    }
}

fn app_with(model: ModelHandle, mailer: Option<ReportMailer>) -> axum::Router {
    let state = AppState {
        config: test_config(),
        pipeline: Arc::new(ScoringPipeline::new(Arc::new(model))),
        metrics_handle: churnlens::metrics::detached_handle(),
        narrator: None,
        mailer: mailer.map(Arc::new),
    };
    create_router(state)
}

/// App backed by the in-memory tenure rule.
pub fn build_test_app() -> axum::Router {
    app_with(ModelHandle::preloaded(Arc::new(TenureRule)), None)
}

/// App that delivers report emails as `.eml` files under `outbox`.
pub fn build_app_with_outbox(outbox: &Path) -> axum::Router {
    let from = "ChurnLens <reports@churnlens.local>".parse().unwrap();
    app_with(
        ModelHandle::preloaded(Arc::new(TenureRule)),
        Some(ReportMailer::outbox(outbox, from)),
    )
}

/// App whose model artifact does not exist.
pub fn build_app_without_model() -> axum::Router {
    let registry = Arc::new(TypeRegistry::with_legacy_aliases());
    app_with(
        ModelHandle::from_artifact("/nonexistent/churn_model.json", registry),
        None,
    )
}

/// Encode a single-file multipart body under the `file` field.
pub fn multipart_body(filename: &str, contents: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Single-sheet workbook; cells that parse as numbers are written as numbers.
pub fn xlsx_bytes(rows: &[&[&str]]) -> Vec<u8> {
    let mut book = rust_xlsxwriter::Workbook::new();
    let sheet = book.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            match cell.parse::<f64>() {
                Ok(n) => sheet.write_number(r as u32, c as u16, n).unwrap(),
                Err(_) => sheet.write_string(r as u32, c as u16, *cell).unwrap(),
            };
        }
    }
    book.save_to_buffer().unwrap()
}

pub fn artifact_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("universal_churn_model.json")
}
