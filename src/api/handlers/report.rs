use axum::extract::State;
use axum::Json;
use metrics::counter;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::delivery::{parse_recipient, render_report_pdf, DeliveryError};
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SendReportRequest {
    pub email: String,
    pub report_markdown: String,
}

/// `POST /send_report` — render the Markdown report to PDF and email it.
pub async fn send_report(
    State(state): State<AppState>,
    Json(req): Json<SendReportRequest>,
) -> Result<Json<Value>, AppError> {
    let to = parse_recipient(&req.email)?;
    if req.report_markdown.trim().is_empty() {
        return Err(AppError::BadRequest("The report is empty.".into()));
    }

    let Some(mailer) = state.mailer.clone() else {
        tracing::warn!(to = %to, "Report delivery requested but no mail transport is configured");
        return Ok(Json(json!({
            "status": "skipped",
            "message": "Email delivery is not configured on this server.",
        })));
    };

    let markdown = req.report_markdown;
    let pdf = tokio::task::spawn_blocking(move || render_report_pdf(&markdown))
        .await
        .map_err(|e| DeliveryError::Pdf(e.to_string()))??;

    mailer.send_report(to, pdf).await?;
    counter!("reports_sent_total").increment(1);

    Ok(Json(json!({
        "status": "success",
        "message": "Email sent successfully!",
    })))
}
