use std::convert::Infallible;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::StreamExt;

use crate::narrative::{chat_prompt, narrate, report_prompt, ChatRequest, Fallback, ReportRequest};
use crate::AppState;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

fn streamed(state: &AppState, prompt: String, fallback: Fallback) -> Response {
    let chunks = narrate(state.narrator.clone(), prompt, fallback).map(Ok::<_, Infallible>);
    ([(CONTENT_TYPE, TEXT_PLAIN)], Body::from_stream(chunks)).into_response()
}

/// `POST /chat` — streamed answer grounded in the caller's churn figures.
pub async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    tracing::debug!(
        risks = req.top_risks.as_ref().map_or(0, Vec::len),
        "Chat request"
    );
    streamed(&state, chat_prompt(&req), Fallback::Chat)
}

/// `POST /generate_report` — streamed Markdown executive report.
pub async fn generate_report(
    State(state): State<AppState>,
    Json(req): Json<ReportRequest>,
) -> Response {
    tracing::info!(
        risks = req.top_risks.as_ref().map_or(0, Vec::len),
        "Report generation requested"
    );
    streamed(&state, report_prompt(&req), Fallback::Report)
}
