use axum::extract::{Multipart, State};
use axum::Json;
use metrics::counter;
use serde_json::{Map, Value};

use crate::errors::AppError;
use crate::ingestion::parse_upload;
use crate::models::{PredictionResponse, RawTable};
use crate::AppState;

const UPLOAD_FIELD: &str = "file";

/// `POST /predict` — score every row of an uploaded CSV file.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PredictionResponse>, AppError> {
    counter!("prediction_requests_total", "source" => "upload").increment(1);

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) = upload.ok_or_else(|| {
        AppError::BadRequest(format!("Missing multipart field `{UPLOAD_FIELD}`."))
    })?;
    tracing::info!(filename = %filename, bytes = bytes.len(), "Prediction upload received");

    let table = parse_upload(&filename, &bytes)?;
    let response = state.pipeline.predict(&table).await?;
    Ok(Json(response))
}

/// `POST /predict/records` — score a JSON array of customer objects.
pub async fn records(
    State(state): State<AppState>,
    Json(records): Json<Vec<Map<String, Value>>>,
) -> Result<Json<PredictionResponse>, AppError> {
    counter!("prediction_requests_total", "source" => "records").increment(1);

    if records.is_empty() {
        return Err(AppError::BadRequest("No records provided.".into()));
    }

    let table = RawTable::from_json_records(&records);
    let response = state.pipeline.predict(&table).await?;
    Ok(Json(response))
}
