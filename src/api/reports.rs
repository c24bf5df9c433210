use axum::extract::State;
use axum::Json;

use crate::api::errors::ApiError;
use crate::core::results::GradingRecord;
use crate::core::state::AppState;
use crate::schemas::grading::{PlagiarismResponse, ResultLookupRequest, VisualizationResponse};

/// Per-criterion breakdown for the most recent grading, or for an explicit
/// `grading_id` when the client carries one.
pub(crate) async fn visualization(
    State(state): State<AppState>,
    body: Option<Json<ResultLookupRequest>>,
) -> Result<Json<VisualizationResponse>, ApiError> {
    let record = lookup_record(&state, body)?;
    Ok(Json(VisualizationResponse::from(record)))
}

pub(crate) async fn plagiarism(
    State(state): State<AppState>,
    body: Option<Json<ResultLookupRequest>>,
) -> Result<Json<PlagiarismResponse>, ApiError> {
    let record = lookup_record(&state, body)?;
    let report = record.detection.ok_or_else(|| {
        ApiError::NotFound("No content-origin report available for this grading".to_string())
    })?;

    Ok(Json(PlagiarismResponse::from(report)))
}

fn lookup_record(
    state: &AppState,
    body: Option<Json<ResultLookupRequest>>,
) -> Result<GradingRecord, ApiError> {
    let lookup = body.map(|Json(value)| value).unwrap_or_default();

    match lookup.grading_id {
        Some(grading_id) => state.results().get(&grading_id).ok_or_else(|| {
            ApiError::NotFound(format!("No grading results for id {grading_id}"))
        }),
        None => state
            .results()
            .latest()
            .ok_or_else(|| ApiError::NotFound("No grading results available".to_string())),
    }
}
