use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use axum::Json;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::validation::{validate_image_upload, validate_pdf_upload};
use crate::core::state::AppState;
use crate::schemas::grading::{GradeQuestion, GradeResponse};
use crate::services::grading;
use crate::services::grading::DocumentUpload;
use crate::services::llm::ImagePart;

pub(crate) async fn grade_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<GradeResponse>, ApiError> {
    let max_bytes = state.settings().upload().max_upload_bytes();
    let max_mb = state.settings().upload().max_upload_size_mb;
    let max_files = state.settings().upload().max_files_per_request;

    let mut documents: Vec<DocumentUpload> = Vec::new();
    let mut rubric: Option<Vec<u8>> = None;
    let mut question: Option<String> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "pdf" => {
                if documents.len() as u64 >= max_files {
                    return Err(ApiError::BadRequest(format!(
                        "Maximum number of files per request exceeded ({max_files})"
                    )));
                }
                let filename = field.file_name().unwrap_or("essay.pdf").to_string();
                let content_type =
                    field.content_type().unwrap_or("application/octet-stream").to_string();
                validate_pdf_upload(&filename, &content_type)?;

                let bytes = read_field_bytes(&mut field, max_bytes, max_mb).await?;
                documents.push(DocumentUpload { filename, bytes });
            }
            "rubric" => {
                let bytes = read_field_bytes(&mut field, max_bytes, max_mb).await?;
                if !bytes.is_empty() {
                    rubric = Some(bytes);
                }
            }
            "question" => {
                question = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| ApiError::BadRequest("Invalid question field".to_string()))?,
                );
            }
            _ => {}
        }
    }

    if documents.is_empty() {
        return Err(ApiError::BadRequest("No PDF file uploaded".to_string()));
    }

    let question = question
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("No question provided".to_string()))?;
    let form = GradeQuestion { question };
    form.validate().map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let grading_id = Uuid::new_v4().to_string();
    tracing::info!(
        grading_id = %grading_id,
        documents = documents.len(),
        has_rubric = rubric.is_some(),
        "Grading request accepted"
    );

    let outcome =
        match grading::grade_documents(&state, &grading_id, documents, rubric, &form.question)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                metrics::counter!("gradings_total", "status" => "failed").increment(1);
                return Err(ApiError::internal(err, "Grading pipeline failed"));
            }
        };

    state.results().insert(outcome.record);
    metrics::counter!("gradings_total", "status" => "success").increment(1);

    Ok(Json(GradeResponse {
        status: "success".to_string(),
        response: outcome.responses,
        grading_id: Some(grading_id),
    }))
}

pub(crate) async fn grade_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<GradeResponse>, ApiError> {
    let max_bytes = state.settings().upload().max_upload_bytes();
    let max_mb = state.settings().upload().max_upload_size_mb;
    let max_files = state.settings().upload().max_files_per_request;

    let mut images: Vec<ImagePart> = Vec::new();
    let mut has_question_file = false;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "image" => {
                if images.len() as u64 >= max_files {
                    return Err(ApiError::BadRequest(format!(
                        "Maximum number of files per request exceeded ({max_files})"
                    )));
                }
                let filename = field.file_name().unwrap_or("solution.jpg").to_string();
                let content_type = field.content_type().unwrap_or("image/jpeg").to_string();
                validate_image_upload(
                    &filename,
                    &content_type,
                    &state.settings().upload().allowed_image_extensions,
                )?;

                let bytes = read_field_bytes(&mut field, max_bytes, max_mb).await?;
                images.push(ImagePart { mime_type: content_type, bytes });
            }
            // The question-context upload is reused from the pdf form; the
            // fixed comparison prompt reads the question off the image itself.
            "rubric" => {
                let _ = read_field_bytes(&mut field, max_bytes, max_mb).await?;
                has_question_file = true;
            }
            _ => {}
        }
    }

    if images.is_empty() {
        return Err(ApiError::BadRequest("No Image file uploaded".to_string()));
    }
    if !has_question_file {
        return Err(ApiError::BadRequest("No question provided".to_string()));
    }

    let response = grading::grade_images(state.llm(), images)
        .await
        .map_err(|err| ApiError::internal(err, "Image grading failed"))?;

    Ok(Json(GradeResponse { status: "success".to_string(), response, grading_id: None }))
}

async fn read_field_bytes(
    field: &mut Field<'_>,
    max_bytes: u64,
    max_mb: u64,
) -> Result<Vec<u8>, ApiError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
    {
        let next_size = bytes.len() as u64 + chunk.len() as u64;
        if next_size > max_bytes {
            return Err(ApiError::BadRequest(format!("File size exceeds {max_mb}MB limit")));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}
