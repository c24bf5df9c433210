use anyhow::{Context, Result};

use crate::core::results::GradingRecord;
use crate::core::state::AppState;
use crate::services::llm::{ImagePart, LlmService};
use crate::services::{chunking, extraction, report_parser, rubric, vector_index};

const IMAGE_GRADING_PROMPT: &str = r#"Your task is to determine if the student's solution is correct or not.
To solve the problem do the following:
- First, work out your own solution to the problem.
- Then compare your solution to the student's solution and evaluate if the student's solution is correct or not. Don't decide if the student's solution is correct until you have done the problem yourself.

Use the following format:
Question:

question here

Student's solution:

student's solution here

Actual solution:

steps to work out the solution and your solution here

Is the student's solution the same as the actual solution just calculated:

yes or no

Student grade:

correct or incorrect"#;

/// One uploaded document, held fully in memory for the life of the request.
#[derive(Debug)]
pub(crate) struct DocumentUpload {
    pub(crate) filename: String,
    pub(crate) bytes: Vec<u8>,
}

pub(crate) struct GradingOutcome {
    pub(crate) responses: String,
    pub(crate) record: GradingRecord,
}

/// Runs the full pipeline for one grading request: per document, extract →
/// chunk → index → grade → parse; then a content-origin check over the first
/// document's text. Every derived result lands in a [`GradingRecord`] scoped
/// to `grading_id`.
pub(crate) async fn grade_documents(
    state: &AppState,
    grading_id: &str,
    documents: Vec<DocumentUpload>,
    rubric_file: Option<Vec<u8>>,
    question: &str,
) -> Result<GradingOutcome> {
    let rubric_text = match rubric_file {
        Some(bytes) => normalize_rubric_file(state.llm(), bytes).await?,
        None => None,
    };

    let config = chunking::ChunkingConfig::from_settings(state.settings());
    let system_prompt = build_grading_system_prompt(rubric_text.as_deref());

    let mut responses = String::new();
    let mut criteria = Vec::new();
    let mut percentage_grades = Vec::new();
    let mut letter_grades = Vec::new();
    let mut first_document_text: Option<String> = None;

    for document in documents {
        let filename = document.filename;
        let bytes = document.bytes;
        let text = tokio::task::spawn_blocking(move || extraction::extract_text(&bytes))
            .await
            .context("Extraction task panicked")??;

        if text.trim().is_empty() {
            // No text layer (scanned pages); the model still gets a chance to
            // respond but there is nothing to index or scan.
            tracing::warn!(filename = %filename, "Extracted no text from document");
        }

        if first_document_text.is_none() {
            first_document_text = Some(text.clone());
        }

        let chunks = chunking::split_text(&text, config);

        let index = vector_index::build(state.llm(), grading_id, &chunks)
            .await
            .context("Failed to index submission chunks")?;
        tracing::debug!(filename = %filename, chunks = index.len(), "Submission indexed");
        state.indexes().insert(index);

        // All chunks go to the model directly; the index exists for
        // similarity lookups against the same grading id.
        let user_prompt = build_grading_user_prompt(&chunks, question);
        let output = state
            .llm()
            .complete(&system_prompt, &user_prompt)
            .await
            .context("Grading request to LLM failed")?;

        let report = report_parser::parse_report(&output)?;
        criteria.extend(report.criteria);
        if let Some(percentage) = report.percentage_grade {
            percentage_grades.push(percentage);
        }
        if let Some(letter) = report.letter_grade {
            letter_grades.push(letter);
        }

        responses.push_str(&format!("\nResponse for {filename}: \n\n{output}"));
    }

    let detection = match first_document_text {
        Some(text) if !text.trim().is_empty() => match state.detection().check(&text).await {
            Ok(report) => {
                metrics::counter!("detection_checks_total", "status" => "success").increment(1);
                Some(report)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Content-origin check failed");
                metrics::counter!("detection_checks_total", "status" => "failed").increment(1);
                None
            }
        },
        _ => None,
    };

    let record = GradingRecord::new(
        grading_id.to_string(),
        criteria,
        percentage_grades,
        letter_grades,
        detection,
    );

    Ok(GradingOutcome { responses, record })
}

/// Grades handwritten solutions photographed by the student. The decoded
/// image bytes go straight to the vision model with the fixed comparison
/// prompt; the answer is returned verbatim with no structured parsing.
pub(crate) async fn grade_images(llm: &LlmService, images: Vec<ImagePart>) -> Result<String> {
    llm.complete_vision(IMAGE_GRADING_PROMPT, &images)
        .await
        .context("Image grading request to LLM failed")
}

async fn normalize_rubric_file(llm: &LlmService, bytes: Vec<u8>) -> Result<Option<String>> {
    let raw = tokio::task::spawn_blocking(move || extraction::extract_text(&bytes))
        .await
        .context("Rubric extraction task panicked")??;

    let joined = rubric::join_fragments(&[raw]);
    if joined.is_empty() {
        tracing::warn!("Rubric document contained no extractable text");
        return Ok(None);
    }

    Ok(Some(rubric::normalize(llm, &joined).await?))
}

fn build_grading_system_prompt(rubric: Option<&str>) -> String {
    let rubric_text = match rubric {
        Some(rubric) => format!(
            " according to the provided rubric:\n{rubric}\nStrictly base the grading on the criteria, total points, and the points for each criteria given in the provided rubric.\n"
        ),
        None => " based on the general grading criteria.\n".to_string(),
    };

    format!(
        r#"You are a trained expert on writing and literary analysis. Your job is to accurately and effectively grade a student's essay{rubric_text}
Respond back with graded points and a level for each criteria. Don't rewrite the rubric. For each criteria, provide a brief comment (1-2 lines) explaining the score.
In the end, write short feedback about what steps they might take to improve on their assignment. Write a total percentage grade and letter grade.
Try to be lenient and keep in mind that the student is still learning. Consider the course level and grade level the student is at and the overall expectations of the writing they should be producing.
Your grade should only be below 70 percent if the essay does not succeed at all in any of the criteria. Your grade should only be below 80 percent if the essay is not sufficient in most of the criteria. Your grade should only be below 90 percent if there are a few criteria where the essay doesn't excel. Your grade should only be above 90 percent if the essay succeeds in most of the criteria.
Understand that the essay was written by a human and give the student the benefit of the doubt.

Format each criteria exactly like this:
• Criteria_name: score/total
  Brief comment explaining the score (1-2 lines maximum)

Close the report with these two lines:
Total Percentage Grade: <percent>%
Letter Grade: <letter>"#
    )
}

fn build_grading_user_prompt(chunks: &[String], question: &str) -> String {
    format!("Context:\n{}\n\nQuestion:\n{}\n", chunks.join("\n\n"), question)
}
