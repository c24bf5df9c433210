use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::results::GradingRecord;
use crate::services::content_origin::ContentOriginReport;
use crate::services::report_parser::CriterionScore;

#[derive(Debug, Serialize)]
pub(crate) struct GradeResponse {
    pub(crate) status: String,
    pub(crate) response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) grading_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GradeQuestion {
    #[validate(length(min = 1, max = 4000, message = "question must be between 1 and 4000 characters"))]
    pub(crate) question: String,
}

/// Optional lookup body for the follow-up endpoints. Omitting the id keeps
/// the original protocol and resolves to the most recent grading.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResultLookupRequest {
    #[serde(default)]
    pub(crate) grading_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct VisualizationResponse {
    pub(crate) criteria: Vec<CriterionScore>,
    pub(crate) percentage_grade: Vec<f64>,
    pub(crate) letter_grade: Vec<String>,
}

impl From<GradingRecord> for VisualizationResponse {
    fn from(record: GradingRecord) -> Self {
        Self {
            criteria: record.criteria,
            percentage_grade: record.percentage_grades,
            letter_grade: record.letter_grades,
        }
    }
}

// Field names mirror the JSON keys the original frontend consumed.
#[derive(Debug, Serialize)]
pub(crate) struct PlagiarismResponse {
    #[serde(rename = "Classification")]
    pub(crate) classification: String,
    #[serde(rename = "AI Score")]
    pub(crate) ai_score: f64,
    #[serde(rename = "Human Score")]
    pub(crate) human_score: f64,
    #[serde(rename = "Total Words")]
    pub(crate) total_words: u64,
    #[serde(rename = "Model Version")]
    pub(crate) model_version: String,
}

impl From<ContentOriginReport> for PlagiarismResponse {
    fn from(report: ContentOriginReport) -> Self {
        Self {
            classification: report.classification,
            ai_score: report.ai_score,
            human_score: report.human_score,
            total_words: report.total_words,
            model_version: report.model_version,
        }
    }
}
