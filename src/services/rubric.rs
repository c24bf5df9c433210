use anyhow::{Context, Result};

use crate::services::llm::LlmService;

const RUBRIC_SYSTEM_PROMPT: &str = r#"Extract the given total points, criteria, and points/pts from the given rubric.
Answer with the total points, each criteria name, and the points assigned to each criteria."#;

/// Asks the model to normalize a raw rubric into a structured text summary
/// of criteria, point values, and totals. The output is free text; no schema
/// is enforced and downstream prompts must tolerate formatting drift.
pub(crate) async fn normalize(llm: &LlmService, raw_rubric: &str) -> Result<String> {
    let user_prompt = format!("Rubric:\n{raw_rubric}");
    llm.complete(RUBRIC_SYSTEM_PROMPT, &user_prompt)
        .await
        .context("Rubric normalization request to LLM failed")
}

/// Joins every extracted rubric fragment in order. All fragments survive;
/// earlier revisions of this pipeline kept only the last one.
pub(crate) fn join_fragments(fragments: &[String]) -> String {
    fragments
        .iter()
        .map(|fragment| fragment.trim())
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_keeps_every_fragment_in_order() {
        let fragments = vec![
            "Thesis: 10 pts".to_string(),
            "Evidence: 10 pts".to_string(),
            "Grammar: 5 pts".to_string(),
        ];
        let joined = join_fragments(&fragments);
        assert_eq!(joined, "Thesis: 10 pts\n\nEvidence: 10 pts\n\nGrammar: 5 pts");
    }

    #[test]
    fn join_drops_blank_fragments() {
        let fragments = vec!["  ".to_string(), "Thesis: 10 pts".to_string(), String::new()];
        assert_eq!(join_fragments(&fragments), "Thesis: 10 pts");
    }

    #[test]
    fn join_of_nothing_is_empty() {
        assert_eq!(join_fragments(&[]), "");
    }
}
