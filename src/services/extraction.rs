use lopdf::Document;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum ExtractionError {
    #[error("failed to read pdf: {0}")]
    Unreadable(String),
    #[error("pdf is encrypted and no password was supplied")]
    Encrypted,
}

/// Text pulled from one page, in document order.
#[derive(Debug, Clone)]
pub(crate) struct PageText {
    pub(crate) number: u32,
    pub(crate) text: String,
}

/// Extracts the full text of a PDF held in memory.
///
/// Pages are concatenated in order with no separator. A page that carries no
/// text layer (scanned images) contributes an empty string rather than an
/// error; callers must treat a fully empty result as a degenerate submission,
/// not a failure.
pub(crate) fn extract_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    Ok(concat_pages(extract_pages(bytes)?))
}

pub(crate) fn extract_pages(bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError> {
    let document =
        Document::load_mem(bytes).map_err(|error| ExtractionError::Unreadable(error.to_string()))?;

    if document.is_encrypted() {
        return Err(ExtractionError::Encrypted);
    }

    let mut pages = Vec::new();
    for (number, _object_id) in document.get_pages() {
        let text = document.extract_text(&[number]).unwrap_or_default();
        pages.push(PageText { number, text });
    }

    Ok(pages)
}

pub(crate) fn concat_pages(pages: Vec<PageText>) -> String {
    let mut text = String::new();
    for page in pages {
        text.push_str(&page.text);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_unreadable() {
        let result = extract_text(b"this is not a pdf");
        assert!(matches!(result, Err(ExtractionError::Unreadable(_))));
    }

    #[test]
    fn empty_input_is_unreadable() {
        let result = extract_text(&[]);
        assert!(matches!(result, Err(ExtractionError::Unreadable(_))));
    }

    #[test]
    fn concat_preserves_page_order() {
        let pages = vec![
            PageText { number: 1, text: "first ".to_string() },
            PageText { number: 2, text: "second ".to_string() },
            PageText { number: 3, text: "third".to_string() },
        ];
        assert_eq!(concat_pages(pages), "first second third");
    }

    #[test]
    fn concat_length_is_non_decreasing_as_pages_are_added() {
        let mut pages = Vec::new();
        let mut previous_len = 0;
        for number in 1..=5 {
            pages.push(PageText { number, text: format!("page {number} body. ") });
            let combined = concat_pages(pages.clone());
            assert!(combined.len() >= previous_len);
            previous_len = combined.len();
        }
    }

    #[test]
    fn pages_without_text_layer_contribute_empty_strings() {
        let pages = vec![
            PageText { number: 1, text: String::new() },
            PageText { number: 2, text: String::new() },
        ];
        assert_eq!(concat_pages(pages), "");
    }
}
