use std::path::Path;

use crate::api::errors::ApiError;

pub(crate) fn validate_pdf_upload(filename: &str, content_type: &str) -> Result<(), ApiError> {
    let extension = file_extension(filename)?;

    if extension != "pdf" {
        return Err(ApiError::BadRequest(format!(
            "File extension '{extension}' is not allowed, expected 'pdf'"
        )));
    }

    let mime = content_type.trim().to_ascii_lowercase();
    if matches!(mime.as_str(), "application/pdf" | "application/octet-stream") {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("MIME type '{mime}' does not match a PDF upload")))
    }
}

pub(crate) fn validate_image_upload(
    filename: &str,
    content_type: &str,
    allowed_extensions: &[String],
) -> Result<(), ApiError> {
    let extension = file_extension(filename)?;

    if !allowed_extensions.iter().any(|allowed| allowed == &extension) {
        return Err(ApiError::BadRequest(format!("File extension '{extension}' is not allowed")));
    }

    let mime = content_type.trim().to_ascii_lowercase();
    if mime_allowed_for_extension(&mime, &extension) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "MIME type '{mime}' does not match extension '.{extension}'"
        )))
    }
}

fn file_extension(filename: &str) -> Result<String, ApiError> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| ApiError::BadRequest("File must have an extension".to_string()))
}

fn mime_allowed_for_extension(mime: &str, extension: &str) -> bool {
    match extension {
        "jpg" | "jpeg" => matches!(mime, "image/jpeg" | "image/jpg"),
        "png" => mime == "image/png",
        "webp" => mime == "image/webp",
        "gif" => mime == "image/gif",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()]
    }

    #[test]
    fn pdf_upload_accepts_pdf_mime() {
        assert!(validate_pdf_upload("essay.pdf", "application/pdf").is_ok());
        assert!(validate_pdf_upload("essay.PDF", "application/octet-stream").is_ok());
    }

    #[test]
    fn pdf_upload_rejects_other_extensions() {
        assert!(validate_pdf_upload("essay.docx", "application/pdf").is_err());
        assert!(validate_pdf_upload("essay", "application/pdf").is_err());
    }

    #[test]
    fn pdf_upload_rejects_mismatched_mime() {
        assert!(validate_pdf_upload("essay.pdf", "image/png").is_err());
    }

    #[test]
    fn image_upload_checks_extension_and_mime() {
        assert!(validate_image_upload("solution.jpg", "image/jpeg", &allowed()).is_ok());
        assert!(validate_image_upload("solution.png", "image/png", &allowed()).is_ok());
        assert!(validate_image_upload("solution.gif", "image/gif", &allowed()).is_err());
        assert!(validate_image_upload("solution.png", "image/jpeg", &allowed()).is_err());
    }
}
