//! Resume text intake: plain text as submitted, or text pulled out of a PDF upload.

use tracing::{debug, warn};

use crate::errors::AppError;

const PDF_MAGIC: &[u8] = b"%PDF";

/// True when the upload declares or looks like a PDF.
pub fn is_pdf(content_type: Option<&str>, bytes: &[u8]) -> bool {
    content_type.is_some_and(|ct| ct.eq_ignore_ascii_case("application/pdf"))
        || bytes.starts_with(PDF_MAGIC)
}

/// Extracts the text layer of a PDF resume on the blocking pool.
/// A panic inside the PDF decoder surfaces as a validation error.
pub async fn extract_pdf_text(bytes: Vec<u8>) -> Result<String, AppError> {
    let extracted = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| {
            warn!("PDF extraction task failed: {e}");
            unreadable_pdf()
        })?;
    let text = extracted.map_err(|e| {
        debug!("PDF extraction failed: {e}");
        unreadable_pdf()
    })?;
    normalize_resume(&text).map_err(|_| unreadable_pdf())
}

fn unreadable_pdf() -> AppError {
    AppError::Validation("could not read text from resume PDF".to_string())
}

/// Collapses runs of spaces/tabs, keeps at most one blank line between
/// paragraphs, and trims. Empty input is a validation error.
pub fn normalize_resume(text: &str) -> Result<String, AppError> {
    let mut lines: Vec<String> = Vec::new();
    let mut previous_blank = true;

    for line in text.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            if !previous_blank {
                lines.push(String::new());
            }
            previous_blank = true;
        } else {
            lines.push(collapsed);
            previous_blank = false;
        }
    }

    let normalized = lines.join("\n").trim().to_string();
    if normalized.is_empty() {
        return Err(AppError::Validation("resume cannot be empty".to_string()));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        let text = "  Jane   Doe \n\n\n\nSenior\tEngineer  \n   \nRust,  Go ";
        assert_eq!(
            normalize_resume(text).unwrap(),
            "Jane Doe\n\nSenior Engineer\n\nRust, Go"
        );
    }

    #[test]
    fn test_normalize_rejects_blank() {
        assert!(matches!(
            normalize_resume(" \n\t \n"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_is_pdf_by_content_type_or_magic() {
        assert!(is_pdf(Some("application/pdf"), b""));
        assert!(is_pdf(Some("Application/PDF"), b""));
        assert!(is_pdf(None, b"%PDF-1.7\n..."));
        assert!(!is_pdf(Some("text/plain"), b"Jane Doe"));
        assert!(!is_pdf(None, b"Jane Doe"));
    }

    #[tokio::test]
    async fn test_garbage_pdf_is_validation_error() {
        let err = extract_pdf_text(b"%PDF-1.4 not really a pdf".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("PDF")));
    }
}
