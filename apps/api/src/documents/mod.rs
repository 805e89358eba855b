//! Resume text extraction from uploaded files.
//!
//! Accepts the same formats the upload form offers: PDF, plain text and Markdown.
//! PDF parsing is CPU-bound; callers must run `extract_resume_text` inside
//! `tokio::task::spawn_blocking`.

pub mod handlers;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Unsupported file type: {0}. Upload a .pdf, .txt or .md file")]
    Unsupported(String),

    #[error("File is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("File is not valid UTF-8 text")]
    InvalidEncoding,

    #[error("Could not read PDF: {0}")]
    Pdf(String),

    #[error("No readable text found in the file")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    PlainText,
    Markdown,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedDocument {
    pub file_name: String,
    pub kind: DocumentKind,
    pub text: String,
}

/// Picks a reader from the content type, falling back to the file extension.
pub fn detect_kind(
    file_name: &str,
    content_type: Option<&str>,
) -> Result<DocumentKind, DocumentError> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    let content_type = content_type.map(|ct| ct.to_ascii_lowercase());

    match (content_type.as_deref(), extension.as_deref()) {
        (Some("application/pdf"), _) | (_, Some("pdf")) => Ok(DocumentKind::Pdf),
        (_, Some("md" | "markdown")) | (Some("text/markdown"), _) => Ok(DocumentKind::Markdown),
        (_, Some("txt")) => Ok(DocumentKind::PlainText),
        (Some(ct), _) if ct.starts_with("text/") => Ok(DocumentKind::PlainText),
        (ct, _) => Err(DocumentError::Unsupported(
            ct.map(str::to_string)
                .unwrap_or_else(|| file_name.to_string()),
        )),
    }
}

/// Extracts trimmed text from an uploaded resume.
pub fn extract_resume_text(
    file_name: &str,
    content_type: Option<&str>,
    bytes: &[u8],
    max_bytes: usize,
) -> Result<ExtractedDocument, DocumentError> {
    if bytes.len() > max_bytes {
        return Err(DocumentError::TooLarge {
            size: bytes.len(),
            limit: max_bytes,
        });
    }

    let kind = detect_kind(file_name, content_type)?;

    let raw = match kind {
        DocumentKind::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| DocumentError::Pdf(e.to_string()))?,
        DocumentKind::PlainText | DocumentKind::Markdown => {
            let text = std::str::from_utf8(bytes).map_err(|_| DocumentError::InvalidEncoding)?;
            text.strip_prefix('\u{feff}').unwrap_or(text).to_string()
        }
    };

    let text = raw.trim();
    if text.is_empty() {
        return Err(DocumentError::Empty);
    }

    Ok(ExtractedDocument {
        file_name: file_name.to_string(),
        kind,
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_pdf_by_content_type_or_extension() {
        assert_eq!(
            detect_kind("resume", Some("application/pdf")).unwrap(),
            DocumentKind::Pdf
        );
        assert_eq!(
            detect_kind("Resume.PDF", Some("application/octet-stream")).unwrap(),
            DocumentKind::Pdf
        );
    }

    #[test]
    fn test_detects_text_formats() {
        assert_eq!(detect_kind("cv.md", None).unwrap(), DocumentKind::Markdown);
        assert_eq!(detect_kind("cv.txt", None).unwrap(), DocumentKind::PlainText);
        assert_eq!(
            detect_kind("cv", Some("text/plain; charset=utf-8")).unwrap(),
            DocumentKind::PlainText
        );
    }

    #[test]
    fn test_rejects_unsupported_files() {
        let err = detect_kind("cv.docx", Some("application/vnd.openxmlformats")).unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Unsupported(ref t) if t == "application/vnd.openxmlformats"
        ));
        assert!(matches!(
            detect_kind("photo.png", None),
            Err(DocumentError::Unsupported(_))
        ));
    }

    #[test]
    fn test_extracts_trimmed_text_and_strips_bom() {
        let bytes = "\u{feff}\n  Jane Doe\nRust Engineer  \n".as_bytes();
        let doc = extract_resume_text("cv.txt", Some("text/plain"), bytes, 1024).unwrap();
        assert_eq!(doc.text, "Jane Doe\nRust Engineer");
        assert_eq!(doc.kind, DocumentKind::PlainText);
        assert_eq!(doc.file_name, "cv.txt");
    }

    #[test]
    fn test_rejects_oversized_upload() {
        let err = extract_resume_text("cv.txt", None, &[b'a'; 32], 16).unwrap_err();
        assert!(matches!(err, DocumentError::TooLarge { size: 32, limit: 16 }));
    }

    #[test]
    fn test_rejects_invalid_utf8() {
        let err = extract_resume_text("cv.txt", None, &[0xff, 0xfe, 0x00], 1024).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidEncoding));
    }

    #[test]
    fn test_whitespace_only_file_is_empty() {
        let err = extract_resume_text("cv.md", None, b"  \n\t ", 1024).unwrap_err();
        assert!(matches!(err, DocumentError::Empty));
    }

    #[test]
    fn test_garbage_pdf_is_reported_not_swallowed() {
        let err = extract_resume_text("cv.pdf", Some("application/pdf"), b"not a pdf", 1024)
            .unwrap_err();
        assert!(matches!(err, DocumentError::Pdf(_)));
    }
}
