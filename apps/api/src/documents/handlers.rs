//! Axum route handler for resume uploads.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use tracing::{info, warn};

use crate::documents::{extract_resume_text, ExtractedDocument};
use crate::errors::AppError;
use crate::state::AppState;

const FILE_FIELD: &str = "file";

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::Validation(format!("Invalid multipart upload: {}", err.body_text()))
    }
}

/// POST /api/v1/resumes/extract-text
///
/// Accepts a multipart form with a single `file` field and returns its text,
/// ready to be passed as `resumeText` to the analysis endpoints.
pub async fn handle_extract_text(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ExtractedDocument>, AppError> {
    let mut upload: Option<(String, Option<String>, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;
        upload = Some((file_name, content_type, data));
        break;
    }

    let (file_name, content_type, data) = upload
        .ok_or_else(|| {
            AppError::Validation(format!("multipart field '{FILE_FIELD}' is required"))
        })?;

    let max_bytes = state.config.max_upload_bytes;
    let document = tokio::task::spawn_blocking(move || {
        extract_resume_text(&file_name, content_type.as_deref(), &data, max_bytes)
    })
    .await
    .map_err(|e| {
        if e.is_panic() {
            warn!("PDF reader panicked on upload");
            AppError::UnprocessableEntity("Could not read PDF".to_string())
        } else {
            AppError::Internal(anyhow::Error::new(e))
        }
    })??;

    info!(
        file_name = %document.file_name,
        kind = ?document.kind,
        chars = document.text.chars().count(),
        "Extracted resume text"
    );

    Ok(Json(document))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::llm_client::stub::StubInvoker;
    use crate::routes::build_router;
    use crate::state::AppState;

    const BOUNDARY: &str = "skillmatch-test-boundary";

    fn multipart_body(field: &str, file_name: &str, content_type: &str, content: &str) -> String {
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n\
             {content}\r\n\
             --{BOUNDARY}--\r\n"
        )
    }

    async fn upload(body: String) -> (StatusCode, Value) {
        let app = build_router(AppState::for_tests(Arc::new(StubInvoker::replying(""))));
        let response = app
            .oneshot(
                Request::post("/api/v1/resumes/extract-text")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_extracts_text_from_markdown_upload() {
        let (status, body) = upload(multipart_body(
            "file",
            "resume.md",
            "text/markdown",
            "# Jane Doe\n\nRust, Kubernetes",
        ))
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fileName"], "resume.md");
        assert_eq!(body["kind"], "markdown");
        assert_eq!(body["text"], "# Jane Doe\n\nRust, Kubernetes");
    }

    #[tokio::test]
    async fn test_missing_file_field_is_rejected() {
        let (status, body) =
            upload(multipart_body("attachment", "cv.txt", "text/plain", "x")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "multipart field 'file' is required");
    }

    #[tokio::test]
    async fn test_unsupported_upload_is_rejected() {
        let (status, body) =
            upload(multipart_body("file", "cv.docx", "application/msword", "binary")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        // AppState::for_tests caps uploads at 64 KiB.
        let content = "a".repeat(70 * 1024);
        let (status, body) = upload(multipart_body("file", "cv.txt", "text/plain", &content)).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
    }
}
