pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers;
use crate::documents::handlers as document_handlers;
use crate::state::AppState;

/// Multipart framing on top of the file itself.
const UPLOAD_ENVELOPE_BYTES: usize = 16 * 1024;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes + UPLOAD_ENVELOPE_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Analysis API
        .route("/api/v1/analysis/match", post(handlers::handle_match))
        .route(
            "/api/v1/analysis/resources",
            post(handlers::handle_learning_resources),
        )
        .route("/api/v1/analysis/market", post(handlers::handle_market))
        // Resume API
        .route("/api/v1/resumes/tailor", post(handlers::handle_tailor))
        .route(
            "/api/v1/resumes/extract-text",
            post(document_handlers::handle_extract_text)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::llm_client::stub::StubInvoker;

    #[tokio::test]
    async fn test_health_reports_service_name() {
        let app = build_router(AppState::for_tests(Arc::new(StubInvoker::replying(""))));

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "skillmatch-api");
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let app = build_router(AppState::for_tests(Arc::new(StubInvoker::replying(""))));

        let response = app
            .oneshot(Request::get("/api/v1/jobs").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
