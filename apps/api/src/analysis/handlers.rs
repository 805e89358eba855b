//! Axum route handlers for the Analysis API.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::analysis::models::{
    AnalysisRequest, JobMatchResult, LearningResource, LearningResourcesRequest,
    MarketAnalysisRequest, MarketAnalysisResult, ResumeTailorResult, TailorRequest,
};
use crate::analysis::{
    analyze_job_market, analyze_resume_and_job, find_learning_resources, tailor_resume,
};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LearningResourcesResponse {
    pub resources: Vec<LearningResource>,
}

fn require_text(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// POST /api/v1/analysis/match
pub async fn handle_match(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<JobMatchResult>, AppError> {
    require_text(&request.resume_text, "resumeText")?;
    require_text(&request.job_description, "jobDescription")?;

    let result = analyze_resume_and_job(
        &request.resume_text,
        &request.job_description,
        state.llm.as_ref(),
    )
    .await?;

    Ok(Json(result))
}

/// POST /api/v1/analysis/resources
pub async fn handle_learning_resources(
    State(state): State<AppState>,
    Json(request): Json<LearningResourcesRequest>,
) -> Result<Json<LearningResourcesResponse>, AppError> {
    require_text(&request.skill, "skill")?;

    let resources = find_learning_resources(request.skill.trim(), state.llm.as_ref()).await?;

    Ok(Json(LearningResourcesResponse { resources }))
}

/// POST /api/v1/analysis/market
pub async fn handle_market(
    State(state): State<AppState>,
    Json(request): Json<MarketAnalysisRequest>,
) -> Result<Json<MarketAnalysisResult>, AppError> {
    require_text(&request.job_title, "jobTitle")?;

    let result = analyze_job_market(
        &request.job_title,
        request.industry.as_deref(),
        state.llm.as_ref(),
    )
    .await?;

    Ok(Json(result))
}

/// POST /api/v1/resumes/tailor
pub async fn handle_tailor(
    State(state): State<AppState>,
    Json(request): Json<TailorRequest>,
) -> Result<Json<ResumeTailorResult>, AppError> {
    require_text(&request.resume_text, "resumeText")?;
    require_text(&request.job_description, "jobDescription")?;

    let result = tailor_resume(
        &request.resume_text,
        &request.job_description,
        state.llm.as_ref(),
    )
    .await?;

    Ok(Json(result))
}
