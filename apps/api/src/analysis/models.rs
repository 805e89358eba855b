//! Request and result types for the analysis pipeline.
//!
//! Field names serialize in camelCase, matching the browser UI.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Requests
// ────────────────────────────────────────────────────────────────────────────

/// Resume vs. job description match request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub resume_text: String,
    pub job_description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningResourcesRequest {
    pub skill: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketAnalysisRequest {
    pub job_title: String,
    #[serde(default)]
    pub industry: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailorRequest {
    pub resume_text: String,
    pub job_description: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Results
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMatchResult {
    /// 0 – 100
    pub match_score: u8,
    pub match_summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub skill_gaps: Vec<String>,
    #[serde(default)]
    pub transferable_skills: Vec<String>,
    #[serde(default)]
    pub ats_keywords: Vec<String>,
    pub improvement_suggestions: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningResource {
    pub title: String,
    pub url: String,
}

/// A web page the grounded market report cited. `uri` is never the "#" placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketAnalysisResult {
    pub summary: String,
    pub top_skills: Vec<String>,
    pub emerging_skills: Vec<String>,
    pub common_tools: Vec<String>,
    pub sources: Vec<GroundingSource>,
}

/// The JSON body the model writes for a market report, before sources are attached.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketReport {
    pub summary: String,
    #[serde(default)]
    pub top_skills: Vec<String>,
    #[serde(default)]
    pub emerging_skills: Vec<String>,
    #[serde(default)]
    pub common_tools: Vec<String>,
}

impl MarketReport {
    pub fn with_sources(self, sources: Vec<GroundingSource>) -> MarketAnalysisResult {
        MarketAnalysisResult {
            summary: self.summary,
            top_skills: self.top_skills,
            emerging_skills: self.emerging_skills,
            common_tools: self.common_tools,
            sources,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeTailorResult {
    pub tailored_resume_text: String,
    #[serde(default)]
    pub change_summary: Vec<String>,
}
