//! AI analysis pipeline.
//!
//! Flow per operation: build prompt → one `ModelInvoker` call → parse →
//! schema validation → typed result. Nothing is shared between calls.
//!
//! Every failure is logged here with its cause and replaced by an
//! `AnalysisError` carrying a fixed, user-presentable message.

pub mod handlers;
pub mod models;
pub mod parser;
pub mod prompts;
pub mod schema;

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::analysis::models::{
    JobMatchResult, LearningResource, MarketAnalysisResult, MarketReport, ResumeTailorResult,
};
use crate::analysis::schema::{
    ResultSchema, SchemaViolation, LEARNING_RESOURCES, MARKET_ANALYSIS, MATCH_ANALYSIS,
    TAILORED_RESUME,
};
use crate::llm_client::{InvocationConfig, LlmError, ModelInvoker, ResponseMode};

/// The four analysis operations exposed to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    MatchAnalysis,
    LearningResources,
    MarketAnalysis,
    ResumeTailoring,
}

impl Operation {
    pub fn schema(self) -> &'static ResultSchema {
        match self {
            Operation::MatchAnalysis => &MATCH_ANALYSIS,
            Operation::LearningResources => &LEARNING_RESOURCES,
            Operation::MarketAnalysis => &MARKET_ANALYSIS,
            Operation::ResumeTailoring => &TAILORED_RESUME,
        }
    }

    /// Analytical lookups run cold; rewriting gets a little more room.
    pub fn invocation_config(self) -> InvocationConfig {
        match self {
            Operation::MatchAnalysis => InvocationConfig {
                mode: ResponseMode::Structured(self.schema()),
                temperature: 0.2,
            },
            Operation::LearningResources => InvocationConfig {
                mode: ResponseMode::Structured(self.schema()),
                temperature: 0.1,
            },
            Operation::MarketAnalysis => InvocationConfig {
                mode: ResponseMode::Grounded,
                temperature: 0.1,
            },
            Operation::ResumeTailoring => InvocationConfig {
                mode: ResponseMode::Structured(self.schema()),
                temperature: 0.3,
            },
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::MatchAnalysis => "match analysis",
            Operation::LearningResources => "learning resources",
            Operation::MarketAnalysis => "market analysis",
            Operation::ResumeTailoring => "resume tailoring",
        };
        f.write_str(name)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Why a pipeline run failed. Logged, never shown to end users.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("model invocation failed: {0}")]
    Invocation(#[from] LlmError),

    #[error("AI response did not contain a valid JSON block")]
    MissingJsonBlock,

    #[error("AI response is not valid JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),

    #[error(transparent)]
    Schema(#[from] SchemaViolation),

    #[error("AI response could not be mapped onto the result type: {0}")]
    Mapping(#[source] serde_json::Error),
}

/// The single error kind each public operation returns.
///
/// `Display` is the fixed user-facing message; the cause is kept as `source()`.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AnalysisError {
    operation: Operation,
    message: String,
    #[source]
    cause: PipelineError,
}

impl AnalysisError {
    fn new(operation: Operation, cause: PipelineError, subject: Option<&str>) -> Self {
        let message = match (operation, subject) {
            (Operation::LearningResources, Some(skill)) => {
                format!("Failed to find resources for \"{skill}\".")
            }
            (Operation::LearningResources, None) => {
                "Failed to find learning resources.".to_string()
            }
            (Operation::MatchAnalysis, _) => {
                "Failed to get analysis from AI. Please try again later.".to_string()
            }
            (Operation::MarketAnalysis, _) => {
                "Failed to get market analysis from AI. Please try again later.".to_string()
            }
            (Operation::ResumeTailoring, _) => {
                "Failed to get tailored resume from AI. Please try again later.".to_string()
            }
        };

        Self {
            operation,
            message,
            cause,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn cause(&self) -> &PipelineError {
        &self.cause
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Public operations
// ────────────────────────────────────────────────────────────────────────────

/// Scores a resume against a job description.
#[instrument(skip_all, fields(operation = %Operation::MatchAnalysis))]
pub async fn analyze_resume_and_job(
    resume_text: &str,
    job_description: &str,
    llm: &dyn ModelInvoker,
) -> Result<JobMatchResult, AnalysisError> {
    let prompt = prompts::build_match_prompt(resume_text, job_description);

    let result: JobMatchResult = run_structured(llm, Operation::MatchAnalysis, &prompt)
        .await
        .map_err(|e| fail(Operation::MatchAnalysis, e, None))?;

    info!(match_score = result.match_score, "Match analysis complete");
    Ok(result)
}

/// Looks up a few free learning resources for one skill.
#[instrument(skip(llm), fields(operation = %Operation::LearningResources))]
pub async fn find_learning_resources(
    skill: &str,
    llm: &dyn ModelInvoker,
) -> Result<Vec<LearningResource>, AnalysisError> {
    let prompt = prompts::build_resources_prompt(skill);

    let resources: Vec<LearningResource> =
        run_structured(llm, Operation::LearningResources, &prompt)
            .await
            .map_err(|e| fail(Operation::LearningResources, e, Some(skill)))?;

    info!(count = resources.len(), "Learning resources found");
    Ok(resources)
}

/// Summarizes market demand for a role, grounded in live web search.
///
/// `industry` of `None` (or blank) is analyzed as the "general" industry.
#[instrument(skip(llm), fields(operation = %Operation::MarketAnalysis))]
pub async fn analyze_job_market(
    job_title: &str,
    industry: Option<&str>,
    llm: &dyn ModelInvoker,
) -> Result<MarketAnalysisResult, AnalysisError> {
    let prompt = prompts::build_market_prompt(job_title, industry);

    let result = run_grounded_market(llm, &prompt)
        .await
        .map_err(|e| fail(Operation::MarketAnalysis, e, None))?;

    info!(sources = result.sources.len(), "Market analysis complete");
    Ok(result)
}

/// Rewrites a resume for a specific job description.
#[instrument(skip_all, fields(operation = %Operation::ResumeTailoring))]
pub async fn tailor_resume(
    resume_text: &str,
    job_description: &str,
    llm: &dyn ModelInvoker,
) -> Result<ResumeTailorResult, AnalysisError> {
    let prompt = prompts::build_tailor_prompt(resume_text, job_description);

    let result: ResumeTailorResult = run_structured(llm, Operation::ResumeTailoring, &prompt)
        .await
        .map_err(|e| fail(Operation::ResumeTailoring, e, None))?;

    info!(changes = result.change_summary.len(), "Resume tailoring complete");
    Ok(result)
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline steps
// ────────────────────────────────────────────────────────────────────────────

fn fail(operation: Operation, cause: PipelineError, subject: Option<&str>) -> AnalysisError {
    error!(%operation, error = %cause, "AI analysis failed");
    AnalysisError::new(operation, cause, subject)
}

/// Schema-constrained call: parse the whole reply, validate, map.
async fn run_structured<T: DeserializeOwned>(
    llm: &dyn ModelInvoker,
    operation: Operation,
    prompt: &str,
) -> Result<T, PipelineError> {
    let raw = llm.invoke(prompt, &operation.invocation_config()).await?;

    let value = parser::parse_structured(&raw.text).map_err(|e| {
        error!(raw_output = %raw.text, "Structured AI response is not valid JSON");
        PipelineError::MalformedJson(e)
    })?;

    validate_and_map(operation.schema(), value)
}

/// Grounded call: pull the fenced JSON block out of free text, then attach sources.
async fn run_grounded_market(
    llm: &dyn ModelInvoker,
    prompt: &str,
) -> Result<MarketAnalysisResult, PipelineError> {
    let operation = Operation::MarketAnalysis;
    let raw = llm.invoke(prompt, &operation.invocation_config()).await?;

    let Some(block) = parser::extract_fenced_json(&raw.text) else {
        error!(raw_output = %raw.text, "Grounded AI response has no JSON block");
        return Err(PipelineError::MissingJsonBlock);
    };

    let value: Value = serde_json::from_str(block).map_err(|e| {
        error!(raw_output = %raw.text, "Grounded AI response JSON block is malformed");
        PipelineError::MalformedJson(e)
    })?;

    let report: MarketReport = validate_and_map(operation.schema(), value)?;
    let sources = parser::collect_sources(&raw.citations);

    Ok(report.with_sources(sources))
}

fn validate_and_map<T: DeserializeOwned>(
    schema: &ResultSchema,
    value: Value,
) -> Result<T, PipelineError> {
    schema.validate(&value)?;
    serde_json::from_value(value).map_err(PipelineError::Mapping)
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;
    use crate::llm_client::stub::{citation, StubInvoker};

    const MATCH_REPLY: &str = r#"{"matchScore":40,"matchSummary":"Partial fit.","strengths":["Python"],"skillGaps":["Go","Kubernetes"],"transferableSkills":[],"atsKeywords":["Go"],"improvementSuggestions":"Learn Go."}"#;

    #[tokio::test]
    async fn test_match_analysis_end_to_end() {
        let llm = StubInvoker::replying(MATCH_REPLY);

        let result = analyze_resume_and_job(
            "5 years Python, Django",
            "Senior Backend Engineer, Go, Kubernetes",
            &llm,
        )
        .await
        .unwrap();

        assert_eq!(result.match_score, 40);
        assert_eq!(result.skill_gaps, vec!["Go", "Kubernetes"]);
        assert_eq!(result.strengths, vec!["Python"]);
        assert!(result.transferable_skills.is_empty());

        let calls = llm.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("5 years Python, Django"));
        assert!(calls[0].0.contains("Senior Backend Engineer, Go, Kubernetes"));
        assert!(matches!(
            calls[0].1.mode,
            ResponseMode::Structured(schema) if schema.name == "match_analysis"
        ));
        assert!((calls[0].1.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_match_analysis_tolerates_padding_whitespace() {
        let llm = StubInvoker::replying(format!("\n\n  {MATCH_REPLY}  \n"));
        let result = analyze_resume_and_job("r", "j", &llm).await.unwrap();
        assert_eq!(result.match_score, 40);
    }

    #[tokio::test]
    async fn test_malformed_json_fails_instead_of_partial_result() {
        let llm = StubInvoker::replying("{not valid json");

        let err = analyze_resume_and_job("r", "j", &llm).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to get analysis from AI. Please try again later."
        );
        assert_eq!(err.operation(), Operation::MatchAnalysis);
        assert!(matches!(err.cause(), PipelineError::MalformedJson(_)));
        assert!(err.source().is_some());
    }

    #[tokio::test]
    async fn test_missing_required_field_is_a_schema_failure() {
        let llm = StubInvoker::replying(r#"{"matchScore": 55, "matchSummary": "ok"}"#);

        let err = analyze_resume_and_job("r", "j", &llm).await.unwrap_err();

        match err.cause() {
            PipelineError::Schema(violation) => {
                assert!(violation
                    .problems
                    .contains(&"missing required field `improvementSuggestions`".to_string()));
            }
            other => panic!("expected schema violation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_rejected() {
        let reply = MATCH_REPLY.replace("\"matchScore\":40", "\"matchScore\":101");
        let llm = StubInvoker::replying(reply);

        let err = analyze_resume_and_job("r", "j", &llm).await.unwrap_err();
        assert!(matches!(err.cause(), PipelineError::Schema(_)));
    }

    #[tokio::test]
    async fn test_invocation_failure_is_collapsed_to_fixed_message() {
        let llm = StubInvoker::failing(401, "API key not valid");

        let err = tailor_resume("r", "j", &llm).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to get tailored resume from AI. Please try again later."
        );
        assert!(!err.to_string().contains("API key"));
        assert!(matches!(err.cause(), PipelineError::Invocation(_)));
    }

    #[tokio::test]
    async fn test_learning_resources_returns_list() {
        let llm = StubInvoker::replying(
            r#"[{"title":"The Go Tour","url":"https://go.dev/tour/"},{"title":"Effective Go","url":"https://go.dev/doc/effective_go"}]"#,
        );

        let resources = find_learning_resources("Go", &llm).await.unwrap();

        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].title, "The Go Tour");
        assert!(llm.last_prompt().contains("\"Go\""));
        let temperature = llm.calls()[0].1.temperature;
        assert!((temperature - 0.1).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_learning_resources_error_names_the_skill() {
        let llm = StubInvoker::replying(r#"{"title": "not a list"}"#);

        let err = find_learning_resources("Kubernetes", &llm)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Failed to find resources for \"Kubernetes\".");
    }

    #[tokio::test]
    async fn test_market_analysis_extracts_block_and_dedups_sources() {
        let text = "Sure! Here's the analysis.\n```json\n{\"summary\":\"Strong demand.\",\"topSkills\":[\"SQL\"],\"emergingSkills\":[\"dbt\"],\"commonTools\":[\"Airflow\"]}\n```\nLet me know if you need more.";
        let llm = StubInvoker::with_citations(
            text,
            vec![
                citation(Some("A"), Some("a")),
                citation(Some("B"), Some("b")),
                citation(Some("A dup"), Some("a")),
                citation(Some("Placeholder"), Some("#")),
            ],
        );

        let result = analyze_job_market("Data Engineer", None, &llm).await.unwrap();

        assert_eq!(result.summary, "Strong demand.");
        assert_eq!(result.top_skills, vec!["SQL"]);
        assert_eq!(result.common_tools, vec!["Airflow"]);
        let uris: Vec<&str> = result.sources.iter().map(|s| s.uri.as_str()).collect();
        assert_eq!(uris, vec!["a", "b"]);

        let (prompt, config) = &llm.calls()[0];
        assert!(prompt.contains("\"general\" industry"));
        assert!(matches!(config.mode, ResponseMode::Grounded));
    }

    #[tokio::test]
    async fn test_market_analysis_without_block_fails() {
        let llm = StubInvoker::replying(
            "{\"summary\":\"unfenced\",\"topSkills\":[],\"emergingSkills\":[],\"commonTools\":[]}",
        );

        let err = analyze_job_market("Data Engineer", Some("Retail"), &llm)
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to get market analysis from AI. Please try again later."
        );
        assert!(matches!(err.cause(), PipelineError::MissingJsonBlock));
    }

    #[tokio::test]
    async fn test_market_analysis_with_broken_block_fails() {
        let llm = StubInvoker::replying("```json\n{\"summary\": \n```");

        let err = analyze_job_market("SRE", None, &llm).await.unwrap_err();
        assert!(matches!(err.cause(), PipelineError::MalformedJson(_)));
    }

    #[tokio::test]
    async fn test_market_analysis_defaults_missing_lists() {
        let llm = StubInvoker::replying("```json\n{\"summary\": \"Quiet market.\"}\n```");

        let result = analyze_job_market("Archivist", None, &llm).await.unwrap();

        assert!(result.top_skills.is_empty());
        assert!(result.sources.is_empty());
    }

    #[tokio::test]
    async fn test_tailor_resume_uses_higher_temperature() {
        let llm = StubInvoker::replying(
            r#"{"tailoredResumeText":"PROFESSIONAL EXPERIENCE\n...","changeSummary":["Added Go keyword"]}"#,
        );

        let result = tailor_resume("base", "jd", &llm).await.unwrap();

        assert_eq!(result.change_summary, vec!["Added Go keyword"]);
        let temperature = llm.calls()[0].1.temperature;
        assert!((temperature - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_every_structured_operation_sends_its_own_schema() {
        for operation in [
            Operation::MatchAnalysis,
            Operation::LearningResources,
            Operation::ResumeTailoring,
        ] {
            match operation.invocation_config().mode {
                ResponseMode::Structured(schema) => {
                    assert_eq!(schema.name, operation.schema().name)
                }
                ResponseMode::Grounded => panic!("{operation} should be structured"),
            }
        }
    }
}
