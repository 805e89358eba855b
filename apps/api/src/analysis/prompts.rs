// All LLM prompt templates for the analysis pipeline.
// Placeholders are `{name}` tokens, filled once by `fill_template`.

use crate::analysis::schema::MARKET_ANALYSIS;

/// Used in place of a missing industry in the market prompt.
pub const DEFAULT_INDUSTRY: &str = "general";

/// Match analysis prompt. Replace: {resume_text}, {job_description}
pub const MATCH_PROMPT_TEMPLATE: &str = r#"You are an expert career coach and resume analyst specializing in tech roles. Your task is to provide a detailed analysis comparing the provided resume against the given job description.

Analyze the resume text and the job description thoroughly. Then, generate a JSON object that strictly adheres to the provided schema. The analysis should be professional, insightful, and constructive.

Specifically for 'transferableSkills', identify skills from the resume that aren't direct keywords in the job description but are highly relevant. For example, 'Project Management in construction' could be transferable to 'Tech Project Coordination'. For each transferable skill, add a brief, parenthetical explanation of its relevance.

--- RESUME TEXT ---
{resume_text}
--- END RESUME TEXT ---

--- JOB DESCRIPTION ---
{job_description}
--- END JOB DESCRIPTION ---

Now, provide the analysis in the specified JSON format."#;

/// Learning resource lookup prompt. Replace: {skill}
pub const RESOURCES_PROMPT_TEMPLATE: &str = r#"You are a helpful assistant that finds high-quality, free learning resources.
Find 2-3 excellent and free online resources (like tutorials, official documentation, or comprehensive guides) for learning the following skill: "{skill}".
Provide the output in the specified JSON format."#;

/// Market analysis prompt (grounded, no schema constraint).
/// Replace: {job_title}, {industry}, {output_skeleton}
pub const MARKET_PROMPT_TEMPLATE: &str = r#"Analyze the current job market for a "{job_title}" role, focusing on the "{industry}" industry.
Use your knowledge and the latest information from Google Search to provide a detailed report.

Your response must include:
1.  A brief summary of the current demand and outlook for this role.
2.  A list of the top 5-7 most in-demand technical skills.
3.  A list of 3-5 emerging skills or technologies that are gaining importance.
4.  A list of common tools and software associated with this role.

Please structure your entire response as a single, valid JSON object enclosed in a markdown code block (```json ... ```). Do not include any text outside of this JSON block.

The JSON object must have the following structure:
{output_skeleton}"#;

/// Resume tailoring prompt. Replace: {resume_text}, {job_description}
pub const TAILOR_PROMPT_TEMPLATE: &str = r#"You are an expert resume writer and career coach. Your task is to rewrite the provided 'base resume' to be perfectly tailored for the given 'job description'.

Follow these instructions carefully:
1.  **Analyze Both Documents**: Thoroughly analyze the resume and the job description to understand the candidate's experience and the employer's needs.
2.  **Integrate Keywords**: Naturally weave relevant keywords from the job description into the resume's experience and skills sections.
3.  **Rephrase Bullet Points**: Rewrite bullet points to be action-oriented and results-driven. Use the STAR (Situation, Task, Action, Result) method where applicable and quantify achievements with metrics (e.g., "Increased efficiency by 15%").
4.  **Align with Role**: Reframe existing experiences to highlight the aspects most relevant to the target job.
5.  **Maintain Honesty**: Do not invent new experiences or skills. Only rephrase and reframe the existing content from the base resume.
6.  **Format for ATS**: Ensure the final text maintains a clean, professional, and ATS-friendly format. Use standard section headers (e.g., "Professional Experience", "Skills", "Education").
7.  **Summarize Changes**: Provide a concise summary of the most impactful changes you made.

--- BASE RESUME ---
{resume_text}
--- END BASE RESUME ---

--- JOB DESCRIPTION ---
{job_description}
--- END JOB DESCRIPTION ---

Now, generate a JSON object that strictly adheres to the provided schema."#;

pub fn build_match_prompt(resume_text: &str, job_description: &str) -> String {
    fill_template(
        MATCH_PROMPT_TEMPLATE,
        &[
            ("resume_text", resume_text),
            ("job_description", job_description),
        ],
    )
}

pub fn build_resources_prompt(skill: &str) -> String {
    fill_template(RESOURCES_PROMPT_TEMPLATE, &[("skill", skill)])
}

/// A missing or blank industry falls back to `DEFAULT_INDUSTRY`.
pub fn build_market_prompt(job_title: &str, industry: Option<&str>) -> String {
    let industry = industry
        .filter(|i| !i.trim().is_empty())
        .unwrap_or(DEFAULT_INDUSTRY);
    let skeleton = MARKET_ANALYSIS.output_skeleton();

    fill_template(
        MARKET_PROMPT_TEMPLATE,
        &[
            ("job_title", job_title),
            ("industry", industry),
            ("output_skeleton", &skeleton),
        ],
    )
}

pub fn build_tailor_prompt(resume_text: &str, job_description: &str) -> String {
    fill_template(
        TAILOR_PROMPT_TEMPLATE,
        &[
            ("resume_text", resume_text),
            ("job_description", job_description),
        ],
    )
}

/// Substitutes `{key}` placeholders in a single left-to-right pass.
///
/// Substituted values are never rescanned, so caller text that happens to
/// contain `{job_description}` lands in the prompt verbatim. Braces that do
/// not name a known key are copied through unchanged.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let extra: usize = values.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let substitution = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close))
        });

        match substitution {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
