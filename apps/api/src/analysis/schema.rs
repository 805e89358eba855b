//! Result schemas: the declared shape of every model response.
//!
//! One schema per operation. A schema is rendered two ways for the model
//! (`to_response_schema` for structured output, `output_skeleton` for prompt
//! directives) and is checked against the parsed reply by `validate`.

use std::fmt;

use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer { min: i64, max: i64 },
    TextList,
}

#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
    pub required: bool,
}

#[derive(Debug)]
pub enum SchemaShape {
    /// A single JSON object.
    Object(&'static [FieldSpec]),
    /// A JSON array whose items are objects with these fields.
    ListOf(&'static [FieldSpec]),
}

#[derive(Debug)]
pub struct ResultSchema {
    pub name: &'static str,
    pub shape: SchemaShape,
}

/// Every problem found while checking a parsed reply against its schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub struct SchemaViolation {
    pub schema: &'static str,
    pub problems: Vec<String>,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "response does not match the {} schema: {}",
            self.schema,
            self.problems.join("; ")
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Declared schemas
// ────────────────────────────────────────────────────────────────────────────

pub static MATCH_ANALYSIS: ResultSchema = ResultSchema {
    name: "match_analysis",
    shape: SchemaShape::Object(&[
        FieldSpec {
            name: "matchScore",
            kind: FieldKind::Integer { min: 0, max: 100 },
            description: "A score from 0 to 100 representing how well the resume matches the job description.",
            required: true,
        },
        FieldSpec {
            name: "matchSummary",
            kind: FieldKind::Text,
            description: "A concise, one-paragraph summary of the match, highlighting key strengths and weaknesses.",
            required: true,
        },
        FieldSpec {
            name: "strengths",
            kind: FieldKind::TextList,
            description: "A list of key skills and experiences from the resume that directly align with the job requirements.",
            required: true,
        },
        FieldSpec {
            name: "skillGaps",
            kind: FieldKind::TextList,
            description: "A list of important skills required by the job that are missing or not emphasized in the resume.",
            required: true,
        },
        FieldSpec {
            name: "transferableSkills",
            kind: FieldKind::TextList,
            description: "A list of skills from the resume that are not a direct match but are highly relevant and can be applied to the new role. For each skill, add a brief, parenthetical explanation of its relevance.",
            required: true,
        },
        FieldSpec {
            name: "atsKeywords",
            kind: FieldKind::TextList,
            description: "A list of crucial keywords from the job description that should be included in the resume to pass Applicant Tracking Systems (ATS).",
            required: true,
        },
        FieldSpec {
            name: "improvementSuggestions",
            kind: FieldKind::Text,
            description: "Actionable advice on how to tailor the resume for this specific job application, focusing on wording and structure.",
            required: true,
        },
    ]),
};

pub static LEARNING_RESOURCES: ResultSchema = ResultSchema {
    name: "learning_resources",
    shape: SchemaShape::ListOf(&[
        FieldSpec {
            name: "title",
            kind: FieldKind::Text,
            description: "The title of the learning resource.",
            required: true,
        },
        FieldSpec {
            name: "url",
            kind: FieldKind::Text,
            description: "The full URL to the learning resource.",
            required: true,
        },
    ]),
};

/// Grounded replies cannot be schema-constrained; this shape is sent as a prompt directive.
pub static MARKET_ANALYSIS: ResultSchema = ResultSchema {
    name: "market_analysis",
    shape: SchemaShape::Object(&[
        FieldSpec {
            name: "summary",
            kind: FieldKind::Text,
            description: "A brief summary of the current demand and outlook for this role.",
            required: true,
        },
        FieldSpec {
            name: "topSkills",
            kind: FieldKind::TextList,
            description: "The top 5-7 most in-demand technical skills.",
            required: false,
        },
        FieldSpec {
            name: "emergingSkills",
            kind: FieldKind::TextList,
            description: "3-5 emerging skills or technologies that are gaining importance.",
            required: false,
        },
        FieldSpec {
            name: "commonTools",
            kind: FieldKind::TextList,
            description: "Common tools and software associated with this role.",
            required: false,
        },
    ]),
};

pub static TAILORED_RESUME: ResultSchema = ResultSchema {
    name: "tailored_resume",
    shape: SchemaShape::Object(&[
        FieldSpec {
            name: "tailoredResumeText",
            kind: FieldKind::Text,
            description: "The full text of the professionally rewritten and tailored resume, formatted for clarity and ATS compatibility.",
            required: true,
        },
        FieldSpec {
            name: "changeSummary",
            kind: FieldKind::TextList,
            description: "A bulleted list of the most significant changes made to the resume, explaining the reasoning (e.g., 'Rephrased X to Y to better incorporate keyword Z').",
            required: true,
        },
    ]),
};

// ────────────────────────────────────────────────────────────────────────────
// Rendering
// ────────────────────────────────────────────────────────────────────────────

impl FieldKind {
    fn response_schema(&self, description: &str) -> Value {
        match self {
            FieldKind::Text => json!({ "type": "STRING", "description": description }),
            FieldKind::Integer { .. } => json!({ "type": "INTEGER", "description": description }),
            FieldKind::TextList => json!({
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": description,
            }),
        }
    }

    fn skeleton(&self) -> &'static str {
        match self {
            FieldKind::Text => "\"string\"",
            FieldKind::Integer { .. } => "0",
            FieldKind::TextList => "[\"string\"]",
        }
    }
}

fn object_response_schema(fields: &[FieldSpec]) -> Value {
    let properties: Map<String, Value> = fields
        .iter()
        .map(|f| (f.name.to_string(), f.kind.response_schema(f.description)))
        .collect();
    let required: Vec<&str> = fields.iter().filter(|f| f.required).map(|f| f.name).collect();
    let ordering: Vec<&str> = fields.iter().map(|f| f.name).collect();

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
        "propertyOrdering": ordering,
    })
}

fn object_skeleton(fields: &[FieldSpec], indent: &str) -> String {
    let body = fields
        .iter()
        .map(|f| format!("{indent}  \"{}\": {}", f.name, f.kind.skeleton()))
        .collect::<Vec<_>>()
        .join(",\n");
    format!("{{\n{body}\n{indent}}}")
}

impl ResultSchema {
    /// The `responseSchema` value for a structured-output generation request.
    pub fn to_response_schema(&self) -> Value {
        match &self.shape {
            SchemaShape::Object(fields) => object_response_schema(fields),
            SchemaShape::ListOf(fields) => json!({
                "type": "ARRAY",
                "items": object_response_schema(fields),
            }),
        }
    }

    /// A JSON-looking outline of the expected reply, for embedding in prompt text.
    pub fn output_skeleton(&self) -> String {
        match &self.shape {
            SchemaShape::Object(fields) => object_skeleton(fields, ""),
            SchemaShape::ListOf(fields) => format!("[\n  {}\n]", object_skeleton(fields, "  ")),
        }
    }

    /// Checks a parsed reply against the declared shape.
    ///
    /// Unknown fields are ignored. A `null` counts as missing.
    pub fn validate(&self, value: &Value) -> Result<(), SchemaViolation> {
        let mut problems = Vec::new();

        match &self.shape {
            SchemaShape::Object(fields) => check_object(fields, value, "", &mut problems),
            SchemaShape::ListOf(fields) => match value.as_array() {
                Some(items) => {
                    for (i, item) in items.iter().enumerate() {
                        check_object(fields, item, &format!("[{i}]."), &mut problems);
                    }
                }
                None => problems.push(format!("expected a JSON array, got {}", type_name(value))),
            },
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(SchemaViolation {
                schema: self.name,
                problems,
            })
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

fn check_object(fields: &[FieldSpec], value: &Value, prefix: &str, problems: &mut Vec<String>) {
    let Some(object) = value.as_object() else {
        problems.push(format!(
            "{prefix}expected a JSON object, got {}",
            type_name(value)
        ));
        return;
    };

    for field in fields {
        match object.get(field.name) {
            None | Some(Value::Null) => {
                if field.required {
                    problems.push(format!("{prefix}missing required field `{}`", field.name));
                }
            }
            Some(v) => {
                if let Some(problem) = check_field(field, v) {
                    problems.push(format!("{prefix}{problem}"));
                }
            }
        }
    }
}

fn check_field(field: &FieldSpec, value: &Value) -> Option<String> {
    match field.kind {
        FieldKind::Text => (!value.is_string()).then(|| {
            format!(
                "field `{}` must be a string, got {}",
                field.name,
                type_name(value)
            )
        }),
        FieldKind::Integer { min, max } => match value.as_i64() {
            Some(n) if (min..=max).contains(&n) => None,
            Some(n) => Some(format!(
                "field `{}` must be between {min} and {max}, got {n}",
                field.name
            )),
            None => Some(format!(
                "field `{}` must be an integer, got {}",
                field.name,
                type_name(value)
            )),
        },
        FieldKind::TextList => match value.as_array() {
            Some(items) => items
                .iter()
                .position(|item| !item.is_string())
                .map(|i| format!("field `{}` item {i} must be a string", field.name)),
            None => Some(format!(
                "field `{}` must be an array of strings, got {}",
                field.name,
                type_name(value)
            )),
        },
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
