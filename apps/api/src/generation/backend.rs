//! Section backends — the single `generate` capability the pipeline dispatches to.
//!
//! `LlmSectionBackend` wraps one configured `LlmClient`; `VerbatimBackend`
//! formats portfolio data deterministically with no external call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::generation::section::Section;
use crate::llm_client::prompts::format_section_prompt;
use crate::llm_client::{strip_code_fences, LlmClient, LlmError};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("backend call timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("backend returned empty text")]
    EmptyResponse,

    #[error("no generation prompt for section '{0}'")]
    UnsupportedSection(Section),

    #[error("portfolio has no data for section '{0}'")]
    MissingData(Section),

    #[error("malformed section data: {0}")]
    MalformedData(String),
}

/// Turns a prompt plus one section's data into plain section text.
#[async_trait]
pub trait SectionBackend: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        section_data: &Value,
        job_description: &str,
    ) -> Result<String, GenerationError>;

    fn name(&self) -> &str;
}

// ────────────────────────────────────────────────────────────────────────────
// LLM-backed
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmSectionBackend {
    client: Arc<dyn LlmClient>,
    system_prompt: String,
    timeout: Duration,
    name: String,
}

impl LlmSectionBackend {
    pub fn new(client: Arc<dyn LlmClient>, system_prompt: impl Into<String>, timeout: Duration) -> Self {
        let name = format!("{}:{}", client.provider(), client.model());
        Self {
            client,
            system_prompt: system_prompt.into(),
            timeout,
            name,
        }
    }
}

#[async_trait]
impl SectionBackend for LlmSectionBackend {
    async fn generate(
        &self,
        prompt: &str,
        section_data: &Value,
        job_description: &str,
    ) -> Result<String, GenerationError> {
        let data = serde_json::to_string_pretty(section_data)
            .map_err(|e| GenerationError::MalformedData(e.to_string()))?;
        let message = format_section_prompt(prompt, &data, job_description);

        let reply = tokio::time::timeout(
            self.timeout,
            self.client.complete(&self.system_prompt, &message),
        )
        .await
        .map_err(|_| GenerationError::Timeout(self.timeout))??;

        let text = strip_code_fences(&reply);
        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        debug!(backend = %self.name, chars = text.len(), "section text generated");
        Ok(text.to_string())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Verbatim
// ────────────────────────────────────────────────────────────────────────────

/// Hardcode mode. Ignores the prompt and job description.
///
/// Output uses the same plain-text conventions the LLM is asked for:
/// - strings pass through trimmed
/// - an object becomes `Label: value` lines in field order
/// - a list of objects becomes one entry per object: a `## ` heading built from
///   its scalar fields joined with ` | `, then `- ` bullets from its string lists;
///   an object with no scalar fields falls back to `Label: value` lines
/// - a list of scalars becomes `- ` bullets
#[derive(Debug, Default, Clone, Copy)]
pub struct VerbatimBackend;

#[async_trait]
impl SectionBackend for VerbatimBackend {
    async fn generate(
        &self,
        _prompt: &str,
        section_data: &Value,
        _job_description: &str,
    ) -> Result<String, GenerationError> {
        format_verbatim(section_data)
    }

    fn name(&self) -> &str {
        "verbatim"
    }
}

pub fn format_verbatim(data: &Value) -> Result<String, GenerationError> {
    match data {
        Value::Null => Err(GenerationError::MalformedData("section data is null".into())),
        Value::Object(fields) => Ok(field_lines(fields).join("\n")),
        Value::Array(items) => {
            let entries = items
                .iter()
                .map(format_entry)
                .collect::<Result<Vec<_>, _>>()?;
            // Bullets of a scalar list stay in one run.
            let separator = if items.iter().all(|i| scalar_text(i).is_some()) {
                "\n"
            } else {
                "\n\n"
            };
            Ok(entries
                .into_iter()
                .filter(|e| !e.is_empty())
                .collect::<Vec<_>>()
                .join(separator))
        }
        scalar => Ok(scalar_text(scalar).unwrap_or_default()),
    }
}

fn format_entry(item: &Value) -> Result<String, GenerationError> {
    match item {
        Value::Null => Err(GenerationError::MalformedData("null list entry".into())),
        Value::Object(fields) => {
            let heading: Vec<String> = fields.values().filter_map(scalar_text).collect();
            if heading.is_empty() {
                return Ok(field_lines(fields).join("\n"));
            }

            let mut lines = vec![format!("## {}", heading.join(" | "))];
            for value in fields.values() {
                if let Value::Array(items) = value {
                    lines.extend(items.iter().filter_map(scalar_text).map(|s| format!("- {s}")));
                }
            }
            Ok(lines.join("\n"))
        }
        Value::Array(_) => Err(GenerationError::MalformedData("nested list entry".into())),
        scalar => Ok(scalar_text(scalar)
            .map(|s| format!("- {s}"))
            .unwrap_or_default()),
    }
}

fn field_lines(fields: &Map<String, Value>) -> Vec<String> {
    fields
        .iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::Array(items) => {
                    let parts: Vec<String> = items.iter().filter_map(scalar_text).collect();
                    (!parts.is_empty()).then(|| parts.join(", "))
                }
                other => scalar_text(other),
            }?;
            Some(format!("{}: {}", label(key), text))
        })
        .collect()
}

/// Non-empty text of a string, number or bool.
fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// `job_title` -> `Job title`.
fn label(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
