//! Text-generation collaborator: renders query rows into prose.
//!
//! Rendering is best-effort. Any failure maps to a `CollaboratorError` and
//! the pipeline falls back to returning the rows themselves; a broken
//! renderer never loses an answer.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::CollaboratorError;
use crate::query::types::{FilterSet, RowResult};

const SYSTEM_PROMPT: &str = "You are a climate data assistant. Respond based on the \
provided data, using tables or bullet points for clarity, especially for comparisons. \
If data is missing, note it clearly. Make the response informative with a friendly \
tone, and avoid unnecessary details.";

/// Prose rendering seam.
#[async_trait]
pub trait ProseRenderer: Send + Sync {
    /// Render the rows for a question into prose.
    async fn render(
        &self,
        question: &str,
        filters: &FilterSet,
        results: &[RowResult],
        units: &[String],
    ) -> Result<String, CollaboratorError>;
}

/// Renderer backed by an OpenAI-style chat completions endpoint.
pub struct ChatCompletionsRenderer {
    client: reqwest::Client,
    url: String,
    model: String,
    username: String,
    password: String,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl ChatCompletionsRenderer {
    pub fn new(
        url: impl Into<String>,
        model: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CollaboratorError::TextGeneration(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            model: model.into(),
            username: username.into(),
            password: password.into(),
            timeout_secs,
        })
    }
}

#[async_trait]
impl ProseRenderer for ChatCompletionsRenderer {
    async fn render(
        &self,
        question: &str,
        filters: &FilterSet,
        results: &[RowResult],
        units: &[String],
    ) -> Result<String, CollaboratorError> {
        let prompt = build_prompt(question, filters, results, units);
        debug!(len = prompt.len(), "rendering prompt");

        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
        });

        let response = self
            .client
            .post(&self.url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CollaboratorError::Timeout(self.timeout_secs)
                } else {
                    CollaboratorError::TextGeneration(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(CollaboratorError::TextGeneration(format!(
                "renderer returned {}",
                response.status()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::TextGeneration(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CollaboratorError::TextGeneration("no choices in response".into()))
    }
}

/// Assemble the user prompt: the question, then the rows in compact text,
/// with units so the model does not invent them.
fn build_prompt(
    question: &str,
    filters: &FilterSet,
    results: &[RowResult],
    units: &[String],
) -> String {
    let mut prompt = format!("Question: {question}\n");
    if results.iter().all(|r| r.row_count == 0) {
        prompt.push_str("No data found for this question.\n");
        return prompt;
    }
    if !units.is_empty() {
        prompt.push_str(&format!("Units: {}\n", units.join(", ")));
    }
    for (i, result) in results.iter().enumerate() {
        prompt.push_str(&format!(
            "Result {} ({} rows{}):\n",
            i + 1,
            result.row_count,
            if result.truncated { ", truncated" } else { "" }
        ));
        prompt.push_str(&result.columns.join(" | "));
        prompt.push('\n');
        for row in &result.rows {
            let line: Vec<String> = row.iter().map(render_cell).collect();
            prompt.push_str(&line.join(" | "));
            prompt.push('\n');
        }
    }
    if let Some(time) = &filters.time {
        prompt.push_str(&format!("Time filter: {}\n", serde_json::json!(time)));
    }
    prompt
}

fn render_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Plain-text fallback used when no renderer is configured or the renderer
/// failed; lists the rows verbatim.
pub fn degraded_rendering(results: &[RowResult]) -> String {
    if results.iter().all(|r| r.row_count == 0) {
        return "No data found for this question.".to_string();
    }
    let mut out = String::new();
    for result in results {
        out.push_str(&result.columns.join(" | "));
        out.push('\n');
        for row in &result.rows {
            let line: Vec<String> = row.iter().map(render_cell).collect();
            out.push_str(&line.join(" | "));
            out.push('\n');
        }
        if result.truncated {
            out.push_str("(truncated)\n");
        }
    }
    out
}
