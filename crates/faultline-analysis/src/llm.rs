//! Gemini client implementing both remote capabilities.
//!
//! Calls the `generateContent` endpoint with a single text prompt. The
//! summary is cleaned of markdown artifacts; the enhancement response must
//! be a JSON array of suggestion objects, anything else yields no extras.

use std::time::Duration;

use async_trait::async_trait;
use faultline_core::{
    Priority, Provenance, RemediationSuggestion, SuggestionCategory, SystemReport, SYSTEM_TARGET,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::enhance::{EnhancementRequest, RemediationEnhancer};
use crate::error::ExternalError;
use crate::summary::{Summarizer, Summary, SUMMARY_HEADING};

/// Environment variable consulted when no key is configured.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    /// Build a client from configuration. Fails with `Unavailable` when no
    /// API key is configured or present in the environment.
    pub fn new(config: &LlmConfig) -> Result<Self, ExternalError> {
        let api_key = resolve_api_key(config.api_key.as_deref(), std::env::var(API_KEY_ENV).ok())
            .ok_or_else(|| {
                ExternalError::Unavailable(format!(
                    "Gemini API key is required. Set llm.api_key or {API_KEY_ENV}."
                ))
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: String) -> Result<String, ExternalError> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let body = GenerateRequest::from_prompt(prompt);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ExternalError::Protocol(format!(
                "Gemini API error ({status}): {error_text}"
            )));
        }

        let parsed: GenerateResponse = response.json().await?;
        Ok(parsed.text())
    }
}

fn resolve_api_key(configured: Option<&str>, from_env: Option<String>) -> Option<String> {
    let non_empty = |k: &str| {
        let k = k.trim();
        (!k.is_empty()).then(|| k.to_string())
    };
    configured
        .and_then(non_empty)
        .or_else(|| from_env.as_deref().and_then(non_empty))
}

#[async_trait]
impl Summarizer for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn summarize(&self, report: &SystemReport) -> Result<Summary, ExternalError> {
        let raw = self.generate(summary_prompt(report)).await?;
        let clean = clean_text(&raw);
        if clean.is_empty() {
            return Err(ExternalError::Protocol("empty summary response".to_string()));
        }
        Ok(Summary {
            text: format!(
                "{SUMMARY_HEADING}\nPowered by Gemini ({})\n\n{clean}",
                self.model
            ),
            llm_used: true,
        })
    }
}

#[async_trait]
impl RemediationEnhancer for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn enhance(
        &self,
        request: EnhancementRequest<'_>,
    ) -> Result<Vec<RemediationSuggestion>, ExternalError> {
        let raw = self.generate(enhancement_prompt(&request)).await?;
        Ok(parse_suggestions(&raw))
    }
}

// ── Prompts ──────────────────────────────────────────────────────

fn summary_prompt(report: &SystemReport) -> String {
    let view = serde_json::json!({
        "system_name": report.system_name,
        "overall_resilience_score": report.overall_resilience_score,
        "worst_case_severity": report.worst_case_severity,
        "scenarios": report.failure_scenarios,
        "security_risks": report.security_risks,
    });

    format!(
        "You are an expert Site Reliability Engineer and Security Architect.\n\
         You are given the JSON representation of an automated resilience and security \
         analysis for a software system.\n\n\
         overall_resilience_score is on a 0-10 scale where 0-3 is LOW resilience, 3-7 is \
         MODERATE resilience, and 7-10 is HIGH resilience. Align your language with this \
         scale.\n\n\
         Tasks:\n\
         1. Provide a clear overall assessment using the correct resilience category.\n\
         2. Highlight the most critical failure scenarios and their real-world impact.\n\
         3. Summarize the security posture in practical terms.\n\
         4. Recommend 2-4 high-impact improvements.\n\n\
         Use clean professional language. Do not use markdown, bullet symbols, asterisks, \
         or hashes.\n\n\
         JSON Input:\n{view}"
    )
}

fn enhancement_prompt(request: &EnhancementRequest<'_>) -> String {
    let view = serde_json::json!({
        "system_name": request.architecture.system_name(),
        "metrics": request.metrics,
        "scenarios": request.scenarios,
        "security_risks": request.risks,
    });
    let base: Vec<serde_json::Value> = request
        .local
        .iter()
        .map(|s| {
            serde_json::json!({
                "category": s.category,
                "target": s.target,
                "priority": s.priority,
                "title": s.title,
            })
        })
        .collect();
    let base = serde_json::Value::Array(base);

    format!(
        "You are an experienced Site Reliability Engineer and Security Architect.\n\n\
         1) A JSON report about a system's resilience and security:\n{view}\n\n\
         2) The existing remediation suggestions:\n{base}\n\n\
         Propose 2-4 additional remediation suggestions that are not duplicates. Each \
         suggestion must be a JSON object with the keys \"category\" (\"resilience\", \
         \"security\" or \"architecture\"), \"target\" (component name or \"system\"), \
         \"priority\" (\"high\", \"medium\" or \"low\"), \"title\", and \"details\" \
         (1-3 sentences).\n\n\
         Return ONLY a JSON array of these objects, with no explanation or markdown."
    )
}

// ── Response handling ────────────────────────────────────────────

/// Strip markdown emphasis, headings, and bullets; trim lines; drop blanks.
pub fn clean_text(text: &str) -> String {
    let stripped = text
        .replace("**", "")
        .replace('#', "")
        .replace('*', "")
        .replace('\u{2022}', "");

    stripped
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a model reply into suggestions.
///
/// Accepts a bare JSON array, optionally inside a code fence. Elements that
/// are not suggestion-shaped are skipped; a reply that is not an array
/// yields nothing.
pub fn parse_suggestions(text: &str) -> Vec<RemediationSuggestion> {
    let body = strip_code_fence(text.trim());
    let Ok(serde_json::Value::Array(items)) = serde_json::from_str::<serde_json::Value>(body) else {
        tracing::debug!("Enhancement reply is not a JSON array; ignoring");
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<ExternalSuggestion>(item).ok())
        .filter(|s| !s.title.trim().is_empty())
        .map(ExternalSuggestion::into_suggestion)
        .collect()
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[derive(Debug, Deserialize)]
struct ExternalSuggestion {
    #[serde(default = "default_category")]
    category: SuggestionCategory,
    #[serde(default = "default_target")]
    target: String,
    #[serde(default = "default_priority")]
    priority: Priority,
    #[serde(default = "default_title")]
    title: String,
    #[serde(default)]
    details: String,
}

fn default_category() -> SuggestionCategory {
    SuggestionCategory::Resilience
}

fn default_target() -> String {
    SYSTEM_TARGET.to_string()
}

fn default_priority() -> Priority {
    Priority::Medium
}

fn default_title() -> String {
    "AI-suggested remediation".to_string()
}

impl ExternalSuggestion {
    fn into_suggestion(self) -> RemediationSuggestion {
        RemediationSuggestion {
            category: self.category,
            target: self.target,
            priority: self.priority,
            title: self.title,
            details: self.details,
            provenance: Provenance::External,
        }
    }
}

// ── Wire types ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

impl GenerateRequest {
    fn from_prompt(prompt: String) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: Some(prompt) }],
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}
