//! Configuration for the analysis engine.

use serde::Deserialize;

use crate::aggregate::ResiliencePolicy;
use crate::remediation::RemediationPolicy;
use crate::scoring::SeverityPolicy;

/// Top-level analysis configuration.
///
/// Loaded from the `faultline.toml` `[analysis]` section or
/// `FAULTLINE__ANALYSIS__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Directory holding one `run_NNN` directory per run.
    #[serde(default = "default_runs_dir")]
    pub runs_dir: String,

    #[serde(default)]
    pub severity: SeverityPolicy,

    #[serde(default)]
    pub resilience: ResiliencePolicy,

    #[serde(default)]
    pub remediation: RemediationPolicy,

    #[serde(default)]
    pub llm: LlmConfig,
}

/// Which summarization/enhancement backend to use.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Local heuristic summary, no remote enhancement.
    #[default]
    Heuristic,
    /// Google Gemini `generateContent` API.
    Gemini,
}

/// Remote model collaborator settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,

    #[serde(default = "default_model")]
    pub model: String,

    /// API key; falls back to `GEMINI_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Upper bound on each external call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Ask the remote model for extra remediation suggestions.
    #[serde(default = "default_true")]
    pub enhance_remediation: bool,
}

fn default_runs_dir() -> String {
    "./runs".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_true() -> bool {
    true
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_model(),
            api_key: None,
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            enhance_remediation: default_true(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            runs_dir: default_runs_dir(),
            severity: SeverityPolicy::default(),
            resilience: ResiliencePolicy::default(),
            remediation: RemediationPolicy::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load the `[analysis]` section of the layered configuration.
    pub fn load(file_prefix: &str) -> crate::error::Result<Self> {
        Ok(faultline_core::config::load_section(file_prefix, "analysis")?)
    }
}
