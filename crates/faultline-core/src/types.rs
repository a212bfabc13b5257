//! Core domain types for Faultline.
//!
//! These are the plain value objects exchanged between the analysis engine,
//! the run log, and external collaborators (report and diagram renderers).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Target used by suggestions that apply to the whole system.
pub const SYSTEM_TARGET: &str = "system";

fn default_system_name() -> String {
    "Unnamed System".to_string()
}

fn default_kind() -> String {
    "service".to_string()
}

// ── Architecture input ────────────────────────────────────────────

/// Structured architecture definition, as produced by a YAML/JSON parser.
///
/// Semantic validation happens when the definition is loaded into an
/// `Architecture` by the analysis engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchitectureDefinition {
    #[serde(default = "default_system_name")]
    pub system_name: String,
    #[serde(default)]
    pub components: Vec<ComponentDefinition>,
}

/// One component entry of an architecture definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentDefinition {
    pub name: String,
    /// Open-vocabulary type tag: gateway, database, web_client, queue, ...
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub criticality: Criticality,
    /// Calls a third-party service. Defaults to `kind == "external_api"`.
    #[serde(default)]
    pub external_api: Option<bool>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ComponentDefinition {
    /// Minimal definition with defaults for every optional attribute.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            public: false,
            criticality: Criticality::default(),
            external_api: None,
            depends_on: Vec::new(),
            tags: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    pub fn criticality(mut self, criticality: Criticality) -> Self {
        self.criticality = criticality;
        self
    }

    pub fn external_api(mut self, external_api: bool) -> Self {
        self.external_api = Some(external_api);
        self
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

// ── Components ────────────────────────────────────────────────────

/// A validated node of the architecture graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Component {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub public: bool,
    pub criticality: Criticality,
    pub external_api: bool,
    pub depends_on: Vec<String>,
    pub tags: Vec<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Component {
    /// Whether the component carries a tag (case-insensitive).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Whether a metadata flag is set to a truthy value (`true`, `"true"`, `"yes"`, non-zero).
    ///
    /// A nested object is truthy when its `enabled` key is, or when it is
    /// non-empty and has no `enabled` key.
    pub fn metadata_flag(&self, key: &str) -> bool {
        self.metadata.get(key).is_some_and(is_truthy)
    }
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => {
            matches!(s.to_lowercase().as_str(), "true" | "yes" | "on" | "enabled")
        }
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        serde_json::Value::Object(map) => match map.get("enabled") {
            Some(enabled) => is_truthy(enabled),
            None => !map.is_empty(),
        },
        _ => false,
    }
}

impl From<ComponentDefinition> for Component {
    fn from(def: ComponentDefinition) -> Self {
        let external_api = def.external_api.unwrap_or(def.kind == "external_api");
        Self {
            name: def.name,
            kind: def.kind,
            public: def.public,
            criticality: def.criticality,
            external_api,
            depends_on: def.depends_on,
            tags: def.tags,
            metadata: def.metadata,
        }
    }
}

// ── Failure scenarios ─────────────────────────────────────────────

/// One simulated component failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailureScenario {
    pub scenario_name: String,
    pub failed_component: String,
    /// 0.0 – 10.0
    pub severity: f64,
    pub user_visible_impact: bool,
    /// Breadth-first from the failed component, excluding it.
    pub impacted_components: Vec<String>,
    pub notes: String,
}

// ── Security risks ────────────────────────────────────────────────

/// A rule-based security finding on one component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityRisk {
    pub component: String,
    pub risk_type: RiskType,
    pub severity: RiskSeverity,
    pub description: String,
    pub mitigation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RiskType {
    DosExposure,
    ExternalDependencyExposure,
    DataExposure,
    Other(String),
}

impl RiskType {
    pub fn label(&self) -> &str {
        match self {
            Self::DosExposure => "Denial-of-Service exposure",
            Self::ExternalDependencyExposure => "External dependency exposure",
            Self::DataExposure => "Data exposure",
            Self::Other(name) => name,
        }
    }
}

impl std::fmt::Display for RiskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskSeverity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => f.write_str("LOW"),
            Self::Medium => f.write_str("MEDIUM"),
            Self::High => f.write_str("HIGH"),
        }
    }
}

// ── Remediation ───────────────────────────────────────────────────

/// A prioritized action item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemediationSuggestion {
    pub category: SuggestionCategory,
    /// Component name or [`SYSTEM_TARGET`].
    pub target: String,
    pub priority: Priority,
    pub title: String,
    pub details: String,
    #[serde(default)]
    pub provenance: Provenance,
}

impl RemediationSuggestion {
    /// Identity used for deduplication.
    pub fn dedup_key(&self) -> (SuggestionCategory, &str, &str) {
        (self.category, self.target.as_str(), self.title.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionCategory {
    Resilience,
    Security,
    Architecture,
}

/// Declared high-to-low so that sorting ascending puts `High` first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Where a suggestion or summary came from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    #[default]
    Local,
    External,
}

// ── Aggregates ────────────────────────────────────────────────────

/// Summary metrics folded from all scenarios and risks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ResilienceMetrics {
    /// 0.0 – 10.0, higher is better.
    pub overall_resilience_score: f64,
    /// Maximum scenario severity, 0.0 when there are no scenarios.
    pub worst_case_severity: f64,
    pub average_severity: f64,
    pub user_visible_scenarios: usize,
    pub high_risks: usize,
    pub medium_risks: usize,
    pub low_risks: usize,
}

/// The terminal aggregate of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemReport {
    pub system_name: String,
    pub overall_resilience_score: f64,
    pub worst_case_severity: f64,
    pub failure_scenarios: Vec<FailureScenario>,
    pub security_risks: Vec<SecurityRisk>,
    pub remediation_suggestions: Vec<RemediationSuggestion>,
    pub ai_summary: String,
    pub ai_summary_llm_used: bool,
}

// ── Enums ─────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    #[serde(alias = "Low", alias = "LOW")]
    Low,
    #[default]
    #[serde(alias = "Medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "High", alias = "HIGH")]
    High,
}

impl std::fmt::Display for Criticality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => f.write_str("low"),
            Self::Medium => f.write_str("medium"),
            Self::High => f.write_str("high"),
        }
    }
}
