//! Remediation planning.
//!
//! Rules turn scenarios, risks, and metrics into prioritized suggestions.
//! The combined output is deduplicated by `(category, target, title)`, first
//! occurrence winning, and stably sorted high → low priority.

use std::collections::HashSet;

use faultline_core::{
    FailureScenario, Priority, Provenance, RemediationSuggestion, ResilienceMetrics, RiskSeverity,
    SecurityRisk, SuggestionCategory, SYSTEM_TARGET,
};
use serde::Deserialize;

use crate::model::Architecture;

/// Thresholds driving the built-in remediation rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemediationPolicy {
    /// Scenarios at or above this severity get a resilience suggestion (default 8.0).
    pub high_severity_threshold: f64,
    /// Scores at or below this trigger a system-wide suggestion (default 4.0).
    pub low_resilience_threshold: f64,
}

impl Default for RemediationPolicy {
    fn default() -> Self {
        Self {
            high_severity_threshold: 8.0,
            low_resilience_threshold: 4.0,
        }
    }
}

/// Everything a remediation rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct RemediationInput<'a> {
    pub architecture: &'a Architecture,
    pub scenarios: &'a [FailureScenario],
    pub risks: &'a [SecurityRisk],
    pub metrics: &'a ResilienceMetrics,
}

pub trait RemediationRule: Send + Sync {
    fn id(&self) -> &'static str;
    fn suggest(&self, input: &RemediationInput<'_>) -> Vec<RemediationSuggestion>;
}

/// Ordered registry of remediation rules.
pub struct RemediationRules {
    rules: Vec<Box<dyn RemediationRule>>,
}

impl RemediationRules {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// The built-in rules, parameterized by `policy`.
    pub fn from_policy(policy: &RemediationPolicy) -> Self {
        Self {
            rules: vec![
                Box::new(SystemFaultTolerance {
                    threshold: policy.low_resilience_threshold,
                }),
                Box::new(HighSeverityScenario {
                    threshold: policy.high_severity_threshold,
                }),
                Box::new(SecurityRiskMitigation),
            ],
        }
    }

    pub fn register(&mut self, rule: Box<dyn RemediationRule>) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RemediationRules {
    fn default() -> Self {
        Self::from_policy(&RemediationPolicy::default())
    }
}

/// Produce the local remediation plan.
pub fn recommend(input: &RemediationInput<'_>, rules: &RemediationRules) -> Vec<RemediationSuggestion> {
    let raw: Vec<RemediationSuggestion> = rules
        .rules
        .iter()
        .flat_map(|rule| rule.suggest(input))
        .collect();
    order(dedup(raw))
}

/// Merge externally supplied suggestions into a local plan.
///
/// External entries are tagged [`Provenance::External`]; on a
/// `(category, target, title)` collision the local entry is kept.
pub fn merge_external(
    local: Vec<RemediationSuggestion>,
    external: Vec<RemediationSuggestion>,
) -> Vec<RemediationSuggestion> {
    let tagged = external.into_iter().map(|mut s| {
        s.provenance = Provenance::External;
        s
    });
    order(dedup(local.into_iter().chain(tagged).collect()))
}

/// Drop every suggestion whose dedup key was already seen.
pub fn dedup(suggestions: Vec<RemediationSuggestion>) -> Vec<RemediationSuggestion> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(suggestions.len());
    for suggestion in suggestions {
        let (category, target, title) = suggestion.dedup_key();
        if seen.insert((category, target.to_string(), title.to_string())) {
            out.push(suggestion);
        }
    }
    out
}

fn order(mut suggestions: Vec<RemediationSuggestion>) -> Vec<RemediationSuggestion> {
    // `sort_by_key` is stable.
    suggestions.sort_by_key(|s| s.priority);
    suggestions
}

fn suggestion(
    category: SuggestionCategory,
    target: &str,
    priority: Priority,
    title: String,
    details: String,
) -> RemediationSuggestion {
    RemediationSuggestion {
        category,
        target: target.to_string(),
        priority,
        title,
        details,
        provenance: Provenance::Local,
    }
}

// ── Built-in rules ───────────────────────────────────────────────

/// System-wide suggestion when the overall score is low.
pub struct SystemFaultTolerance {
    pub threshold: f64,
}

impl RemediationRule for SystemFaultTolerance {
    fn id(&self) -> &'static str {
        "system_fault_tolerance"
    }

    fn suggest(&self, input: &RemediationInput<'_>) -> Vec<RemediationSuggestion> {
        if input.metrics.overall_resilience_score > self.threshold {
            return Vec::new();
        }
        vec![suggestion(
            SuggestionCategory::Resilience,
            SYSTEM_TARGET,
            Priority::High,
            "Improve overall fault tolerance".to_string(),
            "The overall resilience score is low. Introduce redundancy (replicated services, \
             database failover), implement graceful degradation paths, and validate recovery \
             procedures for critical components."
                .to_string(),
        )]
    }
}

/// Component-specific hardening for high-severity failures.
pub struct HighSeverityScenario {
    pub threshold: f64,
}

impl RemediationRule for HighSeverityScenario {
    fn id(&self) -> &'static str {
        "high_severity_scenario"
    }

    fn suggest(&self, input: &RemediationInput<'_>) -> Vec<RemediationSuggestion> {
        input
            .scenarios
            .iter()
            .filter(|s| s.severity >= self.threshold)
            .filter_map(|scenario| {
                let component = input.architecture.component(&scenario.failed_component)?;
                let name = component.name.as_str();
                let impacted = scenario.impacted_components.len();

                let kind = component.kind.to_ascii_lowercase();
                let (priority, title, details) = match kind.as_str() {
                    "database" => (
                        Priority::High,
                        format!("Add replication and backup for {name}"),
                        format!(
                            "When {name} fails, it impacts {impacted} components. Configure \
                             primary/replica setups, automated failover, and regular \
                             backup/restore drills."
                        ),
                    ),
                    "gateway" => (
                        Priority::High,
                        format!("Eliminate single point of failure at {name}"),
                        format!(
                            "{name} is a critical gateway whose failure disrupts user access. Add \
                             multiple gateway instances behind a load balancer and implement \
                             health checks."
                        ),
                    ),
                    "external_api" => (
                        Priority::High,
                        format!("Introduce circuit breakers and fallbacks for {name}"),
                        format!(
                            "{name} is an external dependency whose failure causes a \
                             high-severity impact. Use circuit breakers, timeouts, retries with \
                             backoff, and possibly alternative providers."
                        ),
                    ),
                    _ => (
                        Priority::Medium,
                        format!("Harden {name} against failures"),
                        format!(
                            "{name} shows a high-severity failure scenario. Consider adding \
                             redundancy, better monitoring, and fallback logic specific to this \
                             component."
                        ),
                    ),
                };

                Some(suggestion(
                    SuggestionCategory::Resilience,
                    name,
                    priority,
                    title,
                    details,
                ))
            })
            .collect()
    }
}

/// One security suggestion per risk, on the same component.
pub struct SecurityRiskMitigation;

impl RemediationRule for SecurityRiskMitigation {
    fn id(&self) -> &'static str {
        "security_risk_mitigation"
    }

    fn suggest(&self, input: &RemediationInput<'_>) -> Vec<RemediationSuggestion> {
        input
            .risks
            .iter()
            .map(|risk| {
                let priority = if risk.severity == RiskSeverity::High {
                    Priority::High
                } else {
                    Priority::Medium
                };
                suggestion(
                    SuggestionCategory::Security,
                    &risk.component,
                    priority,
                    format!("Mitigate {} on {}", risk.risk_type, risk.component),
                    risk.mitigation.clone(),
                )
            })
            .collect()
    }
}
