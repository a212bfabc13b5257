//! Rule-based security scanning.
//!
//! Each rule inspects one component in isolation and emits at most one
//! finding. Rules live in an ordered [`RuleSet`]; registering a new rule
//! never changes what the existing rules report.

use faultline_core::{Component, Criticality, RiskSeverity, RiskType, SecurityRisk};

use crate::model::Architecture;

/// Tag or metadata keys that count as DoS protection.
const PROTECTION_SIGNALS: &[&str] = &["rate_limited", "rate_limiting", "waf", "auth", "authenticated"];

/// A single security check over one component.
pub trait SecurityRule: Send + Sync {
    fn id(&self) -> &'static str;
    fn evaluate(&self, component: &Component) -> Option<SecurityRisk>;
}

/// Ordered registry of security rules.
pub struct RuleSet {
    rules: Vec<Box<dyn SecurityRule>>,
}

impl RuleSet {
    /// An empty registry.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_defaults() -> Self {
        Self {
            rules: default_rules(),
        }
    }

    /// Append a rule; it is evaluated after every rule already registered.
    pub fn register(&mut self, rule: Box<dyn SecurityRule>) -> &mut Self {
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

impl Default for RuleSet {
    fn default() -> Self {
        Self::with_defaults()
    }
}

pub fn default_rules() -> Vec<Box<dyn SecurityRule>> {
    vec![
        Box::new(DosExposureRule),
        Box::new(ExternalDependencyRule),
        Box::new(DataExposureRule),
    ]
}

/// Run every rule over every component.
///
/// Output is ordered by component declaration order, then rule order.
pub fn scan(architecture: &Architecture, rules: &RuleSet) -> Vec<SecurityRisk> {
    let mut risks = Vec::new();
    for component in architecture.components() {
        for rule in &rules.rules {
            if let Some(risk) = rule.evaluate(component) {
                tracing::trace!(
                    rule = rule.id(),
                    component = %component.name,
                    severity = %risk.severity,
                    "Security rule fired"
                );
                risks.push(risk);
            }
        }
    }
    risks
}

fn is_protected(component: &Component) -> bool {
    PROTECTION_SIGNALS
        .iter()
        .any(|signal| component.has_tag(signal) || component.metadata_flag(signal))
}

/// Public entrypoints without rate limiting or authentication.
pub struct DosExposureRule;

impl SecurityRule for DosExposureRule {
    fn id(&self) -> &'static str {
        "dos_exposure"
    }

    fn evaluate(&self, component: &Component) -> Option<SecurityRisk> {
        if !component.public || is_protected(component) {
            return None;
        }
        let severity = if component.criticality == Criticality::High {
            RiskSeverity::High
        } else {
            RiskSeverity::Medium
        };
        Some(SecurityRisk {
            component: component.name.clone(),
            risk_type: RiskType::DosExposure,
            severity,
            description: format!(
                "{} is a public-facing {} with no rate limiting or authentication. \
                 It may be vulnerable to traffic floods (DoS/DDoS).",
                component.name, component.kind
            ),
            mitigation: "Implement rate limiting, request throttling, and a Web Application \
                         Firewall (WAF). Monitor traffic patterns and alert on abnormal spikes."
                .to_string(),
        })
    }
}

/// Components calling third-party services.
pub struct ExternalDependencyRule;

impl SecurityRule for ExternalDependencyRule {
    fn id(&self) -> &'static str {
        "external_dependency_exposure"
    }

    fn evaluate(&self, component: &Component) -> Option<SecurityRisk> {
        if !component.external_api {
            return None;
        }
        let severity = if component.public {
            RiskSeverity::High
        } else {
            RiskSeverity::Medium
        };
        Some(SecurityRisk {
            component: component.name.clone(),
            risk_type: RiskType::ExternalDependencyExposure,
            severity,
            description: format!(
                "{} depends on an external API which may fail, be rate limited, or be compromised.",
                component.name
            ),
            mitigation: "Implement timeouts, retries with backoff, and fallback strategies. \
                         Cache responses where possible and handle failures gracefully."
                .to_string(),
        })
    }
}

/// Databases reachable from outside the system.
pub struct DataExposureRule;

impl SecurityRule for DataExposureRule {
    fn id(&self) -> &'static str {
        "data_exposure"
    }

    fn evaluate(&self, component: &Component) -> Option<SecurityRisk> {
        if !(component.public && component.kind.eq_ignore_ascii_case("database")) {
            return None;
        }
        Some(SecurityRisk {
            component: component.name.clone(),
            risk_type: RiskType::DataExposure,
            severity: RiskSeverity::High,
            description: format!(
                "{} is a database flagged as public. Databases should never be directly \
                 exposed to the internet.",
                component.name
            ),
            mitigation: "Place the database in a private subnet and restrict access to \
                         application services only."
                .to_string(),
        })
    }
}
