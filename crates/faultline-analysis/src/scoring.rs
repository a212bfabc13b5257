//! Severity scoring for failure scenarios.
//!
//! Formula: `severity = base(criticality) + blast_weight × impacted/(n−1)
//! + public_bonus (if user visible) + type_bonus (if critical type)`,
//! clamped to `[0.0, 10.0]` and rounded to two decimals.

use faultline_core::{Component, Criticality};
use serde::Deserialize;

/// Upper bound of every score in the system.
pub const MAX_SCORE: f64 = 10.0;

/// Severity policy table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeverityPolicy {
    /// Base score for high-criticality components (default 6.0).
    pub base_high: f64,
    /// Base score for medium-criticality components (default 4.0).
    pub base_medium: f64,
    /// Base score for low-criticality components (default 1.5).
    pub base_low: f64,
    /// Weight of the impacted fraction of the system (default 3.0).
    pub blast_radius_weight: f64,
    /// Added when the failure reaches a public component (default 2.0).
    pub public_impact_bonus: f64,
    /// Added when the failed component's type is critical (default 0.5).
    pub critical_type_bonus: f64,
    pub critical_types: Vec<String>,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            base_high: 6.0,
            base_medium: 4.0,
            base_low: 1.5,
            blast_radius_weight: 3.0,
            public_impact_bonus: 2.0,
            critical_type_bonus: 0.5,
            critical_types: ["database", "gateway", "external_api", "queue"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl SeverityPolicy {
    pub fn base_for(&self, criticality: Criticality) -> f64 {
        match criticality {
            Criticality::High => self.base_high,
            Criticality::Medium => self.base_medium,
            Criticality::Low => self.base_low,
        }
    }

    pub fn is_critical_type(&self, kind: &str) -> bool {
        self.critical_types.iter().any(|t| t.eq_ignore_ascii_case(kind))
    }
}

/// Compute the severity of one failure scenario.
///
/// `impacted` is the size of the blast radius (excluding the failed
/// component) and `total` the number of components in the system.
pub fn scenario_severity(
    policy: &SeverityPolicy,
    failed: &Component,
    impacted: usize,
    total: usize,
    user_visible: bool,
) -> f64 {
    let mut score = policy.base_for(failed.criticality);

    if total > 1 {
        score += policy.blast_radius_weight * impacted as f64 / (total - 1) as f64;
    }
    if user_visible {
        score += policy.public_impact_bonus;
    }
    if policy.is_critical_type(&failed.kind) {
        score += policy.critical_type_bonus;
    }

    round2(clamp_score(score))
}

/// Clamp into `[0.0, MAX_SCORE]`. NaN collapses to 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, MAX_SCORE)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
