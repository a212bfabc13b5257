//! Resilience aggregation: fold scenarios and risks into summary metrics.

use faultline_core::{FailureScenario, ResilienceMetrics, RiskSeverity, SecurityRisk};
use serde::Deserialize;

use crate::scoring::{clamp_score, round2, MAX_SCORE};

/// Penalty weights for the overall resilience score.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResiliencePolicy {
    pub high_risk_penalty: f64,
    pub medium_risk_penalty: f64,
    pub low_risk_penalty: f64,
    /// Severity above which a scenario starts costing score (default 5.0).
    pub severity_threshold: f64,
    pub worst_case_weight: f64,
    pub per_scenario_weight: f64,
}

impl Default for ResiliencePolicy {
    fn default() -> Self {
        Self {
            high_risk_penalty: 1.0,
            medium_risk_penalty: 0.5,
            low_risk_penalty: 0.25,
            severity_threshold: 5.0,
            worst_case_weight: 1.0,
            per_scenario_weight: 0.1,
        }
    }
}

impl ResiliencePolicy {
    fn risk_penalty(&self, severity: RiskSeverity) -> f64 {
        let penalty = match severity {
            RiskSeverity::High => self.high_risk_penalty,
            RiskSeverity::Medium => self.medium_risk_penalty,
            RiskSeverity::Low => self.low_risk_penalty,
        };
        penalty.max(0.0)
    }
}

/// Compute summary metrics. Pure; the score only goes down as risks are
/// added or scenario severities rise.
pub fn aggregate(
    scenarios: &[FailureScenario],
    risks: &[SecurityRisk],
    policy: &ResiliencePolicy,
) -> ResilienceMetrics {
    let worst = scenarios
        .iter()
        .map(|s| s.severity)
        .fold(0.0_f64, f64::max);

    let average = if scenarios.is_empty() {
        0.0
    } else {
        scenarios.iter().map(|s| s.severity).sum::<f64>() / scenarios.len() as f64
    };

    let excess = |severity: f64| (severity - policy.severity_threshold).max(0.0);

    let risk_penalty: f64 = risks.iter().map(|r| policy.risk_penalty(r.severity)).sum();
    let worst_penalty = policy.worst_case_weight.max(0.0) * excess(worst);
    let spread_penalty = policy.per_scenario_weight.max(0.0)
        * scenarios.iter().map(|s| excess(s.severity)).sum::<f64>();

    let score = clamp_score(MAX_SCORE - risk_penalty - worst_penalty - spread_penalty);

    let count = |level: RiskSeverity| risks.iter().filter(|r| r.severity == level).count();

    ResilienceMetrics {
        overall_resilience_score: round2(score),
        worst_case_severity: round2(worst),
        average_severity: round2(average),
        user_visible_scenarios: scenarios.iter().filter(|s| s.user_visible_impact).count(),
        high_risks: count(RiskSeverity::High),
        medium_risks: count(RiskSeverity::Medium),
        low_risks: count(RiskSeverity::Low),
    }
}
