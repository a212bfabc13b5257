//! Report summarization capability.

use async_trait::async_trait;
use faultline_core::{RiskSeverity, SystemReport};

use crate::error::ExternalError;

/// Heading every summary starts with.
pub const SUMMARY_HEADING: &str = "AI Insight Summary";

/// Summary text plus whether a remote model produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub text: String,
    pub llm_used: bool,
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    fn name(&self) -> &str;

    async fn summarize(&self, report: &SystemReport) -> Result<Summary, ExternalError>;
}

/// Deterministic local summarizer. Never fails, never returns empty text.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicSummarizer;

/// Resilience band on the 0–10 scale: below 3 low, below 7 moderate.
pub fn resilience_band(score: f64) -> &'static str {
    if score < 3.0 {
        "LOW"
    } else if score < 7.0 {
        "MODERATE"
    } else {
        "HIGH"
    }
}

impl HeuristicSummarizer {
    pub fn summarize_report(&self, report: &SystemReport) -> Summary {
        let mut lines = vec![
            SUMMARY_HEADING.to_string(),
            format!(
                "{} shows {} resilience with an overall score of {:.2}/10.",
                report.system_name,
                resilience_band(report.overall_resilience_score),
                report.overall_resilience_score
            ),
        ];

        let worst = report
            .failure_scenarios
            .iter()
            .max_by(|a, b| a.severity.total_cmp(&b.severity));
        match worst {
            Some(s) => {
                let visible = report
                    .failure_scenarios
                    .iter()
                    .filter(|s| s.user_visible_impact)
                    .count();
                lines.push(format!(
                    "The most severe failure is {} (severity {:.2}), impacting {} downstream components. \
                     {visible} of {} simulated failures are visible to users.",
                    s.scenario_name,
                    s.severity,
                    s.impacted_components.len(),
                    report.failure_scenarios.len()
                ));
            }
            None => lines.push("No failure scenarios were simulated.".to_string()),
        }

        let count = |level: RiskSeverity| {
            report
                .security_risks
                .iter()
                .filter(|r| r.severity == level)
                .count()
        };
        if report.security_risks.is_empty() {
            lines.push("No security risks were detected by the rule set.".to_string());
        } else {
            lines.push(format!(
                "Security review found {} risks: {} high, {} medium, {} low.",
                report.security_risks.len(),
                count(RiskSeverity::High),
                count(RiskSeverity::Medium),
                count(RiskSeverity::Low)
            ));
        }

        let top: Vec<&str> = report
            .remediation_suggestions
            .iter()
            .take(3)
            .map(|s| s.title.as_str())
            .collect();
        if top.is_empty() {
            lines.push(
                "Review failure scenarios and remediation sections to improve resilience and \
                 security posture."
                    .to_string(),
            );
        } else {
            lines.push(format!("Top priorities: {}.", top.join("; ")));
        }

        Summary {
            text: lines.join("\n"),
            llm_used: false,
        }
    }
}

#[async_trait]
impl Summarizer for HeuristicSummarizer {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn summarize(&self, report: &SystemReport) -> Result<Summary, ExternalError> {
        Ok(self.summarize_report(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_core::{
        FailureScenario, Priority, Provenance, RemediationSuggestion, RiskType, SecurityRisk,
        SuggestionCategory,
    };

    fn report() -> SystemReport {
        SystemReport {
            system_name: "Shop".into(),
            overall_resilience_score: 2.5,
            worst_case_severity: 9.0,
            failure_scenarios: vec![
                FailureScenario {
                    scenario_name: "DB FAILURE".into(),
                    failed_component: "DB".into(),
                    severity: 9.0,
                    user_visible_impact: true,
                    impacted_components: vec!["API".into(), "Web".into()],
                    notes: String::new(),
                },
                FailureScenario {
                    scenario_name: "Cache FAILURE".into(),
                    failed_component: "Cache".into(),
                    severity: 2.0,
                    user_visible_impact: false,
                    impacted_components: vec![],
                    notes: String::new(),
                },
            ],
            security_risks: vec![SecurityRisk {
                component: "Web".into(),
                risk_type: RiskType::DosExposure,
                severity: RiskSeverity::High,
                description: String::new(),
                mitigation: String::new(),
            }],
            remediation_suggestions: vec![RemediationSuggestion {
                category: SuggestionCategory::Resilience,
                target: "DB".into(),
                priority: Priority::High,
                title: "Add replication and backup for DB".into(),
                details: String::new(),
                provenance: Provenance::Local,
            }],
            ai_summary: String::new(),
            ai_summary_llm_used: false,
        }
    }

    #[test]
    fn test_bands() {
        assert_eq!(resilience_band(0.0), "LOW");
        assert_eq!(resilience_band(2.99), "LOW");
        assert_eq!(resilience_band(3.0), "MODERATE");
        assert_eq!(resilience_band(7.0), "HIGH");
    }

    #[test]
    fn test_heuristic_summary_content() {
        let summary = HeuristicSummarizer.summarize_report(&report());
        assert!(!summary.llm_used);
        assert!(summary.text.starts_with(SUMMARY_HEADING));
        assert!(summary.text.contains("LOW resilience"));
        assert!(summary.text.contains("DB FAILURE (severity 9.00)"));
        assert!(summary.text.contains("1 of 2 simulated failures"));
        assert!(summary.text.contains("1 high, 0 medium, 0 low"));
        assert!(summary.text.contains("Add replication and backup for DB"));
    }

    #[test]
    fn test_empty_report_still_summarized() {
        let mut r = report();
        r.failure_scenarios.clear();
        r.security_risks.clear();
        r.remediation_suggestions.clear();
        let summary = HeuristicSummarizer.summarize_report(&r);
        assert!(summary.text.contains("No failure scenarios"));
        assert!(summary.text.lines().count() >= 4);
    }

    #[tokio::test]
    async fn test_trait_is_deterministic() {
        let r = report();
        let a = HeuristicSummarizer.summarize(&r).await.unwrap();
        let b = HeuristicSummarizer.summarize(&r).await.unwrap();
        assert_eq!(a, b);
    }
}
