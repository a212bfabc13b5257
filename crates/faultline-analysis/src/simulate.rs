//! Failure simulation.
//!
//! For each component, BFS over reverse dependency edges (dependents, then
//! their dependents) to find everything that stops working when it fails,
//! then score the scenario with the severity policy.

use std::collections::VecDeque;

use faultline_core::FailureScenario;

use crate::error::{AnalysisError, Result};
use crate::model::Architecture;
use crate::scoring::{scenario_severity, SeverityPolicy};

const USER_FACING_NOTE: &str = "User-facing components are affected.";
const INTERNAL_NOTE: &str = "No direct impact on public entrypoints.";

/// Simulate the failure of every component, in declaration order.
pub fn simulate(architecture: &Architecture, policy: &SeverityPolicy) -> Vec<FailureScenario> {
    (0..architecture.len())
        .map(|idx| scenario_for(architecture, idx, policy))
        .collect()
}

/// Simulate the failure of one named component.
pub fn simulate_one(
    architecture: &Architecture,
    name: &str,
    policy: &SeverityPolicy,
) -> Result<FailureScenario> {
    let idx = architecture
        .index_of(name)
        .ok_or_else(|| AnalysisError::UnknownComponent {
            name: name.to_string(),
        })?;
    Ok(scenario_for(architecture, idx, policy))
}

/// Indices of every component transitively depending on `failed`.
///
/// Breadth-first, dependents visited in declaration order; `failed` itself
/// is excluded. Empty for an out-of-range index.
pub fn impacted_by(architecture: &Architecture, failed: usize) -> Vec<usize> {
    if failed >= architecture.len() {
        return Vec::new();
    }
    let mut visited = vec![false; architecture.len()];
    visited[failed] = true;

    let mut impacted = Vec::new();
    let mut queue = VecDeque::from([failed]);

    while let Some(node) = queue.pop_front() {
        for &dependent in architecture.dependents_of(node) {
            if visited[dependent] {
                continue;
            }
            visited[dependent] = true;
            impacted.push(dependent);
            queue.push_back(dependent);
        }
    }

    impacted
}

fn scenario_for(architecture: &Architecture, idx: usize, policy: &SeverityPolicy) -> FailureScenario {
    let components = architecture.components();
    let failed = &components[idx];
    let impacted = impacted_by(architecture, idx);

    let user_visible = failed.public || impacted.iter().any(|&i| components[i].public);
    let severity = scenario_severity(policy, failed, impacted.len(), architecture.len(), user_visible);

    FailureScenario {
        scenario_name: format!("{} FAILURE", failed.name),
        failed_component: failed.name.clone(),
        severity,
        user_visible_impact: user_visible,
        impacted_components: impacted
            .into_iter()
            .map(|i| components[i].name.clone())
            .collect(),
        notes: if user_visible { USER_FACING_NOTE } else { INTERNAL_NOTE }.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_core::{ArchitectureDefinition, ComponentDefinition, Criticality};

    /// Web → Gateway → {Auth, Orders}; Orders → DB; Auth → DB.
    fn build_shop() -> Architecture {
        Architecture::load(ArchitectureDefinition {
            system_name: "Shop".into(),
            components: vec![
                ComponentDefinition::new("Web", "web_client")
                    .public(true)
                    .depends_on(["Gateway"]),
                ComponentDefinition::new("Gateway", "gateway")
                    .criticality(Criticality::High)
                    .depends_on(["Auth", "Orders"]),
                ComponentDefinition::new("Auth", "service").depends_on(["DB"]),
                ComponentDefinition::new("Orders", "service").depends_on(["DB"]),
                ComponentDefinition::new("DB", "database").criticality(Criticality::High),
                ComponentDefinition::new("Metrics", "service").criticality(Criticality::Low),
            ],
        })
        .unwrap()
    }

    #[test]
    fn test_one_scenario_per_component() {
        let arch = build_shop();
        let scenarios = simulate(&arch, &SeverityPolicy::default());

        assert_eq!(scenarios.len(), arch.len());
        let failed: Vec<&str> = scenarios.iter().map(|s| s.failed_component.as_str()).collect();
        assert_eq!(failed, vec!["Web", "Gateway", "Auth", "Orders", "DB", "Metrics"]);
        assert_eq!(scenarios[4].scenario_name, "DB FAILURE");
    }

    #[test]
    fn test_bfs_order_and_exclusion() {
        let arch = build_shop();
        let db = arch.index_of("DB").unwrap();
        let names: Vec<&str> = impacted_by(&arch, db)
            .into_iter()
            .map(|i| arch.components()[i].name.as_str())
            .collect();

        // Auth and Orders (distance 1, declaration order), then Gateway, then Web.
        assert_eq!(names, vec!["Auth", "Orders", "Gateway", "Web"]);
    }

    #[test]
    fn test_diamond_visits_once() {
        let arch = build_shop();
        let db = arch.index_of("DB").unwrap();
        let impacted = impacted_by(&arch, db);
        let gateway = arch.index_of("Gateway").unwrap();
        assert_eq!(impacted.iter().filter(|&&i| i == gateway).count(), 1);
    }

    #[test]
    fn test_out_of_range_index_has_no_impact() {
        let arch = build_shop();
        assert!(impacted_by(&arch, arch.len()).is_empty());
        assert!(impacted_by(&arch, usize::MAX).is_empty());
    }

    #[test]
    fn test_isolated_low_component() {
        let arch = build_shop();
        let scenario = simulate_one(&arch, "Metrics", &SeverityPolicy::default()).unwrap();

        assert_eq!(scenario.severity, 1.5);
        assert!(!scenario.user_visible_impact);
        assert!(scenario.impacted_components.is_empty());
        assert_eq!(scenario.notes, INTERNAL_NOTE);
    }

    #[test]
    fn test_database_failure_is_user_visible() {
        let arch = build_shop();
        let scenario = simulate_one(&arch, "DB", &SeverityPolicy::default()).unwrap();

        // 6.0 + 3.0 × 4/5 + 2.0 + 0.5 = 10.9 → 10.0
        assert_eq!(scenario.severity, 10.0);
        assert!(scenario.user_visible_impact);
        assert_eq!(scenario.notes, USER_FACING_NOTE);
    }

    #[test]
    fn test_public_failed_component_is_user_visible() {
        let arch = build_shop();
        let scenario = simulate_one(&arch, "Web", &SeverityPolicy::default()).unwrap();

        assert!(scenario.impacted_components.is_empty());
        assert!(scenario.user_visible_impact);
        // 4.0 + 0 + 2.0
        assert_eq!(scenario.severity, 6.0);
    }

    #[test]
    fn test_unknown_component() {
        let arch = build_shop();
        let err = simulate_one(&arch, "Ghost", &SeverityPolicy::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownComponent { name } if name == "Ghost"));
    }

    #[test]
    fn test_impacted_sets_are_component_names() {
        let arch = build_shop();
        for scenario in simulate(&arch, &SeverityPolicy::default()) {
            assert!(!scenario.impacted_components.contains(&scenario.failed_component));
            for name in &scenario.impacted_components {
                assert!(arch.component(name).is_some());
            }
            assert!((0.0..=10.0).contains(&scenario.severity));
        }
    }

    #[test]
    fn test_simulation_is_idempotent() {
        let arch = build_shop();
        let policy = SeverityPolicy::default();
        assert_eq!(simulate(&arch, &policy), simulate(&arch, &policy));
    }

    #[test]
    fn test_empty_architecture() {
        let arch = Architecture::load(ArchitectureDefinition {
            system_name: "Empty".into(),
            components: vec![],
        })
        .unwrap();
        assert!(simulate(&arch, &SeverityPolicy::default()).is_empty());
    }
}
