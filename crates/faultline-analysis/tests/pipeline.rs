//! End-to-end tests for the analysis pipeline.
//!
//! Run with: cargo test --package faultline-analysis --test pipeline

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use faultline_analysis::aggregate::{aggregate, ResiliencePolicy};
use faultline_analysis::enhance::{EnhancementRequest, RemediationEnhancer};
use faultline_analysis::scoring::SeverityPolicy;
use faultline_analysis::security::{scan, RuleSet, SecurityRule};
use faultline_analysis::simulate::simulate;
use faultline_analysis::summary::{Summarizer, Summary, SUMMARY_HEADING};
use faultline_analysis::{
    AnalysisEngine, AnalysisError, Architecture, ExternalError, ValidationError,
};
use faultline_core::{
    ArchitectureDefinition, Component, ComponentDefinition, Criticality, EventLevel, Priority,
    Provenance, RemediationSuggestion, RiskSeverity, RiskType, SecurityRisk, Stage,
    SuggestionCategory, SystemReport, SYSTEM_TARGET,
};
use faultline_runlog::{
    artifact, FileRunStore, MemoryRunStore, RunId, RunState, RunStore, StoreError,
};

// ── Fixtures ─────────────────────────────────────────────────────

fn web_stack() -> ArchitectureDefinition {
    ArchitectureDefinition {
        system_name: "Web Stack".into(),
        components: vec![
            ComponentDefinition::new("Web Frontend", "web_client")
                .public(true)
                .depends_on(["API Gateway"]),
            ComponentDefinition::new("API Gateway", "gateway")
                .public(true)
                .criticality(Criticality::High)
                .depends_on(["Auth Service"]),
            ComponentDefinition::new("Auth Service", "service"),
        ],
    }
}

fn memory_engine() -> AnalysisEngine {
    AnalysisEngine::new(Arc::new(MemoryRunStore::new())).unwrap()
}

struct StalledSummarizer;

#[async_trait]
impl Summarizer for StalledSummarizer {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn summarize(&self, _report: &SystemReport) -> Result<Summary, ExternalError> {
        std::future::pending().await
    }
}

struct RemoteSummarizer;

#[async_trait]
impl Summarizer for RemoteSummarizer {
    fn name(&self) -> &str {
        "remote"
    }

    async fn summarize(&self, report: &SystemReport) -> Result<Summary, ExternalError> {
        Ok(Summary {
            text: format!("Remote view of {}", report.system_name),
            llm_used: true,
        })
    }
}

/// Repeats the local plan and adds one new suggestion.
struct EchoEnhancer {
    calls: AtomicUsize,
}

#[async_trait]
impl RemediationEnhancer for EchoEnhancer {
    fn name(&self) -> &str {
        "echo"
    }

    async fn enhance(
        &self,
        request: EnhancementRequest<'_>,
    ) -> Result<Vec<RemediationSuggestion>, ExternalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut extra = request.local.to_vec();
        extra.push(RemediationSuggestion {
            category: SuggestionCategory::Architecture,
            target: SYSTEM_TARGET.into(),
            priority: Priority::Low,
            title: "Add a CDN in front of the web tier".into(),
            details: "Offload static traffic.".into(),
            provenance: Provenance::Local,
        });
        Ok(extra)
    }
}

struct FailingEnhancer;

#[async_trait]
impl RemediationEnhancer for FailingEnhancer {
    fn name(&self) -> &str {
        "failing"
    }

    async fn enhance(
        &self,
        _request: EnhancementRequest<'_>,
    ) -> Result<Vec<RemediationSuggestion>, ExternalError> {
        Err(ExternalError::Unavailable("connection refused".into()))
    }
}

// ── End to end ───────────────────────────────────────────────────

#[tokio::test]
async fn web_stack_end_to_end() {
    let engine = memory_engine();
    let run_id = engine.start_run(web_stack()).await.unwrap();
    let report = engine.get_report(run_id).unwrap();

    assert_eq!(report.system_name, "Web Stack");
    assert_eq!(report.failure_scenarios.len(), 3);

    let auth = &report.failure_scenarios[2];
    assert_eq!(auth.scenario_name, "Auth Service FAILURE");
    assert_eq!(auth.impacted_components, vec!["API Gateway", "Web Frontend"]);
    assert!(auth.user_visible_impact);
    // 4.0 + 3.0 × 2/2 + 2.0
    assert_eq!(auth.severity, 9.0);

    let web = &report.failure_scenarios[0];
    assert!(web.impacted_components.is_empty());

    // API Gateway: 6.0 + 3.0 × 1/2 + 2.0 + 0.5
    assert_eq!(report.failure_scenarios[1].severity, 10.0);
    assert_eq!(report.worst_case_severity, 10.0);
    assert!((0.0..=10.0).contains(&report.overall_resilience_score));

    // DoS on both public components; the gateway is high criticality.
    let dos: Vec<(&str, String)> = report
        .security_risks
        .iter()
        .map(|r| (r.component.as_str(), r.severity.to_string()))
        .collect();
    assert_eq!(
        dos,
        vec![("Web Frontend", "MEDIUM".to_string()), ("API Gateway", "HIGH".to_string())]
    );

    let titles: Vec<&str> = report
        .remediation_suggestions
        .iter()
        .map(|s| s.title.as_str())
        .collect();
    assert!(titles.contains(&"Harden Auth Service against failures"));
    assert!(titles.contains(&"Eliminate single point of failure at API Gateway"));

    assert!(report.ai_summary.starts_with(SUMMARY_HEADING));
    assert!(!report.ai_summary_llm_used);
}

#[tokio::test]
async fn report_priorities_are_sorted() {
    let engine = memory_engine();
    let run_id = engine.start_run(web_stack()).await.unwrap();
    let report = engine.get_report(run_id).unwrap();

    let priorities: Vec<Priority> = report
        .remediation_suggestions
        .iter()
        .map(|s| s.priority)
        .collect();
    let mut sorted = priorities.clone();
    sorted.sort();
    assert_eq!(priorities, sorted);
}

#[tokio::test]
async fn event_log_is_ordered_and_complete() {
    let engine = memory_engine();
    let run_id = engine.start_run(web_stack()).await.unwrap();
    let events = engine.get_events(run_id).unwrap();

    assert_eq!(events.len(), 7);
    assert!(events.iter().all(|e| e.level == EventLevel::Info));
    assert!(events.windows(2).all(|w| w[0].sequence < w[1].sequence));
    assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert_eq!(events[0].details["components"], 3);
}

// ── Validation failures ──────────────────────────────────────────

#[tokio::test]
async fn cyclic_definition_fails_at_load() {
    let engine = memory_engine();
    let definition = ArchitectureDefinition {
        system_name: "Loop".into(),
        components: vec![
            ComponentDefinition::new("A", "service").depends_on(["B"]),
            ComponentDefinition::new("B", "service").depends_on(["A"]),
        ],
    };

    let err = engine.start_run(definition).await.unwrap_err();
    let (run_id, stage, source) = match err {
        AnalysisError::RunFailed {
            run_id,
            stage,
            source,
        } => (run_id, stage, source),
        other => panic!("expected RunFailed, got {other:?}"),
    };
    assert_eq!(run_id, RunId(1));
    assert_eq!(stage, Stage::Load);
    assert!(matches!(
        *source,
        AnalysisError::Validation(ValidationError::CyclicDependency { .. })
    ));

    // The partial context is persisted: one error event, FAILED state.
    let context = engine.get_context(run_id).unwrap();
    assert_eq!(context.state(), RunState::Failed);
    assert_eq!(context.events().len(), 1);
    assert_eq!(context.events()[0].level, EventLevel::Error);
    assert_eq!(context.events()[0].stage, Stage::Load);
    assert!(context.events()[0].summary.contains("A -> B -> A"));

    // No report for a failed run.
    assert!(matches!(
        engine.get_report(run_id),
        Err(AnalysisError::NotFound(RunId(1)))
    ));

    // The failed run's ID is not recycled.
    let next = engine.start_run(web_stack()).await.unwrap();
    assert_eq!(next, RunId(2));
}

/// Reports every component under a name that was never declared.
struct MisattributingRule;

impl SecurityRule for MisattributingRule {
    fn id(&self) -> &'static str {
        "misattributing"
    }

    fn evaluate(&self, component: &Component) -> Option<SecurityRisk> {
        Some(SecurityRisk {
            component: format!("{} (shadow)", component.name),
            risk_type: RiskType::Other("shadow".into()),
            severity: RiskSeverity::Low,
            description: "finding on an undeclared component".into(),
            mitigation: String::new(),
        })
    }
}

#[tokio::test]
async fn scan_failure_keeps_earlier_stages_and_skips_the_rest() {
    let mut rules = RuleSet::with_defaults();
    rules.register(Box::new(MisattributingRule));
    let engine = memory_engine().with_security_rules(rules);

    let err = engine.start_run(web_stack()).await.unwrap_err();
    let (run_id, stage) = match err {
        AnalysisError::RunFailed { run_id, stage, .. } => (run_id, stage),
        other => panic!("expected RunFailed, got {other:?}"),
    };
    assert_eq!(stage, Stage::Scan);

    let context = engine.get_context(run_id).unwrap();
    assert_eq!(context.state(), RunState::Failed);
    assert!(context.verify_integrity());

    let log: Vec<(Stage, EventLevel)> = context.events().iter().map(|e| (e.stage, e.level)).collect();
    assert_eq!(
        log,
        vec![
            (Stage::Load, EventLevel::Info),
            (Stage::Simulate, EventLevel::Info),
            (Stage::Scan, EventLevel::Error),
        ]
    );
    assert!(context.events()[2].summary.contains("Web Frontend (shadow)"));

    assert!(context.artifacts().contains_key(artifact::ARCHITECTURE));
    assert!(context.artifacts().contains_key(artifact::SCENARIOS));
    for skipped in [artifact::RISKS, artifact::METRICS, artifact::SUGGESTIONS, artifact::REPORT] {
        assert!(!context.artifacts().contains_key(skipped), "unexpected {skipped}");
    }
    assert!(matches!(
        engine.get_report(run_id),
        Err(AnalysisError::NotFound(_))
    ));
}

#[tokio::test]
async fn dangling_reference_fails_at_load() {
    let engine = memory_engine();
    let definition = ArchitectureDefinition {
        system_name: "Broken".into(),
        components: vec![ComponentDefinition::new("Web", "web_client").depends_on(["Ghost"])],
    };

    let err = engine.start_run(definition).await.unwrap_err();
    match err {
        AnalysisError::RunFailed { stage, source, .. } => {
            assert_eq!(stage, Stage::Load);
            assert!(source.to_string().contains("Ghost"));
        }
        other => panic!("expected RunFailed, got {other:?}"),
    }
}

// ── External collaborators ───────────────────────────────────────

#[tokio::test]
async fn stalled_summarizer_falls_back_to_heuristic() {
    let engine = memory_engine()
        .with_summarizer(Arc::new(StalledSummarizer))
        .with_external_timeout(Duration::from_millis(50));

    let run_id = engine.start_run(web_stack()).await.unwrap();
    let report = engine.get_report(run_id).unwrap();

    assert!(!report.ai_summary_llm_used);
    assert!(!report.ai_summary.trim().is_empty());

    let events = engine.get_events(run_id).unwrap();
    let warning = events
        .iter()
        .find(|e| e.level == EventLevel::Warning)
        .expect("timeout should be logged");
    assert_eq!(warning.stage, Stage::Summarize);
    assert!(warning.summary.contains("stalled"));
    assert_eq!(engine.get_context(run_id).unwrap().state(), RunState::Finalized);
}

#[tokio::test]
async fn remote_summary_is_marked() {
    let engine = memory_engine().with_summarizer(Arc::new(RemoteSummarizer));
    let run_id = engine.start_run(web_stack()).await.unwrap();
    let report = engine.get_report(run_id).unwrap();

    assert!(report.ai_summary_llm_used);
    assert_eq!(report.ai_summary, "Remote view of Web Stack");
}

#[tokio::test]
async fn enhancer_output_is_deduplicated_and_tagged() {
    let baseline = memory_engine();
    let base_id = baseline.start_run(web_stack()).await.unwrap();
    let local = baseline.get_report(base_id).unwrap().remediation_suggestions;

    let enhancer = Arc::new(EchoEnhancer {
        calls: AtomicUsize::new(0),
    });
    let engine = memory_engine().with_enhancer(enhancer.clone());
    let run_id = engine.start_run(web_stack()).await.unwrap();
    let merged = engine.get_report(run_id).unwrap().remediation_suggestions;

    assert_eq!(enhancer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(merged.len(), local.len() + 1);

    let keys: HashSet<_> = merged.iter().map(|s| s.dedup_key()).collect();
    assert_eq!(keys.len(), merged.len());

    let external: Vec<_> = merged
        .iter()
        .filter(|s| s.provenance == Provenance::External)
        .collect();
    assert_eq!(external.len(), 1);
    assert_eq!(external[0].title, "Add a CDN in front of the web tier");
    assert_eq!(merged.last().map(|s| s.priority), Some(Priority::Low));
}

#[tokio::test]
async fn failing_enhancer_keeps_local_plan() {
    let baseline = memory_engine();
    let base_id = baseline.start_run(web_stack()).await.unwrap();
    let local = baseline.get_report(base_id).unwrap().remediation_suggestions;

    let engine = memory_engine().with_enhancer(Arc::new(FailingEnhancer));
    let run_id = engine.start_run(web_stack()).await.unwrap();
    let report = engine.get_report(run_id).unwrap();

    assert_eq!(report.remediation_suggestions, local);

    let warnings: Vec<_> = engine
        .get_events(run_id)
        .unwrap()
        .into_iter()
        .filter(|e| e.level == EventLevel::Warning)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].stage, Stage::Remediate);
    assert!(warnings[0].summary.contains("connection refused"));
}

// ── Concurrency and persistence ──────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_runs_get_unique_ids() {
    let engine = Arc::new(memory_engine());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.start_run(web_stack()).await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap());
    }

    let unique: HashSet<RunId> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 16);
    assert_eq!(ids.iter().max(), Some(&RunId(16)));
    for id in ids {
        assert!(engine.get_report(id).is_ok());
    }
}

#[tokio::test]
async fn file_store_persists_and_resumes_ids() {
    let dir = tempfile::tempdir().unwrap();

    let first = {
        let store = Arc::new(FileRunStore::new(dir.path()).unwrap());
        let engine = AnalysisEngine::new(store).unwrap();
        engine.start_run(web_stack()).await.unwrap()
    };
    assert_eq!(first, RunId(1));
    assert!(dir.path().join("run_001").join("context.json").is_file());
    assert!(dir.path().join("run_001").join("report.json").is_file());

    // A fresh engine over the same directory continues numbering.
    let store = Arc::new(FileRunStore::new(dir.path()).unwrap());
    let engine = AnalysisEngine::new(store.clone()).unwrap();
    let second = engine.start_run(web_stack()).await.unwrap();
    assert_eq!(second, RunId(2));

    let report = engine.get_report(first).unwrap();
    assert_eq!(report.system_name, "Web Stack");
    assert_eq!(store.latest_run_id().unwrap(), Some(RunId(2)));
}

#[tokio::test]
async fn fractional_metadata_survives_file_store_reload() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileRunStore::new(dir.path()).unwrap());
    let engine = AnalysisEngine::new(store).unwrap();

    let mut component = ComponentDefinition::new("Scorer", "service");
    component
        .metadata
        .insert("weight".into(), serde_json::json!(0.47960756426982587));
    let definition = ArchitectureDefinition {
        system_name: "Weighted".into(),
        components: vec![component],
    };

    let run_id = engine.start_run(definition).await.unwrap();
    let report = engine.get_report(run_id).unwrap();
    assert_eq!(report.system_name, "Weighted");
    assert_eq!(engine.get_events(run_id).unwrap().len(), 7);
}

#[tokio::test]
async fn tampered_context_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileRunStore::new(dir.path()).unwrap());
    let engine = AnalysisEngine::new(store).unwrap();
    let run_id = engine.start_run(web_stack()).await.unwrap();

    let path = dir.path().join("run_001").join("context.json");
    let mut raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    raw["events"][0]["summary"] = serde_json::json!("Loaded 0 components");
    std::fs::write(&path, serde_json::to_string_pretty(&raw).unwrap()).unwrap();

    assert!(matches!(
        engine.get_events(run_id),
        Err(AnalysisError::Store(StoreError::IntegrityViolation(RunId(1))))
    ));
}

// ── Properties ───────────────────────────────────────────────────

#[test]
fn stages_are_idempotent() {
    let arch = Architecture::load(web_stack()).unwrap();
    let policy = SeverityPolicy::default();
    let rules = RuleSet::with_defaults();

    let run = || {
        let scenarios = simulate(&arch, &policy);
        let risks = scan(&arch, &rules);
        let metrics = aggregate(&scenarios, &risks, &ResiliencePolicy::default());
        serde_json::to_string(&(scenarios, risks, metrics)).unwrap()
    };

    assert_eq!(run(), run());
}

#[test]
fn adding_a_public_component_never_raises_the_score() {
    let policy = SeverityPolicy::default();
    let rules = RuleSet::with_defaults();
    let score = |definition: ArchitectureDefinition| {
        let arch = Architecture::load(definition).unwrap();
        let scenarios = simulate(&arch, &policy);
        let risks = scan(&arch, &rules);
        aggregate(&scenarios, &risks, &ResiliencePolicy::default()).overall_resilience_score
    };

    let before = score(web_stack());

    let mut riskier = web_stack();
    riskier.components[2] = ComponentDefinition::new("Auth Service", "service")
        .public(true)
        .external_api(true);
    let after = score(riskier);

    assert!(after <= before, "{after} > {before}");
}

#[test]
fn impacted_sets_are_subsets_of_components() {
    let arch = Architecture::load(web_stack()).unwrap();
    let names: HashSet<&str> = arch.components().iter().map(|c| c.name.as_str()).collect();

    let scenarios = simulate(&arch, &SeverityPolicy::default());
    assert_eq!(scenarios.len(), names.len());
    for scenario in &scenarios {
        for impacted in &scenario.impacted_components {
            assert!(names.contains(impacted.as_str()));
            assert_ne!(impacted, &scenario.failed_component);
        }
    }
}
