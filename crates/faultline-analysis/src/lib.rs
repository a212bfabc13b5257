//! faultline-analysis: resilience and security analysis of architecture models.
//!
//! Validates an architecture definition into a dependency graph, simulates
//! every single-component failure, scans components against an open
//! security rule registry, folds the results into a resilience score, and
//! plans remediation. Every run is recorded as a hash-sealed run context
//! with an append-only event log.

pub mod aggregate;
pub mod config;
pub mod enhance;
pub mod error;
pub mod llm;
pub mod model;
pub mod remediation;
pub mod scoring;
pub mod security;
pub mod simulate;
pub mod summary;
pub mod types;

pub use config::{AnalysisConfig, LlmConfig, LlmProvider};
pub use error::{AnalysisError, ExternalError, ValidationError};
pub use model::Architecture;
pub use types::ArchitectureStats;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use faultline_core::{ArchitectureDefinition, Event, EventLevel, Stage, SystemReport};
use faultline_runlog::{
    artifact, FileRunStore, RunContext, RunId, RunIdAllocator, RunSession, RunStore, StageError,
};

use crate::aggregate::aggregate;
use crate::enhance::{EnhancementRequest, RemediationEnhancer};
use crate::llm::GeminiClient;
use crate::remediation::{merge_external, recommend, RemediationInput, RemediationRules};
use crate::security::{scan, RuleSet};
use crate::simulate::simulate;
use crate::summary::{HeuristicSummarizer, Summarizer, Summary};

/// A pipeline error tagged with the stage it happened in.
struct StageFailure {
    stage: Stage,
    error: AnalysisError,
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, StageFailure>;
}

impl<T, E: Into<AnalysisError>> AtStage<T> for Result<T, E> {
    fn at(self, stage: Stage) -> Result<T, StageFailure> {
        self.map_err(|e| StageFailure {
            stage,
            error: e.into(),
        })
    }
}

/// The analysis orchestrator.
///
/// Runs are independent; the run-ID allocator is the only state they share.
pub struct AnalysisEngine {
    store: Arc<dyn RunStore>,
    allocator: RunIdAllocator,
    config: AnalysisConfig,
    security_rules: RuleSet,
    remediation_rules: RemediationRules,
    summarizer: Arc<dyn Summarizer>,
    enhancer: Option<Arc<dyn RemediationEnhancer>>,
    external_timeout: Duration,
}

impl AnalysisEngine {
    /// Create an engine over `store` with default policies and the local
    /// heuristic summarizer. Run IDs continue after the store's latest run.
    pub fn new(store: Arc<dyn RunStore>) -> error::Result<Self> {
        let allocator = RunIdAllocator::from_store(store.as_ref())?;
        let config = AnalysisConfig::default();
        Ok(Self {
            store,
            allocator,
            remediation_rules: RemediationRules::from_policy(&config.remediation),
            external_timeout: Duration::from_secs(config.llm.timeout_secs),
            config,
            security_rules: RuleSet::with_defaults(),
            summarizer: Arc::new(HeuristicSummarizer),
            enhancer: None,
        })
    }

    /// Create an engine from configuration: a file store under `runs_dir`
    /// and the configured summarization backend.
    ///
    /// A remote backend that cannot be constructed (e.g. no API key)
    /// degrades to the heuristic with a warning.
    pub fn from_config(config: AnalysisConfig) -> error::Result<Self> {
        let store = Arc::new(FileRunStore::new(&config.runs_dir)?);
        let mut engine = Self::new(store)?.with_config(config);

        if engine.config.llm.provider == LlmProvider::Gemini {
            match GeminiClient::new(&engine.config.llm) {
                Ok(client) => {
                    let client = Arc::new(client);
                    tracing::info!(model = client.model(), "Using Gemini collaborator");
                    if engine.config.llm.enhance_remediation {
                        let enhancer: Arc<dyn RemediationEnhancer> = client.clone();
                        engine.enhancer = Some(enhancer);
                    }
                    engine.summarizer = client;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Gemini unavailable, using heuristic summaries");
                }
            }
        }

        Ok(engine)
    }

    /// Replace policies and timeouts. Rebuilds the built-in remediation rules.
    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.remediation_rules = RemediationRules::from_policy(&config.remediation);
        self.external_timeout = Duration::from_secs(config.llm.timeout_secs);
        self.config = config;
        self
    }

    pub fn with_security_rules(mut self, rules: RuleSet) -> Self {
        self.security_rules = rules;
        self
    }

    pub fn with_remediation_rules(mut self, rules: RemediationRules) -> Self {
        self.remediation_rules = rules;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn with_enhancer(mut self, enhancer: Arc<dyn RemediationEnhancer>) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    /// Upper bound on each summarization/enhancement call.
    pub fn with_external_timeout(mut self, timeout: Duration) -> Self {
        self.external_timeout = timeout;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RunStore> {
        &self.store
    }

    /// Run the whole pipeline for one definition.
    ///
    /// The run context is persisted whether the run succeeds or fails. On
    /// failure the error carries the run's ID, the failing stage, and the
    /// cause.
    pub async fn start_run(&self, definition: ArchitectureDefinition) -> error::Result<RunId> {
        let run_id = self.allocator.next_id();
        let start = std::time::Instant::now();
        let mut session = RunSession::new(run_id);

        tracing::info!(
            run_id = %run_id,
            system = %definition.system_name,
            components = definition.components.len(),
            "Run started"
        );

        let outcome = self.execute(&mut session, definition).await;
        match outcome {
            Ok(()) => {
                let context = session.finalize();
                self.store.save(&context).map_err(|e| AnalysisError::RunFailed {
                    run_id,
                    stage: Stage::Finalize,
                    source: Box::new(e.into()),
                })?;
                tracing::info!(
                    run_id = %run_id,
                    events = context.events().len(),
                    computation_ms = start.elapsed().as_millis() as u64,
                    "Run finalized"
                );
                Ok(run_id)
            }
            Err(StageFailure { stage, error }) => {
                session.fail(stage, &error);
                let context = session.finalize();
                if let Err(e) = self.store.save(&context) {
                    tracing::error!(run_id = %run_id, error = %e, "Failed to persist failed run");
                }
                Err(AnalysisError::RunFailed {
                    run_id,
                    stage,
                    source: Box::new(error),
                })
            }
        }
    }

    /// The report of a finalized run. `NotFound` for unknown runs and for
    /// runs that failed before producing a report.
    pub fn get_report(&self, run_id: RunId) -> error::Result<SystemReport> {
        self.store
            .get_report(run_id)
            .map_err(|e| AnalysisError::from_lookup(run_id, e))
    }

    /// The ordered event log of a run, including failed runs.
    pub fn get_events(&self, run_id: RunId) -> error::Result<Vec<Event>> {
        Ok(self.get_context(run_id)?.events().to_vec())
    }

    /// The full persisted run context.
    pub fn get_context(&self, run_id: RunId) -> error::Result<RunContext> {
        self.store
            .get(run_id)
            .map_err(|e| AnalysisError::from_lookup(run_id, e))
    }

    async fn execute(
        &self,
        session: &mut RunSession,
        definition: ArchitectureDefinition,
    ) -> Result<(), StageFailure> {
        // LOAD
        let architecture = Architecture::load(definition).at(Stage::Load)?;
        let stats = architecture.stats();
        session
            .set_artifact(artifact::ARCHITECTURE, &architecture)
            .at(Stage::Load)?;
        self.complete(
            session,
            Stage::Load,
            &format!(
                "Loaded {} components with {} dependencies",
                stats.total_components, stats.total_dependencies
            ),
            serde_json::json!({
                "system_name": architecture.system_name(),
                "components": stats.total_components,
                "dependencies": stats.total_dependencies,
                "public": stats.public_count,
                "external_api": stats.external_api_count,
            }),
        )?;

        // SIMULATE
        let scenarios = simulate(&architecture, &self.config.severity);
        if scenarios.len() != architecture.len() {
            let error = StageError::Invariant {
                stage: Stage::Simulate,
                message: format!(
                    "{} scenarios for {} components",
                    scenarios.len(),
                    architecture.len()
                ),
            };
            return Err(StageFailure {
                stage: Stage::Simulate,
                error: error.into(),
            });
        }
        session
            .set_artifact(artifact::SCENARIOS, &scenarios)
            .at(Stage::Simulate)?;
        let user_visible = scenarios.iter().filter(|s| s.user_visible_impact).count();
        self.complete(
            session,
            Stage::Simulate,
            &format!("Simulated {} failure scenarios", scenarios.len()),
            serde_json::json!({
                "scenarios": scenarios.len(),
                "user_visible": user_visible,
            }),
        )?;

        // SCAN
        let risks = scan(&architecture, &self.security_rules);
        if let Some(stray) = risks
            .iter()
            .find(|r| architecture.component(&r.component).is_none())
        {
            let error = StageError::Invariant {
                stage: Stage::Scan,
                message: format!("risk reported for undeclared component {}", stray.component),
            };
            return Err(StageFailure {
                stage: Stage::Scan,
                error: error.into(),
            });
        }
        session.set_artifact(artifact::RISKS, &risks).at(Stage::Scan)?;
        self.complete(
            session,
            Stage::Scan,
            &format!("Detected {} security risks", risks.len()),
            serde_json::json!({
                "risks": risks.len(),
                "rules": self.security_rules.ids(),
            }),
        )?;

        // AGGREGATE
        let metrics = aggregate(&scenarios, &risks, &self.config.resilience);
        session
            .set_artifact(artifact::METRICS, &metrics)
            .at(Stage::Aggregate)?;
        self.complete(
            session,
            Stage::Aggregate,
            &format!(
                "Resilience score {:.2}, worst case severity {:.2}",
                metrics.overall_resilience_score, metrics.worst_case_severity
            ),
            serde_json::json!({
                "overall_resilience_score": metrics.overall_resilience_score,
                "worst_case_severity": metrics.worst_case_severity,
            }),
        )?;

        // REMEDIATE
        let input = RemediationInput {
            architecture: &architecture,
            scenarios: &scenarios,
            risks: &risks,
            metrics: &metrics,
        };
        let local = recommend(&input, &self.remediation_rules);
        let local_count = local.len();

        let suggestions = match &self.enhancer {
            None => local,
            Some(enhancer) => {
                let request = EnhancementRequest {
                    architecture: &architecture,
                    scenarios: &scenarios,
                    risks: &risks,
                    metrics: &metrics,
                    local: &local,
                };
                let outcome = self.bounded(enhancer.name(), enhancer.enhance(request)).await;
                match outcome {
                    Ok(extra) => merge_external(local, extra),
                    Err(e) => {
                        self.warn(session, Stage::Remediate, enhancer.name(), &e)?;
                        local
                    }
                }
            }
        };
        session
            .set_artifact(artifact::SUGGESTIONS, &suggestions)
            .at(Stage::Remediate)?;
        self.complete(
            session,
            Stage::Remediate,
            &format!("Planned {} remediation suggestions", suggestions.len()),
            serde_json::json!({
                "local": local_count,
                "external": suggestions.len().saturating_sub(local_count),
            }),
        )?;

        // SUMMARIZE
        let mut report = SystemReport {
            system_name: architecture.system_name().to_string(),
            overall_resilience_score: metrics.overall_resilience_score,
            worst_case_severity: metrics.worst_case_severity,
            failure_scenarios: scenarios,
            security_risks: risks,
            remediation_suggestions: suggestions,
            ai_summary: String::new(),
            ai_summary_llm_used: false,
        };

        let summarizer = self.summarizer.name();
        let outcome = self.bounded(summarizer, self.summarizer.summarize(&report)).await;
        let summary = match outcome {
            Ok(summary) if !summary.text.trim().is_empty() => summary,
            Ok(_) => {
                let e = ExternalError::Protocol("empty summary".to_string());
                self.warn(session, Stage::Summarize, summarizer, &e)?;
                HeuristicSummarizer.summarize_report(&report)
            }
            Err(e) => {
                self.warn(session, Stage::Summarize, summarizer, &e)?;
                HeuristicSummarizer.summarize_report(&report)
            }
        };
        let Summary { text, llm_used } = summary;
        report.ai_summary = text;
        report.ai_summary_llm_used = llm_used;
        self.complete(
            session,
            Stage::Summarize,
            if llm_used {
                "Summary produced by external model"
            } else {
                "Summary produced by local heuristic"
            },
            serde_json::json!({ "llm_used": llm_used, "summarizer": summarizer }),
        )?;

        // FINALIZE
        session
            .set_artifact(artifact::REPORT, &report)
            .at(Stage::Finalize)?;
        self.complete(
            session,
            Stage::Finalize,
            "Report assembled",
            serde_json::json!({
                "scenarios": report.failure_scenarios.len(),
                "risks": report.security_risks.len(),
                "suggestions": report.remediation_suggestions.len(),
            }),
        )?;

        Ok(())
    }

    fn complete(
        &self,
        session: &mut RunSession,
        stage: Stage,
        summary: &str,
        details: serde_json::Value,
    ) -> Result<(), StageFailure> {
        session.complete_stage(stage, summary, details).at(stage)?;
        tracing::info!(run_id = %session.run_id(), stage = %stage, "{summary}");
        Ok(())
    }

    /// Record a recoverable collaborator failure.
    fn warn(
        &self,
        session: &mut RunSession,
        stage: Stage,
        collaborator: &str,
        error: &ExternalError,
    ) -> Result<(), StageFailure> {
        tracing::warn!(
            run_id = %session.run_id(),
            stage = %stage,
            collaborator,
            error = %error,
            "External collaborator failed, using local fallback"
        );
        session
            .record(
                stage,
                EventLevel::Warning,
                &format!("{collaborator} unavailable, using local fallback: {error}"),
                serde_json::json!({
                    "collaborator": collaborator,
                    "error": error.to_string(),
                }),
            )
            .at(stage)
    }

    /// Await an external call, failing with `Timeout` past the configured bound.
    async fn bounded<T>(
        &self,
        collaborator: &str,
        call: impl Future<Output = Result<T, ExternalError>>,
    ) -> Result<T, ExternalError> {
        match tokio::time::timeout(self.external_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ExternalError::Timeout {
                collaborator: collaborator.to_string(),
                millis: self.external_timeout.as_millis(),
            }),
        }
    }
}
