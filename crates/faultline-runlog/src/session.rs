//! Run session: the single writer of a run's event log.
//!
//! The orchestrator drives a session through the pipeline stages:
//!
//! ```
//! # use faultline_runlog::{RunId, RunSession, RunState};
//! # use faultline_core::Stage;
//! let mut session = RunSession::new(RunId(1));
//! session.complete_stage(Stage::Load, "Loaded 3 components", serde_json::json!({"components": 3})).unwrap();
//! session.set_artifact("metrics", &serde_json::json!({"score": 7.5})).unwrap();
//! let context = session.finalize();
//! assert_eq!(context.state(), RunState::Loaded);
//! assert!(context.content_hash().is_some());
//! ```

use std::collections::BTreeMap;

use chrono::Utc;
use faultline_core::{Event, EventLevel, Stage};
use serde::Serialize;

use crate::{RunContext, RunId, RunState};

/// An internal invariant of the pipeline was violated.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: RunState, to: RunState },

    #[error("Run is already {state}; no further events accepted")]
    Terminal { state: RunState },

    #[error("Artifact {key} could not be serialized: {source}")]
    Artifact {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invariant violated in {stage}: {message}")]
    Invariant { stage: Stage, message: String },
}

/// A session builder that records a run's lifecycle incrementally.
pub struct RunSession {
    context: RunContext,
}

impl RunSession {
    /// Start a new run in the `CREATED` state.
    pub fn new(run_id: RunId) -> Self {
        Self {
            context: RunContext {
                run_id,
                state: RunState::Created,
                events: Vec::new(),
                artifacts: BTreeMap::new(),
                started_at: Utc::now(),
                completed_at: None,
                content_hash: None,
            },
        }
    }

    pub fn run_id(&self) -> RunId {
        self.context.run_id
    }

    pub fn state(&self) -> RunState {
        self.context.state
    }

    pub fn events(&self) -> &[Event] {
        &self.context.events
    }

    /// Append an event without changing the lifecycle state.
    pub fn record(
        &mut self,
        stage: Stage,
        level: EventLevel,
        summary: &str,
        details: serde_json::Value,
    ) -> Result<(), StageError> {
        if self.context.state.is_terminal() {
            return Err(StageError::Terminal {
                state: self.context.state,
            });
        }
        self.push_event(stage, level, summary, details);
        Ok(())
    }

    /// Mark `stage` as successfully completed and advance the state machine.
    pub fn complete_stage(
        &mut self,
        stage: Stage,
        summary: &str,
        details: serde_json::Value,
    ) -> Result<(), StageError> {
        let next = RunState::reached_by(stage);
        let from = self.context.state;
        if from.is_terminal() {
            return Err(StageError::Terminal { state: from });
        }
        if !from.can_transition_to(next) {
            return Err(StageError::InvalidTransition { from, to: next });
        }

        self.push_event(stage, EventLevel::Info, summary, details);
        self.context.state = next;

        tracing::debug!(
            run_id = %self.context.run_id,
            stage = %stage,
            state = %next,
            "Stage completed"
        );
        Ok(())
    }

    /// Store an intermediate artifact under `key`, replacing any previous value.
    pub fn set_artifact<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StageError> {
        let json = serde_json::to_value(value).map_err(|source| StageError::Artifact {
            key: key.to_string(),
            source,
        })?;
        self.context.artifacts.insert(key.to_string(), json);
        Ok(())
    }

    /// Move the run to `FAILED`, recording the cause against the failing stage.
    ///
    /// A run that is already terminal keeps its state; the cause is still logged.
    pub fn fail(&mut self, stage: Stage, error: &dyn std::fmt::Display) {
        let message = error.to_string();
        self.push_event(
            stage,
            EventLevel::Error,
            &format!("Stage {stage} failed: {message}"),
            serde_json::json!({ "error": message }),
        );
        if self.context.state.can_transition_to(RunState::Failed) {
            self.context.state = RunState::Failed;
        }
        tracing::error!(
            run_id = %self.context.run_id,
            stage = %stage,
            error = %message,
            "Run failed"
        );
    }

    /// Finalize the session: set completed_at and compute the content hash.
    pub fn finalize(mut self) -> RunContext {
        self.context.completed_at = Some(Utc::now());
        let hash = self.context.compute_hash();
        self.context.content_hash = Some(hash);
        self.context
    }

    fn push_event(&mut self, stage: Stage, level: EventLevel, summary: &str, details: serde_json::Value) {
        let sequence = self.context.events.len() as u64;
        self.context
            .events
            .push(Event::new(sequence, stage, level, summary, details));
    }
}
