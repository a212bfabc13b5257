//! Run event types.
//!
//! Every pipeline stage appends one or more events to its run's log. Events
//! are persisted with the run context and returned to callers verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The pipeline stage that emitted an event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Load,
    Simulate,
    Scan,
    Aggregate,
    Remediate,
    Summarize,
    Finalize,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Simulate => "simulate",
            Self::Scan => "scan",
            Self::Aggregate => "aggregate",
            Self::Remediate => "remediate",
            Self::Summarize => "summarize",
            Self::Finalize => "finalize",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Warning,
    Error,
}

/// One entry of a run's append-only event log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// Position in the log, starting at 0.
    pub sequence: u64,
    pub stage: Stage,
    pub level: EventLevel,
    pub timestamp: DateTime<Utc>,
    pub summary: String,
    /// Structured details (counts, error text, model name).
    #[serde(default)]
    pub details: serde_json::Value,
}

impl Event {
    pub fn new(
        sequence: u64,
        stage: Stage,
        level: EventLevel,
        summary: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            sequence,
            stage,
            level,
            timestamp: Utc::now(),
            summary: summary.into(),
            details,
        }
    }
}
