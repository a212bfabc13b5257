//! Faultline run log: identity, lifecycle, and tamper-evident audit trail.
//!
//! Each analysis run gets a strictly increasing [`RunId`] and a
//! [`RunContext`] recording its lifecycle state, an append-only event log,
//! and the intermediate artifacts of every stage. Contexts are built through
//! a [`session::RunSession`], content-hashed with BLAKE3 on finalization, and
//! persisted through a [`store::RunStore`].

pub mod allocator;
pub mod hash;
pub mod session;
pub mod store;

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use faultline_core::{Event, Stage};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use allocator::RunIdAllocator;
pub use session::{RunSession, StageError};
pub use store::{FileRunStore, MemoryRunStore, RunStore, StoreError};

// ── Run identity ─────────────────────────────────────────────────

/// Sequential run identifier, rendered zero-padded (`001`, `002`, ...).
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

impl FromStr for RunId {
    type Err = std::num::ParseIntError;

    /// Accepts `7`, `007`, and `run_007`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("run_").unwrap_or(s);
        digits.parse::<u64>().map(RunId)
    }
}

// ── Lifecycle ────────────────────────────────────────────────────

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Created,
    Loaded,
    Simulated,
    Scanned,
    Aggregated,
    Remediated,
    Summarized,
    Finalized,
    Failed,
}

impl RunState {
    /// The state a successful completion of `stage` moves the run into.
    pub fn reached_by(stage: Stage) -> Self {
        match stage {
            Stage::Load => Self::Loaded,
            Stage::Simulate => Self::Simulated,
            Stage::Scan => Self::Scanned,
            Stage::Aggregate => Self::Aggregated,
            Stage::Remediate => Self::Remediated,
            Stage::Summarize => Self::Summarized,
            Stage::Finalize => Self::Finalized,
        }
    }

    /// The only non-failure successor of this state.
    pub fn successor(&self) -> Option<Self> {
        match self {
            Self::Created => Some(Self::Loaded),
            Self::Loaded => Some(Self::Simulated),
            Self::Simulated => Some(Self::Scanned),
            Self::Scanned => Some(Self::Aggregated),
            Self::Aggregated => Some(Self::Remediated),
            Self::Remediated => Some(Self::Summarized),
            Self::Summarized => Some(Self::Finalized),
            Self::Finalized | Self::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized | Self::Failed)
    }

    pub fn can_transition_to(&self, next: RunState) -> bool {
        if next == Self::Failed {
            return !self.is_terminal();
        }
        self.successor() == Some(next)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "CREATED",
            Self::Loaded => "LOADED",
            Self::Simulated => "SIMULATED",
            Self::Scanned => "SCANNED",
            Self::Aggregated => "AGGREGATED",
            Self::Remediated => "REMEDIATED",
            Self::Summarized => "SUMMARIZED",
            Self::Finalized => "FINALIZED",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

// ── Run context ──────────────────────────────────────────────────

/// The complete, finalized record of one analysis run.
///
/// Only a [`RunSession`] can append to the event log; once finalized the
/// context is read-only and carries a BLAKE3 content hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunContext {
    pub(crate) run_id: RunId,
    pub(crate) state: RunState,
    pub(crate) events: Vec<Event>,
    /// Intermediate artifacts keyed by stage artifact name.
    pub(crate) artifacts: BTreeMap<String, serde_json::Value>,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
    /// BLAKE3 content hash (hex), set on finalization.
    pub(crate) content_hash: Option<String>,
}

impl RunContext {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn artifacts(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.artifacts
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn content_hash(&self) -> Option<&str> {
        self.content_hash.as_deref()
    }

    /// Deserialize a stored artifact, if present.
    pub fn artifact<T: DeserializeOwned>(&self, key: &str) -> Option<Result<T, serde_json::Error>> {
        self.artifacts
            .get(key)
            .map(|value| serde_json::from_value(value.clone()))
    }

    /// Compute the BLAKE3 hash of the context's content.
    /// The hash covers all fields except `content_hash` itself.
    pub fn compute_hash(&self) -> String {
        hash::compute_context_hash(self)
    }

    /// Verify that the stored content_hash matches a freshly computed hash.
    pub fn verify_integrity(&self) -> bool {
        match &self.content_hash {
            Some(stored) => stored == &self.compute_hash(),
            None => false,
        }
    }
}

/// Artifact keys written by the analysis pipeline.
pub mod artifact {
    pub const ARCHITECTURE: &str = "architecture";
    pub const SCENARIOS: &str = "scenarios";
    pub const RISKS: &str = "risks";
    pub const METRICS: &str = "metrics";
    pub const SUGGESTIONS: &str = "suggestions";
    pub const REPORT: &str = "report";
}
