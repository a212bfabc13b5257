//! Error types for the faultline-analysis crate.

use faultline_core::Stage;
use faultline_runlog::{RunId, StageError, StoreError};
use thiserror::Error;

/// A malformed or inconsistent architecture definition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Component #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("Duplicate component name: {name}")]
    DuplicateComponent { name: String },

    #[error("Component {component} depends on undeclared component {dependency}")]
    DanglingDependency {
        component: String,
        dependency: String,
    },

    #[error("Cyclic dependency: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },
}

/// A summarization or enhancement collaborator failed. Always recoverable.
#[derive(Error, Debug)]
pub enum ExternalError {
    #[error("{collaborator} timed out after {millis}ms")]
    Timeout { collaborator: String, millis: u128 },

    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Protocol(String),
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid architecture: {0}")]
    Validation(#[from] ValidationError),

    #[error("Stage error: {0}")]
    Stage(#[from] StageError),

    #[error("Run store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] faultline_core::FaultlineError),

    #[error("Unknown component: {name}")]
    UnknownComponent { name: String },

    #[error("Run not found: {0}")]
    NotFound(RunId),

    #[error("Run {run_id} failed at stage {stage}: {source}")]
    RunFailed {
        run_id: RunId,
        stage: Stage,
        #[source]
        source: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// Map a store lookup error for `run_id`, folding `NotFound` into ours.
    pub(crate) fn from_lookup(run_id: RunId, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::NotFound(run_id),
            other => Self::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
