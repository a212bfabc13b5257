//! Run storage: trait + file-backed and in-memory implementations.
//!
//! Finalized run contexts are stored as JSON and verified against their
//! BLAKE3 content hash on every read.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use faultline_core::SystemReport;

use crate::{artifact, RunContext, RunId};

/// Errors that can occur during run storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Run not found: {0}")]
    NotFound(RunId),

    #[error("Integrity check failed for run {0}: stored hash does not match content")]
    IntegrityViolation(RunId),

    #[error("Run context has no content hash (not finalized)")]
    NotFinalized,

    #[error("Run store lock poisoned")]
    Poisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Trait for run persistence backends.
pub trait RunStore: Send + Sync {
    /// Store a finalized run context. Returns an error if it has no content hash.
    fn save(&self, context: &RunContext) -> Result<(), StoreError>;

    /// Retrieve a run context by ID, verifying integrity.
    fn get(&self, id: RunId) -> Result<RunContext, StoreError>;

    /// Highest run ID present in the store, if any.
    fn latest_run_id(&self) -> Result<Option<RunId>, StoreError>;

    /// The stored report of a run. `NotFound` if the run has no report artifact.
    fn get_report(&self, id: RunId) -> Result<SystemReport, StoreError> {
        let context = self.get(id)?;
        match context.artifact::<SystemReport>(artifact::REPORT) {
            Some(report) => Ok(report?),
            None => Err(StoreError::NotFound(id)),
        }
    }
}

/// File-system backed run store.
///
/// Stores each run in its own directory:
/// ```text
/// {root}/
///   run_001/
///     context.json
///     report.json
///   run_002/
///     context.json
/// ```
///
/// `report.json` is written only for runs that produced a report, for
/// consumption by report and diagram renderers.
pub struct FileRunStore {
    root: PathBuf,
}

impl FileRunStore {
    /// Create a new store rooted at the given directory.
    /// Creates the directory if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the artifacts of one run.
    pub fn run_dir(&self, id: RunId) -> PathBuf {
        self.root.join(format!("run_{id}"))
    }

    fn context_path(&self, id: RunId) -> PathBuf {
        self.run_dir(id).join("context.json")
    }
}

impl RunStore for FileRunStore {
    fn save(&self, context: &RunContext) -> Result<(), StoreError> {
        if context.content_hash.is_none() {
            return Err(StoreError::NotFinalized);
        }

        let dir = self.run_dir(context.run_id);
        fs::create_dir_all(&dir)?;

        let path = self.context_path(context.run_id);
        let json = serde_json::to_string_pretty(context)?;
        fs::write(&path, json)?;

        if let Some(report) = context.artifacts.get(artifact::REPORT) {
            fs::write(dir.join("report.json"), serde_json::to_string_pretty(report)?)?;
        }

        tracing::debug!(
            run_id = %context.run_id,
            path = %path.display(),
            "Run context saved"
        );

        Ok(())
    }

    fn get(&self, id: RunId) -> Result<RunContext, StoreError> {
        let path = self.context_path(id);
        if !path.is_file() {
            return Err(StoreError::NotFound(id));
        }

        let json = fs::read_to_string(&path)?;
        let context: RunContext = serde_json::from_str(&json)?;

        if !context.verify_integrity() {
            return Err(StoreError::IntegrityViolation(id));
        }

        Ok(context)
    }

    fn latest_run_id(&self) -> Result<Option<RunId>, StoreError> {
        let mut latest: Option<RunId> = None;

        for entry in fs::read_dir(&self.root)?.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !name.starts_with("run_") {
                continue;
            }
            if let Ok(id) = name.parse::<RunId>() {
                latest = latest.max(Some(id));
            }
        }

        Ok(latest)
    }
}

/// In-memory run store, for tests and embedded use.
#[derive(Default)]
pub struct MemoryRunStore {
    runs: RwLock<BTreeMap<RunId, RunContext>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.runs.read().map(|runs| runs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RunStore for MemoryRunStore {
    fn save(&self, context: &RunContext) -> Result<(), StoreError> {
        if context.content_hash.is_none() {
            return Err(StoreError::NotFinalized);
        }
        let mut runs = self.runs.write().map_err(|_| StoreError::Poisoned)?;
        runs.insert(context.run_id, context.clone());
        Ok(())
    }

    fn get(&self, id: RunId) -> Result<RunContext, StoreError> {
        let runs = self.runs.read().map_err(|_| StoreError::Poisoned)?;
        let context = runs.get(&id).cloned().ok_or(StoreError::NotFound(id))?;
        if !context.verify_integrity() {
            return Err(StoreError::IntegrityViolation(id));
        }
        Ok(context)
    }

    fn latest_run_id(&self) -> Result<Option<RunId>, StoreError> {
        let runs = self.runs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(runs.keys().next_back().copied())
    }
}
