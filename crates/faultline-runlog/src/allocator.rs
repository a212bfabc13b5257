//! Run-ID allocation.
//!
//! The allocator is the only state shared between concurrent runs. IDs are
//! handed out from a single atomic counter, never derived from wall-clock
//! time, and never recycled when a run fails.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::store::{RunStore, StoreError};
use crate::RunId;

/// Hands out strictly increasing run IDs.
#[derive(Debug, Default)]
pub struct RunIdAllocator {
    last: AtomicU64,
}

impl RunIdAllocator {
    /// An allocator whose first ID is `last_issued + 1`.
    pub fn starting_after(last_issued: u64) -> Self {
        Self {
            last: AtomicU64::new(last_issued),
        }
    }

    /// Seed from the highest run already persisted so IDs survive restarts.
    pub fn from_store(store: &dyn RunStore) -> Result<Self, StoreError> {
        let last = store.latest_run_id()?.map(|id| id.0).unwrap_or(0);
        Ok(Self::starting_after(last))
    }

    /// Allocate the next run ID.
    pub fn next_id(&self) -> RunId {
        RunId(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// The most recently issued ID, if any.
    pub fn last_issued(&self) -> Option<RunId> {
        match self.last.load(Ordering::SeqCst) {
            0 => None,
            n => Some(RunId(n)),
        }
    }
}
