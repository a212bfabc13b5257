//! BLAKE3 content hashing for tamper evidence.
//!
//! Computes a deterministic hash of all run context fields (excluding the
//! content_hash itself) so that any modification of a persisted run is
//! detectable.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use faultline_core::Event;
use serde::Serialize;

use crate::{RunContext, RunId, RunState};

/// Hashable representation of a RunContext (excludes content_hash).
#[derive(Serialize)]
struct HashableContext<'a> {
    run_id: &'a RunId,
    state: &'a RunState,
    events: &'a [Event],
    artifacts: &'a BTreeMap<String, serde_json::Value>,
    started_at: &'a DateTime<Utc>,
    completed_at: &'a Option<DateTime<Utc>>,
}

/// Compute the BLAKE3 hash of a run context's content.
///
/// Serializes all fields except `content_hash` to canonical JSON,
/// then hashes the bytes with BLAKE3. Returns the hex-encoded hash.
pub fn compute_context_hash(context: &RunContext) -> String {
    let hashable = HashableContext {
        run_id: &context.run_id,
        state: &context.state,
        events: &context.events,
        artifacts: &context.artifacts,
        started_at: &context.started_at,
        completed_at: &context.completed_at,
    };

    let mut hasher = blake3::Hasher::new();
    // The hasher itself never fails a write.
    if let Err(e) = serde_json::to_writer(&mut hasher, &hashable) {
        tracing::error!(run_id = %context.run_id, error = %e, "Run context not serializable for hashing");
    }
    hasher.finalize().to_hex().to_string()
}
