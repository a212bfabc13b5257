//! Auxiliary result types for analysis runs.

use serde::{Deserialize, Serialize};

/// Statistics about a loaded architecture.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchitectureStats {
    pub total_components: usize,
    pub total_dependencies: usize,
    pub public_count: usize,
    pub external_api_count: usize,
}
