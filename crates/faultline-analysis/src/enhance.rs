//! Remediation enhancement capability.
//!
//! An enhancer proposes extra suggestions on top of the local plan. It is
//! strictly additive: the orchestrator merges whatever it returns through
//! [`crate::remediation::merge_external`] and ignores it on failure.

use async_trait::async_trait;
use faultline_core::{FailureScenario, RemediationSuggestion, ResilienceMetrics, SecurityRisk};

use crate::error::ExternalError;
use crate::model::Architecture;

/// What an enhancer gets to see.
#[derive(Debug, Clone, Copy)]
pub struct EnhancementRequest<'a> {
    pub architecture: &'a Architecture,
    pub scenarios: &'a [FailureScenario],
    pub risks: &'a [SecurityRisk],
    pub metrics: &'a ResilienceMetrics,
    /// The locally generated plan, so the enhancer can avoid repeating it.
    pub local: &'a [RemediationSuggestion],
}

#[async_trait]
pub trait RemediationEnhancer: Send + Sync {
    fn name(&self) -> &str;

    async fn enhance(
        &self,
        request: EnhancementRequest<'_>,
    ) -> Result<Vec<RemediationSuggestion>, ExternalError>;
}
