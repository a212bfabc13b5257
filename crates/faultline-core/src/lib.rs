//! faultline-core: Shared types, events, configuration, and error handling for Faultline.
//!
//! This crate provides the foundational types used across all Faultline components:
//! - Architecture definitions and validated components
//! - Failure scenarios, security risks, and remediation suggestions
//! - The terminal `SystemReport` consumed by renderers
//! - Run event types
//! - Layered configuration loading

pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use error::FaultlineError;
pub use events::{Event, EventLevel, Stage};
pub use types::{
    ArchitectureDefinition, Component, ComponentDefinition, Criticality, FailureScenario,
    Priority, Provenance, RemediationSuggestion, ResilienceMetrics, RiskSeverity, RiskType,
    SecurityRisk, SuggestionCategory, SystemReport, SYSTEM_TARGET,
};
