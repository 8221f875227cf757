//! Domain layer types and invariants.

pub mod error;
pub mod health;
pub mod storage;

pub use mediaward_types::{
    EntryMetadata, FailureKind, HealthSnapshot, HealthStats, HealthStatus, PreloadSummary,
    ResolutionResult, ResolutionSource, StrategyKind,
};
