//! Infrastructure adapters and runtime bootstrap.

pub mod bootstrap;
pub mod error;
pub mod probe;
pub mod storage;
pub mod telemetry;
