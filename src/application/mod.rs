//! Resolution, probing, monitoring, and fallback services.

pub mod candidates;
pub mod error;
pub mod fallback;
pub mod monitor;
pub mod probe;
pub mod resolver;
pub mod service;
pub mod store;
