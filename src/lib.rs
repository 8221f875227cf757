//! Resilient resolution, caching, and health monitoring for stored media URLs.
//!
//! The [`application::service::MediaService`] facade is the entry point; the
//! `mediaward` binary wraps it in a small command-line tool.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
