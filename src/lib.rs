//! Assessment scoring and hiring pipeline orchestration service.

pub mod config;
pub mod error;
pub mod store;
pub mod telemetry;
pub mod workflows;
