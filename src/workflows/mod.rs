//! Candidate-facing workflows: assessment scoring, pipeline stage
//! orchestration, and webhook ingestion.

pub mod assessments;
pub mod audit;
pub mod pipeline;
pub mod webhook;

#[cfg(test)]
pub(crate) mod testing;
