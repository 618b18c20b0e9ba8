//! Candidate application records and the pipeline stage engine.

pub mod domain;
pub mod engine;
pub mod repository;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationId, ApplicationStatus, AssessmentRecord, Person, PersonId, Stage,
};
pub use engine::{
    can_advance, EngineError, GeneralCompletion, PipelineEngine, SpecializedCompletion,
};
pub use repository::{
    Notification, NotificationError, NotificationSender, PipelineStore, StageChange,
    TracingNotifier,
};
