//! Assessment templates, session lifecycle, and scoring.
//!
//! The scorer and normalizer are pure; the service owns the session state
//! machine and hands completed results to the pipeline stage engine.

pub mod domain;
pub mod normalize;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Answer, AssessmentKind, AssessmentResponse, AssessmentSession, AssessmentTemplate,
    ChoiceOption, Question, QuestionConfig, QuestionId, SessionId, SessionKey, SessionStatus,
    SubmissionOutcome, TemplateId,
};
pub use normalize::{normalize, ScoringConfig};
pub use repository::{AssessmentStore, OpenSession};
pub use router::{assessment_router, SessionView};
pub use scoring::score_answer;
pub use service::{AssessmentError, AssessmentService, SubmittedAnswer};
