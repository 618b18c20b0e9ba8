use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::store::StoreError;

use super::domain::{
    Application, ApplicationId, AssessmentRecord, Person, PersonId, Stage,
};

/// Storage abstraction for people, applications, and the assessment
/// history trail.
pub trait PipelineStore: Send + Sync {
    fn person(&self, id: &PersonId) -> Result<Option<Person>, StoreError>;

    fn person_by_email(&self, email: &str) -> Result<Option<Person>, StoreError>;

    /// Atomic check-and-insert keyed by email: an existing person is
    /// returned unchanged, otherwise `candidate` is stored.
    fn find_or_create_person(&self, candidate: Person) -> Result<Person, StoreError>;

    fn update_person(&self, person: Person) -> Result<(), StoreError>;

    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError>;

    fn application_by_submission(
        &self,
        submission_id: &str,
    ) -> Result<Option<Application>, StoreError>;

    fn applications_for_person(
        &self,
        person_id: &PersonId,
    ) -> Result<Vec<Application>, StoreError>;

    fn insert_application(&self, application: Application) -> Result<Application, StoreError>;

    fn update_application(&self, application: Application) -> Result<(), StoreError>;

    /// Atomically move every active application of `person_id` currently in
    /// one of `from_stages` to `target`, returning the rows that changed
    /// together with their origin stage. Issued as one store call so
    /// siblings can never be left half-advanced.
    fn advance_stage_batch(
        &self,
        person_id: &PersonId,
        from_stages: &[Stage],
        target: Stage,
    ) -> Result<Vec<StageChange>, StoreError>;

    /// Append an immutable history record unless one with the same
    /// completion key exists. Returns whether the row was newly written.
    fn record_assessment(&self, record: AssessmentRecord) -> Result<bool, StoreError>;

    fn assessment_by_completion_key(
        &self,
        completion_key: &str,
    ) -> Result<Option<AssessmentRecord>, StoreError>;
}

/// One row affected by a batch stage advancement.
#[derive(Debug, Clone, PartialEq)]
pub struct StageChange {
    pub application: Application,
    pub from: Stage,
}

/// Trait describing outbound notification hooks (e-mail adapters).
pub trait NotificationSender: Send + Sync {
    fn send(&self, notification: Notification) -> Result<(), NotificationError>;
}

/// Notification payload handed to the e-mail adapter; the engine decides
/// *that* a transition happened, the adapter decides how to word it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub template: String,
    pub application_id: ApplicationId,
    pub details: BTreeMap<String, String>,
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Default sender that logs instead of delivering e-mail; stands in until
/// a real transport is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationSender for TracingNotifier {
    fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        tracing::info!(
            template = %notification.template,
            application = %notification.application_id.0,
            details = ?notification.details,
            "notification"
        );
        Ok(())
    }
}
