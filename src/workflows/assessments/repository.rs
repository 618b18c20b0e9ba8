use chrono::{DateTime, Utc};

use crate::store::StoreError;

use super::domain::{
    AssessmentResponse, AssessmentSession, AssessmentTemplate, SessionId, SessionKey, TemplateId,
};

/// Result of the atomic find-or-create used by `start`. The store decides
/// under one critical section whether the identity tuple already owns a
/// session, so two racing starts can never both create one.
#[derive(Debug, Clone, PartialEq)]
pub enum OpenSession {
    Created(AssessmentSession),
    /// An in-progress session already exists; returned unchanged.
    InProgress(AssessmentSession),
    /// A completed session already exists for the tuple.
    Completed(AssessmentSession),
}

/// Storage abstraction for templates, sessions, and responses.
pub trait AssessmentStore: Send + Sync {
    fn template(&self, id: &TemplateId) -> Result<Option<AssessmentTemplate>, StoreError>;

    fn put_template(&self, template: AssessmentTemplate) -> Result<(), StoreError>;

    /// Atomic check-and-set on the session identity tuple: returns the
    /// existing terminal/in-progress session or inserts `candidate`.
    fn open_session(
        &self,
        key: &SessionKey,
        candidate: AssessmentSession,
    ) -> Result<OpenSession, StoreError>;

    fn session(&self, id: &SessionId) -> Result<Option<AssessmentSession>, StoreError>;

    fn update_session(&self, session: AssessmentSession) -> Result<(), StoreError>;

    /// Insert-or-update keyed by (session, question); last write wins.
    fn upsert_response(&self, response: AssessmentResponse) -> Result<(), StoreError>;

    fn responses(&self, session_id: &SessionId) -> Result<Vec<AssessmentResponse>, StoreError>;

    /// Batch-expire in-progress sessions started before `cutoff`; rows in
    /// any other state are excluded by the predicate. Returns the count.
    fn expire_sessions_started_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;
}
