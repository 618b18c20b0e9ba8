use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::workflows::assessments::domain::{
    AssessmentResponse, AssessmentSession, AssessmentTemplate, QuestionId, SessionId, SessionKey,
    SessionStatus, TemplateId,
};
use crate::workflows::assessments::repository::{AssessmentStore, OpenSession};
use crate::workflows::pipeline::domain::{
    Application, ApplicationId, ApplicationStatus, AssessmentRecord, Person, PersonId, Stage,
};
use crate::workflows::pipeline::repository::{PipelineStore, StageChange};

use super::StoreError;

/// Reference store backing the server and tests. Every multi-row operation
/// runs under a single lock, which is what makes `open_session`,
/// `advance_stage_batch`, and `record_assessment` atomic.
#[derive(Default)]
pub struct InMemoryStore {
    templates: Mutex<HashMap<TemplateId, AssessmentTemplate>>,
    sessions: Mutex<HashMap<SessionId, AssessmentSession>>,
    responses: Mutex<HashMap<(SessionId, QuestionId), AssessmentResponse>>,
    persons: Mutex<HashMap<PersonId, Person>>,
    applications: Mutex<HashMap<ApplicationId, Application>>,
    assessments: Mutex<HashMap<String, AssessmentRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All history records, ordered by completion time. Test/demo helper.
    pub fn assessment_history(&self) -> Vec<AssessmentRecord> {
        let guard = self
            .assessments
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut records: Vec<_> = guard.values().cloned().collect();
        records.sort_by_key(|record| record.completed_at);
        records
    }
}

fn locked<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable(format!("{what} lock poisoned")))
}

impl AssessmentStore for InMemoryStore {
    fn template(&self, id: &TemplateId) -> Result<Option<AssessmentTemplate>, StoreError> {
        let guard = locked(&self.templates, "template")?;
        Ok(guard.get(id).cloned())
    }

    fn put_template(&self, template: AssessmentTemplate) -> Result<(), StoreError> {
        let mut guard = locked(&self.templates, "template")?;
        guard.insert(template.id.clone(), template);
        Ok(())
    }

    fn open_session(
        &self,
        key: &SessionKey,
        candidate: AssessmentSession,
    ) -> Result<OpenSession, StoreError> {
        let mut guard = locked(&self.sessions, "session")?;

        if let Some(existing) = guard
            .values()
            .find(|session| session.status == SessionStatus::Completed && &session.key() == key)
        {
            return Ok(OpenSession::Completed(existing.clone()));
        }

        if let Some(existing) = guard
            .values()
            .find(|session| session.status == SessionStatus::InProgress && &session.key() == key)
        {
            return Ok(OpenSession::InProgress(existing.clone()));
        }

        guard.insert(candidate.id.clone(), candidate.clone());
        Ok(OpenSession::Created(candidate))
    }

    fn session(&self, id: &SessionId) -> Result<Option<AssessmentSession>, StoreError> {
        let guard = locked(&self.sessions, "session")?;
        Ok(guard.get(id).cloned())
    }

    fn update_session(&self, session: AssessmentSession) -> Result<(), StoreError> {
        let mut guard = locked(&self.sessions, "session")?;
        if !guard.contains_key(&session.id) {
            return Err(StoreError::NotFound);
        }
        guard.insert(session.id.clone(), session);
        Ok(())
    }

    fn upsert_response(&self, response: AssessmentResponse) -> Result<(), StoreError> {
        let mut guard = locked(&self.responses, "response")?;
        let key = (response.session_id.clone(), response.question_id.clone());
        guard.insert(key, response);
        Ok(())
    }

    fn responses(&self, session_id: &SessionId) -> Result<Vec<AssessmentResponse>, StoreError> {
        let guard = locked(&self.responses, "response")?;
        let mut rows: Vec<_> = guard
            .values()
            .filter(|response| &response.session_id == session_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.question_id.0.cmp(&b.question_id.0));
        Ok(rows)
    }

    fn expire_sessions_started_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut guard = locked(&self.sessions, "session")?;
        let mut affected = 0;
        for session in guard.values_mut() {
            if session.status == SessionStatus::InProgress && session.started_at < cutoff {
                session.status = SessionStatus::Expired;
                affected += 1;
            }
        }
        Ok(affected)
    }
}

impl PipelineStore for InMemoryStore {
    fn person(&self, id: &PersonId) -> Result<Option<Person>, StoreError> {
        let guard = locked(&self.persons, "person")?;
        Ok(guard.get(id).cloned())
    }

    fn person_by_email(&self, email: &str) -> Result<Option<Person>, StoreError> {
        let guard = locked(&self.persons, "person")?;
        Ok(guard
            .values()
            .find(|person| person.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn find_or_create_person(&self, candidate: Person) -> Result<Person, StoreError> {
        let mut guard = locked(&self.persons, "person")?;
        if let Some(existing) = guard
            .values()
            .find(|person| person.email.eq_ignore_ascii_case(&candidate.email))
        {
            return Ok(existing.clone());
        }
        guard.insert(candidate.id.clone(), candidate.clone());
        Ok(candidate)
    }

    fn update_person(&self, person: Person) -> Result<(), StoreError> {
        let mut guard = locked(&self.persons, "person")?;
        if !guard.contains_key(&person.id) {
            return Err(StoreError::NotFound);
        }
        guard.insert(person.id.clone(), person);
        Ok(())
    }

    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        let guard = locked(&self.applications, "application")?;
        Ok(guard.get(id).cloned())
    }

    fn application_by_submission(
        &self,
        submission_id: &str,
    ) -> Result<Option<Application>, StoreError> {
        let guard = locked(&self.applications, "application")?;
        Ok(guard
            .values()
            .find(|application| application.submission_id.as_deref() == Some(submission_id))
            .cloned())
    }

    fn applications_for_person(
        &self,
        person_id: &PersonId,
    ) -> Result<Vec<Application>, StoreError> {
        let guard = locked(&self.applications, "application")?;
        let mut rows: Vec<_> = guard
            .values()
            .filter(|application| &application.person_id == person_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(rows)
    }

    fn insert_application(&self, application: Application) -> Result<Application, StoreError> {
        let mut guard = locked(&self.applications, "application")?;
        if guard.contains_key(&application.id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn update_application(&self, application: Application) -> Result<(), StoreError> {
        let mut guard = locked(&self.applications, "application")?;
        if !guard.contains_key(&application.id) {
            return Err(StoreError::NotFound);
        }
        guard.insert(application.id.clone(), application);
        Ok(())
    }

    fn advance_stage_batch(
        &self,
        person_id: &PersonId,
        from_stages: &[Stage],
        target: Stage,
    ) -> Result<Vec<StageChange>, StoreError> {
        let mut guard = locked(&self.applications, "application")?;
        let now = Utc::now();
        let mut changed = Vec::new();
        for application in guard.values_mut() {
            if &application.person_id != person_id {
                continue;
            }
            if application.status != ApplicationStatus::Active {
                continue;
            }
            if !from_stages.contains(&application.current_stage) {
                continue;
            }
            if application.current_stage.order() >= target.order() {
                continue;
            }
            let from = application.current_stage;
            application.current_stage = target;
            application.updated_at = now;
            changed.push(StageChange {
                application: application.clone(),
                from,
            });
        }
        changed.sort_by(|a, b| a.application.id.0.cmp(&b.application.id.0));
        Ok(changed)
    }

    fn record_assessment(&self, record: AssessmentRecord) -> Result<bool, StoreError> {
        let mut guard = locked(&self.assessments, "assessment")?;
        if guard.contains_key(&record.completion_key) {
            return Ok(false);
        }
        guard.insert(record.completion_key.clone(), record);
        Ok(true)
    }

    fn assessment_by_completion_key(
        &self,
        completion_key: &str,
    ) -> Result<Option<AssessmentRecord>, StoreError> {
        let guard = locked(&self.assessments, "assessment")?;
        Ok(guard.get(completion_key).cloned())
    }
}
