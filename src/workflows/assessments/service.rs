use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::StoreError;
use crate::workflows::audit::{record_best_effort, AuditEntry, AuditSink};
use crate::workflows::pipeline::domain::{ApplicationId, PersonId};
use crate::workflows::pipeline::engine::{EngineError, PipelineEngine};
use crate::workflows::pipeline::repository::{NotificationSender, PipelineStore};

use super::domain::{
    Answer, AssessmentKind, AssessmentResponse, AssessmentSession, AssessmentTemplate, QuestionId,
    SessionId, SessionStatus, SubmissionOutcome, TemplateId,
};
use super::normalize::ScoringConfig;
use super::repository::{AssessmentStore, OpenSession};
use super::scoring::score_answer;

/// Sessions untouched for this long are swept to `Expired`.
const STALE_SESSION_HOURS: i64 = 24;

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("sess-{id:06}"))
}

/// Error raised by the session lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentError {
    #[error("assessment template not found")]
    TemplateNotFound,
    #[error("assessment template is inactive")]
    TemplateInactive,
    #[error("assessment already completed for this candidate")]
    AlreadyCompleted,
    #[error("specialized assessments require an application")]
    ApplicationRequired,
    #[error("assessment session not found")]
    SessionNotFound,
    #[error("assessment session is not in progress")]
    SessionNotActive,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Pipeline(#[from] EngineError),
}

/// One answered question in a submission payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    pub answer: Answer,
}

/// Owns the session state machine and drives scoring, normalization, and
/// the pipeline engine on submission.
pub struct AssessmentService<S, P, A, N>
where
    A: AuditSink + ?Sized,
    N: NotificationSender + ?Sized,
{
    store: Arc<S>,
    engine: Arc<PipelineEngine<P, A, N>>,
    audit: Arc<A>,
    scoring: ScoringConfig,
}

impl<S, P, A, N> AssessmentService<S, P, A, N>
where
    S: AssessmentStore + 'static,
    P: PipelineStore + 'static,
    A: AuditSink + ?Sized + 'static,
    N: NotificationSender + ?Sized + 'static,
{
    pub fn new(
        store: Arc<S>,
        engine: Arc<PipelineEngine<P, A, N>>,
        audit: Arc<A>,
        scoring: ScoringConfig,
    ) -> Self {
        Self {
            store,
            engine,
            audit,
            scoring,
        }
    }

    /// Start a session, or return the candidate's in-progress one
    /// unchanged. At most one non-terminal session exists per
    /// (template, person, application) tuple; the store enforces that with
    /// an atomic find-or-create, not a read-then-write.
    pub fn start(
        &self,
        template_id: &TemplateId,
        person_id: &PersonId,
        application_id: Option<ApplicationId>,
    ) -> Result<AssessmentSession, AssessmentError> {
        let template = self
            .store
            .template(template_id)?
            .ok_or(AssessmentError::TemplateNotFound)?;
        if !template.is_active {
            return Err(AssessmentError::TemplateInactive);
        }
        if template.kind == AssessmentKind::SpecializedCompetencies && application_id.is_none() {
            return Err(AssessmentError::ApplicationRequired);
        }

        let now = Utc::now();
        let candidate = AssessmentSession {
            id: next_session_id(),
            template_id: template_id.clone(),
            person_id: person_id.clone(),
            application_id,
            status: SessionStatus::InProgress,
            started_at: now,
            expires_at: template
                .time_limit_minutes
                .map(|minutes| now + Duration::minutes(i64::from(minutes))),
            completed_at: None,
            score: None,
            passed: None,
        };
        let key = candidate.key();

        match self.store.open_session(&key, candidate)? {
            OpenSession::Completed(_) => Err(AssessmentError::AlreadyCompleted),
            OpenSession::InProgress(existing) => Ok(existing),
            OpenSession::Created(session) => {
                record_best_effort(
                    self.audit.as_ref(),
                    AuditEntry::new("assessment_started", format!("session/{}", session.id.0))
                        .detail("template", template_id.0.clone())
                        .detail("person", person_id.0.clone()),
                );
                Ok(session)
            }
        }
    }

    /// Autosave one answer. Upserts by (session, question): last write
    /// wins and re-stamps `answered_at`. Never scores.
    pub fn save_response(
        &self,
        session_id: &SessionId,
        question_id: &QuestionId,
        answer: Answer,
    ) -> Result<AssessmentResponse, AssessmentError> {
        let session = self.in_progress_session(session_id)?;

        let response = AssessmentResponse {
            session_id: session.id,
            question_id: question_id.clone(),
            answer,
            score: None,
            answered_at: Utc::now(),
        };
        self.store.upsert_response(response.clone())?;
        Ok(response)
    }

    /// Submit and score a session. Responses are persisted, scored, and
    /// summed; the raw total is normalized onto the scale implied by the
    /// template kind; the session transitions to `Completed`; then the
    /// pipeline engine reacts. Once the session row says `Completed` that
    /// state is final — a failed engine step is retried via
    /// `replay_completion`, never rolled back.
    pub fn submit(
        &self,
        session_id: &SessionId,
        answers: Vec<SubmittedAnswer>,
    ) -> Result<SubmissionOutcome, AssessmentError> {
        let mut session = self.in_progress_session(session_id)?;
        let template = self
            .store
            .template(&session.template_id)?
            .ok_or(AssessmentError::TemplateNotFound)?;
        if template.kind == AssessmentKind::SpecializedCompetencies
            && session.application_id.is_none()
        {
            return Err(AssessmentError::ApplicationRequired);
        }

        let now = Utc::now();
        for submitted in answers {
            self.store.upsert_response(AssessmentResponse {
                session_id: session.id.clone(),
                question_id: submitted.question_id,
                answer: submitted.answer,
                score: None,
                answered_at: now,
            })?;
        }

        // Score everything persisted for the session, including earlier
        // autosaves the final payload did not repeat.
        let mut raw_score = 0u32;
        for mut response in self.store.responses(&session.id)? {
            let score = template
                .question(&response.question_id)
                .map(|question| score_answer(question, &response.answer))
                .unwrap_or(0);
            raw_score += score;
            response.score = Some(score);
            self.store.upsert_response(response)?;
        }

        let max_score = template.max_score();
        let normalized = self
            .scoring
            .normalize_for(raw_score, max_score, template.kind);
        let passed = self.scoring.passed(normalized, template.kind);
        let threshold = self.scoring.threshold(template.kind);

        session.status = SessionStatus::Completed;
        session.completed_at = Some(now);
        session.score = Some(raw_score);
        session.passed = Some(passed);
        self.store.update_session(session.clone())?;

        record_best_effort(
            self.audit.as_ref(),
            AuditEntry::new("assessment_completed", format!("session/{}", session.id.0))
                .detail("raw_score", raw_score.to_string())
                .detail("normalized_score", normalized.to_string())
                .detail("threshold", threshold.to_string())
                .detail("outcome", if passed { "passed" } else { "failed" }),
        );

        self.invoke_engine(&session, &template, normalized, passed, threshold)?;

        let percentage = if max_score == 0 {
            0.0
        } else {
            f64::from(raw_score) / f64::from(max_score) * 100.0
        };

        Ok(SubmissionOutcome {
            session_id: session.id,
            raw_score,
            max_score,
            percentage,
            normalized_score: normalized,
            passed,
            threshold,
            completed_at: now,
        })
    }

    /// Re-invoke the pipeline engine for an already-completed session.
    /// Recovery path when the engine step failed after the session row was
    /// persisted; the handlers are idempotent so this is safe to repeat.
    pub fn replay_completion(&self, session_id: &SessionId) -> Result<(), AssessmentError> {
        let session = self
            .store
            .session(session_id)?
            .ok_or(AssessmentError::SessionNotFound)?;
        if session.status != SessionStatus::Completed {
            return Err(AssessmentError::SessionNotActive);
        }
        let template = self
            .store
            .template(&session.template_id)?
            .ok_or(AssessmentError::TemplateNotFound)?;

        let raw_score = session.score.unwrap_or(0);
        let normalized =
            self.scoring
                .normalize_for(raw_score, template.max_score(), template.kind);
        let passed = session
            .passed
            .unwrap_or_else(|| self.scoring.passed(normalized, template.kind));
        let threshold = self.scoring.threshold(template.kind);

        self.invoke_engine(&session, &template, normalized, passed, threshold)
    }

    /// Sweep in-progress sessions older than the staleness window. The
    /// store predicate excludes non-in-progress rows, so concurrent or
    /// repeated runs expire each session exactly once.
    pub fn expire_stale(&self) -> Result<usize, AssessmentError> {
        let cutoff = Utc::now() - Duration::hours(STALE_SESSION_HOURS);
        let affected = self.store.expire_sessions_started_before(cutoff)?;
        if affected > 0 {
            info!(affected, "expired stale assessment sessions");
        }
        Ok(affected)
    }

    /// Force an in-progress session to `Abandoned` (explicit withdrawal).
    pub fn abandon(&self, session_id: &SessionId) -> Result<AssessmentSession, AssessmentError> {
        let mut session = self.in_progress_session(session_id)?;
        session.status = SessionStatus::Abandoned;
        self.store.update_session(session.clone())?;

        record_best_effort(
            self.audit.as_ref(),
            AuditEntry::new("assessment_abandoned", format!("session/{}", session.id.0)),
        );
        Ok(session)
    }

    pub fn session(&self, session_id: &SessionId) -> Result<AssessmentSession, AssessmentError> {
        self.store
            .session(session_id)?
            .ok_or(AssessmentError::SessionNotFound)
    }

    fn in_progress_session(
        &self,
        session_id: &SessionId,
    ) -> Result<AssessmentSession, AssessmentError> {
        let session = self
            .store
            .session(session_id)?
            .ok_or(AssessmentError::SessionNotFound)?;
        if session.status != SessionStatus::InProgress {
            return Err(AssessmentError::SessionNotActive);
        }
        Ok(session)
    }

    fn invoke_engine(
        &self,
        session: &AssessmentSession,
        template: &AssessmentTemplate,
        normalized: u32,
        passed: bool,
        threshold: u32,
    ) -> Result<(), AssessmentError> {
        match template.kind {
            AssessmentKind::GeneralCompetencies => {
                self.engine.on_general_completed(
                    &session.person_id,
                    normalized,
                    passed,
                    threshold,
                    &session.id.0,
                )?;
            }
            AssessmentKind::SpecializedCompetencies => {
                let application_id = session
                    .application_id
                    .as_ref()
                    .ok_or(AssessmentError::ApplicationRequired)?;
                self.engine.on_specialized_completed(
                    application_id,
                    &session.person_id,
                    normalized,
                    passed,
                    threshold,
                    &template.id,
                    &session.id.0,
                )?;
            }
        }
        Ok(())
    }
}
