use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::store::StoreError;
use crate::workflows::assessments::domain::{AssessmentKind, TemplateId};
use crate::workflows::audit::{record_best_effort, AuditEntry, AuditSink};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, AssessmentRecord, PersonId, Stage,
};
use super::repository::{Notification, NotificationSender, PipelineStore, StageChange};

static RECORD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_record_id() -> String {
    let id = RECORD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("asmt-{id:06}")
}

/// Error raised by the stage engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("person not found")]
    PersonNotFound,
    #[error("application not found")]
    ApplicationNotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a general-competencies completion.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralCompletion {
    pub person_id: PersonId,
    pub normalized_score: u32,
    pub passed: bool,
    /// Applications moved to the specialized stage by this invocation.
    pub advanced: Vec<StageChange>,
    /// False when the history row for this completion key already existed.
    pub recorded: bool,
}

/// Outcome of a specialized-competencies completion.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecializedCompletion {
    pub application_id: ApplicationId,
    pub normalized_score: u32,
    pub passed: bool,
    pub advanced: bool,
    pub recorded: bool,
}

/// Owns the application stage machine. Both completion handlers are
/// idempotent: stage moves are guarded by `can_advance` and history rows by
/// the store's keyed append, so retried invocations are benign.
pub struct PipelineEngine<S, A: ?Sized, N: ?Sized> {
    store: Arc<S>,
    audit: Arc<A>,
    notifier: Arc<N>,
}

/// `target` must be strictly downstream and the record still active.
pub fn can_advance(application: &Application, target: Stage) -> bool {
    application.status == ApplicationStatus::Active
        && target.order() > application.current_stage.order()
}

impl<S, A, N> PipelineEngine<S, A, N>
where
    S: PipelineStore + 'static,
    A: AuditSink + ?Sized + 'static,
    N: NotificationSender + ?Sized + 'static,
{
    pub fn new(store: Arc<S>, audit: Arc<A>, notifier: Arc<N>) -> Self {
        Self {
            store,
            audit,
            notifier,
        }
    }

    /// React to a completed general-competencies assessment: overwrite the
    /// person's results and, on a pass, advance every active application
    /// still waiting on the general stage in one atomic batch.
    pub fn on_general_completed(
        &self,
        person_id: &PersonId,
        normalized_score: u32,
        passed: bool,
        threshold: u32,
        completion_key: &str,
    ) -> Result<GeneralCompletion, EngineError> {
        let mut person = self
            .store
            .person(person_id)?
            .ok_or(EngineError::PersonNotFound)?;

        let now = Utc::now();
        person.general_completed = true;
        person.general_score = Some(normalized_score);
        person.general_passed_at = if passed { Some(now) } else { None };
        self.store.update_person(person)?;

        let advanced = if passed {
            let changed = self.store.advance_stage_batch(
                person_id,
                &[Stage::Application, Stage::GeneralCompetencies],
                Stage::SpecializedCompetencies,
            )?;
            for change in &changed {
                record_best_effort(
                    self.audit.as_ref(),
                    AuditEntry::new(
                        "stage_changed",
                        format!("application/{}", change.application.id.0),
                    )
                    .detail("from", change.from.label())
                    .detail("to", Stage::SpecializedCompetencies.label())
                    .detail("score", normalized_score.to_string())
                    .actor("pipeline-engine"),
                );
            }
            changed
        } else {
            Vec::new()
        };

        let recorded = self.store.record_assessment(AssessmentRecord {
            id: next_record_id(),
            kind: AssessmentKind::GeneralCompetencies,
            person_id: Some(person_id.clone()),
            application_id: None,
            template_id: None,
            score: normalized_score,
            passed,
            threshold,
            completed_at: now,
            completion_key: completion_key.to_string(),
        })?;
        if !recorded {
            info!(person = %person_id.0, %completion_key, "general completion replayed");
        }

        info!(
            person = %person_id.0,
            score = normalized_score,
            passed,
            advanced = advanced.len(),
            "general competencies completed"
        );

        Ok(GeneralCompletion {
            person_id: person_id.clone(),
            normalized_score,
            passed,
            advanced,
            recorded,
        })
    }

    /// React to a completed specialized-competencies assessment scoped to
    /// one application. A failed result records history and stops; any
    /// rejection is the caller's explicit decision.
    #[allow(clippy::too_many_arguments)]
    pub fn on_specialized_completed(
        &self,
        application_id: &ApplicationId,
        person_id: &PersonId,
        normalized_score: u32,
        passed: bool,
        threshold: u32,
        template_id: &TemplateId,
        completion_key: &str,
    ) -> Result<SpecializedCompletion, EngineError> {
        let mut application = self
            .store
            .application(application_id)?
            .ok_or(EngineError::ApplicationNotFound)?;

        let now = Utc::now();
        let recorded = self.store.record_assessment(AssessmentRecord {
            id: next_record_id(),
            kind: AssessmentKind::SpecializedCompetencies,
            person_id: Some(person_id.clone()),
            application_id: Some(application_id.clone()),
            template_id: Some(template_id.clone()),
            score: normalized_score,
            passed,
            threshold,
            completed_at: now,
            completion_key: completion_key.to_string(),
        })?;
        if !recorded {
            info!(application = %application_id.0, %completion_key, "specialized completion replayed");
        }

        let mut advanced = false;
        if passed && can_advance(&application, Stage::Interview) {
            let from = application.current_stage;
            application.current_stage = Stage::Interview;
            application.updated_at = now;
            self.store.update_application(application.clone())?;
            advanced = true;

            record_best_effort(
                self.audit.as_ref(),
                AuditEntry::new("stage_changed", format!("application/{}", application_id.0))
                    .detail("from", from.label())
                    .detail("to", Stage::Interview.label())
                    .detail("score", normalized_score.to_string())
                    .actor("pipeline-engine"),
            );

            let mut details = BTreeMap::new();
            details.insert("score".to_string(), normalized_score.to_string());
            details.insert("position".to_string(), application.position.clone());
            if let Err(err) = self.notifier.send(Notification {
                template: "interview_invitation".to_string(),
                application_id: application_id.clone(),
                details,
            }) {
                warn!(application = %application_id.0, error = %err, "interview invitation failed");
            }
        }

        info!(
            application = %application_id.0,
            score = normalized_score,
            passed,
            advanced,
            "specialized competencies completed"
        );

        Ok(SpecializedCompletion {
            application_id: application_id.clone(),
            normalized_score,
            passed,
            advanced,
            recorded,
        })
    }
}
