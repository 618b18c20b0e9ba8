use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::store::StoreError;
use crate::workflows::assessments::domain::{AssessmentKind, TemplateId};
use crate::workflows::assessments::normalize::ScoringConfig;
use crate::workflows::audit::{record_best_effort, AuditEntry, AuditSink};
use crate::workflows::pipeline::domain::{
    Application, ApplicationId, ApplicationStatus, Person, PersonId, Stage,
};
use crate::workflows::pipeline::engine::{
    EngineError, GeneralCompletion, PipelineEngine, SpecializedCompletion,
};
use crate::workflows::pipeline::repository::{NotificationSender, PipelineStore};

use super::fields::{FieldResolver, PrefixFieldResolver};
use super::payload::WebhookEnvelope;

static PERSON_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_person_id() -> PersonId {
    let id = PERSON_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    PersonId(format!("person-{id:06}"))
}

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

/// Error raised while mapping or applying a webhook delivery.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("no person on file for '{0}'")]
    UnknownPerson(String),
    #[error("no application on file for '{0}'")]
    UnknownApplication(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Candidate identity extracted from a form submission.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonData {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

impl PersonData {
    fn extract<R: FieldResolver>(resolver: &R) -> Result<Self, WebhookError> {
        Ok(Self {
            email: resolver
                .text("email")
                .ok_or(WebhookError::MissingField("email"))?,
            first_name: resolver
                .text("firstName")
                .ok_or(WebhookError::MissingField("firstName"))?,
            last_name: resolver
                .text("lastName")
                .ok_or(WebhookError::MissingField("lastName"))?,
            phone: resolver.text("phone"),
        })
    }
}

/// Position details extracted from an application submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationData {
    pub position: String,
}

impl ApplicationData {
    fn extract<R: FieldResolver>(resolver: &R) -> Result<Self, WebhookError> {
        Ok(Self {
            position: resolver
                .text("position")
                .ok_or(WebhookError::MissingField("position"))?,
        })
    }
}

/// General-competencies result delivered by the form provider.
#[derive(Debug, Clone, PartialEq)]
pub struct GcAssessmentResult {
    pub email: String,
    pub raw_score: u32,
    pub max_score: u32,
}

impl GcAssessmentResult {
    fn extract<R: FieldResolver>(resolver: &R) -> Result<Self, WebhookError> {
        Ok(Self {
            email: resolver
                .text("email")
                .ok_or(WebhookError::MissingField("email"))?,
            raw_score: resolver
                .uint("score")
                .ok_or(WebhookError::MissingField("score"))?,
            max_score: resolver
                .uint("maxScore")
                .ok_or(WebhookError::MissingField("maxScore"))?,
        })
    }
}

/// Specialized-competencies result scoped to one application.
#[derive(Debug, Clone, PartialEq)]
pub struct ScAssessmentResult {
    pub application_id: ApplicationId,
    pub template_id: TemplateId,
    pub raw_score: u32,
    pub max_score: u32,
}

impl ScAssessmentResult {
    fn extract<R: FieldResolver>(resolver: &R) -> Result<Self, WebhookError> {
        Ok(Self {
            application_id: ApplicationId(
                resolver
                    .text("applicationId")
                    .ok_or(WebhookError::MissingField("applicationId"))?,
            ),
            template_id: TemplateId(
                resolver
                    .text("templateId")
                    .ok_or(WebhookError::MissingField("templateId"))?,
            ),
            raw_score: resolver
                .uint("score")
                .ok_or(WebhookError::MissingField("score"))?,
            max_score: resolver
                .uint("maxScore")
                .ok_or(WebhookError::MissingField("maxScore"))?,
        })
    }
}

/// How a fresh application was routed based on the person's general
/// competencies history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeRouting {
    AwaitingGeneral,
    AdvancedToSpecialized,
    RejectedGeneralFailure,
}

impl IntakeRouting {
    pub const fn label(self) -> &'static str {
        match self {
            IntakeRouting::AwaitingGeneral => "awaiting_general_competencies",
            IntakeRouting::AdvancedToSpecialized => "advanced_to_specialized_competencies",
            IntakeRouting::RejectedGeneralFailure => "rejected_prior_general_failure",
        }
    }
}

/// Result of an application-submission delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeOutcome {
    Created {
        person: Person,
        application: Application,
        routing: IntakeRouting,
    },
    /// The submission id was seen before; the prior record is returned
    /// without reprocessing.
    AlreadyProcessed(Application),
}

/// Result of a general-assessment delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneralWebhookOutcome {
    Processed {
        completion: GeneralCompletion,
        /// Applications rejected because the candidate failed.
        rejected: Vec<ApplicationId>,
    },
    AlreadyProcessed,
}

/// Result of a specialized-assessment delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecializedWebhookOutcome {
    Processed(SpecializedCompletion),
    AlreadyProcessed,
}

/// Validates, deduplicates, and maps provider deliveries into the same
/// completion events the session lifecycle produces. The submission-id
/// check here is the outermost idempotency guard; everything downstream
/// tolerates replays anyway.
pub struct WebhookAdapter<P, A, N>
where
    A: AuditSink + ?Sized,
    N: NotificationSender + ?Sized,
{
    store: Arc<P>,
    engine: Arc<PipelineEngine<P, A, N>>,
    audit: Arc<A>,
    scoring: ScoringConfig,
}

impl<P, A, N> WebhookAdapter<P, A, N>
where
    P: PipelineStore + 'static,
    A: AuditSink + ?Sized + 'static,
    N: NotificationSender + ?Sized + 'static,
{
    pub fn new(
        store: Arc<P>,
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

    /// A new candidate application arrived. Creates the person on first
    /// contact, files the application, and routes it on the person's
    /// general-competencies history.
    pub fn handle_application_submitted(
        &self,
        envelope: &WebhookEnvelope,
    ) -> Result<IntakeOutcome, WebhookError> {
        let submission_id = &envelope.data.submission_id;
        if let Some(existing) = self.store.application_by_submission(submission_id)? {
            info!(%submission_id, "duplicate application delivery ignored");
            return Ok(IntakeOutcome::AlreadyProcessed(existing));
        }

        let resolver = PrefixFieldResolver::new(&envelope.data.fields);
        let person_data = PersonData::extract(&resolver)?;
        let application_data = ApplicationData::extract(&resolver)?;

        let now = Utc::now();
        let person = self.store.find_or_create_person(Person {
            id: next_person_id(),
            email: person_data.email.clone(),
            first_name: person_data.first_name,
            last_name: person_data.last_name,
            phone: person_data.phone,
            general_completed: false,
            general_score: None,
            general_passed_at: None,
            created_at: now,
        })?;

        let mut application = self.store.insert_application(Application {
            id: next_application_id(),
            person_id: person.id.clone(),
            position: application_data.position,
            current_stage: Stage::Application,
            status: ApplicationStatus::Active,
            submission_id: Some(submission_id.clone()),
            created_at: now,
            updated_at: now,
        })?;

        let routing = if person.passed_general() {
            application.current_stage = Stage::SpecializedCompetencies;
            application.updated_at = now;
            self.store.update_application(application.clone())?;
            IntakeRouting::AdvancedToSpecialized
        } else if person.failed_general() {
            application.status = ApplicationStatus::Rejected;
            application.updated_at = now;
            self.store.update_application(application.clone())?;
            IntakeRouting::RejectedGeneralFailure
        } else {
            IntakeRouting::AwaitingGeneral
        };

        record_best_effort(
            self.audit.as_ref(),
            AuditEntry::new(
                "application_received",
                format!("application/{}", application.id.0),
            )
            .detail("submission", submission_id.clone())
            .detail("person", person.id.0.clone())
            .detail("routing", routing.label())
            .actor("webhook-adapter"),
        );

        Ok(IntakeOutcome::Created {
            person,
            application,
            routing,
        })
    }

    /// A general-competencies form was completed. On a pass the engine
    /// advances the person's pending applications; on a failure this flow
    /// rejects them outright instead of leaving them stuck.
    pub fn handle_general_assessment(
        &self,
        envelope: &WebhookEnvelope,
    ) -> Result<GeneralWebhookOutcome, WebhookError> {
        let submission_id = &envelope.data.submission_id;
        if self
            .store
            .assessment_by_completion_key(submission_id)?
            .is_some()
        {
            info!(%submission_id, "duplicate general-assessment delivery ignored");
            return Ok(GeneralWebhookOutcome::AlreadyProcessed);
        }

        let resolver = PrefixFieldResolver::new(&envelope.data.fields);
        let result = GcAssessmentResult::extract(&resolver)?;

        let person = self
            .store
            .person_by_email(&result.email)?
            .ok_or_else(|| WebhookError::UnknownPerson(result.email.clone()))?;

        let kind = AssessmentKind::GeneralCompetencies;
        let normalized = self
            .scoring
            .normalize_for(result.raw_score, result.max_score, kind);
        let passed = self.scoring.passed(normalized, kind);
        let threshold = self.scoring.threshold(kind);

        let completion =
            self.engine
                .on_general_completed(&person.id, normalized, passed, threshold, submission_id)?;

        let mut rejected = Vec::new();
        if !passed {
            rejected = self.reject_pending_applications(&person.id, normalized)?;
        }

        Ok(GeneralWebhookOutcome::Processed {
            completion,
            rejected,
        })
    }

    /// A specialized-competencies form was completed for one application.
    pub fn handle_specialized_assessment(
        &self,
        envelope: &WebhookEnvelope,
    ) -> Result<SpecializedWebhookOutcome, WebhookError> {
        let submission_id = &envelope.data.submission_id;
        if self
            .store
            .assessment_by_completion_key(submission_id)?
            .is_some()
        {
            info!(%submission_id, "duplicate specialized-assessment delivery ignored");
            return Ok(SpecializedWebhookOutcome::AlreadyProcessed);
        }

        let resolver = PrefixFieldResolver::new(&envelope.data.fields);
        let result = ScAssessmentResult::extract(&resolver)?;

        let application = self
            .store
            .application(&result.application_id)?
            .ok_or_else(|| WebhookError::UnknownApplication(result.application_id.0.clone()))?;

        let kind = AssessmentKind::SpecializedCompetencies;
        let normalized = self
            .scoring
            .normalize_for(result.raw_score, result.max_score, kind);
        let passed = self.scoring.passed(normalized, kind);
        let threshold = self.scoring.threshold(kind);

        let completion = self.engine.on_specialized_completed(
            &application.id,
            &application.person_id,
            normalized,
            passed,
            threshold,
            &result.template_id,
            submission_id,
        )?;

        Ok(SpecializedWebhookOutcome::Processed(completion))
    }

    /// Reject every active application of `person_id` still waiting on the
    /// general stage; the caller-side decision of the failed-GC flow.
    fn reject_pending_applications(
        &self,
        person_id: &PersonId,
        normalized_score: u32,
    ) -> Result<Vec<ApplicationId>, WebhookError> {
        let mut rejected = Vec::new();
        for mut application in self.store.applications_for_person(person_id)? {
            let waiting = matches!(
                application.current_stage,
                Stage::Application | Stage::GeneralCompetencies
            );
            if application.status != ApplicationStatus::Active || !waiting {
                continue;
            }

            application.status = ApplicationStatus::Rejected;
            application.updated_at = Utc::now();
            self.store.update_application(application.clone())?;

            record_best_effort(
                self.audit.as_ref(),
                AuditEntry::new(
                    "application_rejected",
                    format!("application/{}", application.id.0),
                )
                .detail("reason", "general competencies failed")
                .detail("score", normalized_score.to_string())
                .actor("webhook-adapter"),
            );
            rejected.push(application.id);
        }
        Ok(rejected)
    }
}
