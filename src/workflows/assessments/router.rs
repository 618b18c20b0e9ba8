use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::workflows::audit::AuditSink;
use crate::workflows::pipeline::domain::{ApplicationId, PersonId};
use crate::workflows::pipeline::engine::EngineError;
use crate::workflows::pipeline::repository::{NotificationSender, PipelineStore};

use super::domain::{Answer, AssessmentSession, QuestionId, SessionId, TemplateId};
use super::repository::AssessmentStore;
use super::service::{AssessmentError, AssessmentService, SubmittedAnswer};

/// Router builder exposing the session lifecycle endpoints.
pub fn assessment_router<S, P, A, N>(service: Arc<AssessmentService<S, P, A, N>>) -> Router
where
    S: AssessmentStore + 'static,
    P: PipelineStore + 'static,
    A: AuditSink + ?Sized + 'static,
    N: NotificationSender + ?Sized + 'static,
{
    Router::new()
        .route(
            "/api/v1/assessments/sessions",
            post(start_handler::<S, P, A, N>),
        )
        .route(
            "/api/v1/assessments/sessions/expire-stale",
            post(expire_handler::<S, P, A, N>),
        )
        .route(
            "/api/v1/assessments/sessions/:session_id",
            get(session_handler::<S, P, A, N>),
        )
        .route(
            "/api/v1/assessments/sessions/:session_id/responses/:question_id",
            put(save_response_handler::<S, P, A, N>),
        )
        .route(
            "/api/v1/assessments/sessions/:session_id/submit",
            post(submit_handler::<S, P, A, N>),
        )
        .route(
            "/api/v1/assessments/sessions/:session_id/abandon",
            post(abandon_handler::<S, P, A, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct StartSessionRequest {
    pub template_id: TemplateId,
    pub person_id: PersonId,
    #[serde(default)]
    pub application_id: Option<ApplicationId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SaveResponseRequest {
    pub answer: Answer,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitRequest {
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
}

/// Sanitized representation of a session for API responses.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub status: &'static str,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
}

impl From<AssessmentSession> for SessionView {
    fn from(session: AssessmentSession) -> Self {
        Self {
            session_id: session.id,
            status: session.status.label(),
            started_at: session.started_at,
            expires_at: session.expires_at,
            score: session.score,
            passed: session.passed,
        }
    }
}

pub(crate) async fn start_handler<S, P, A, N>(
    State(service): State<Arc<AssessmentService<S, P, A, N>>>,
    axum::Json(request): axum::Json<StartSessionRequest>,
) -> Response
where
    S: AssessmentStore + 'static,
    P: PipelineStore + 'static,
    A: AuditSink + ?Sized + 'static,
    N: NotificationSender + ?Sized + 'static,
{
    match service.start(&request.template_id, &request.person_id, request.application_id) {
        Ok(session) => (StatusCode::CREATED, axum::Json(SessionView::from(session))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn session_handler<S, P, A, N>(
    State(service): State<Arc<AssessmentService<S, P, A, N>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: AssessmentStore + 'static,
    P: PipelineStore + 'static,
    A: AuditSink + ?Sized + 'static,
    N: NotificationSender + ?Sized + 'static,
{
    let session_id = SessionId(session_id);
    match service.session(&session_id) {
        Ok(session) => (StatusCode::OK, axum::Json(SessionView::from(session))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn save_response_handler<S, P, A, N>(
    State(service): State<Arc<AssessmentService<S, P, A, N>>>,
    Path((session_id, question_id)): Path<(String, String)>,
    axum::Json(request): axum::Json<SaveResponseRequest>,
) -> Response
where
    S: AssessmentStore + 'static,
    P: PipelineStore + 'static,
    A: AuditSink + ?Sized + 'static,
    N: NotificationSender + ?Sized + 'static,
{
    let session_id = SessionId(session_id);
    let question_id = QuestionId(question_id);
    match service.save_response(&session_id, &question_id, request.answer) {
        Ok(response) => (
            StatusCode::OK,
            axum::Json(json!({
                "session_id": response.session_id.0,
                "question_id": response.question_id.0,
                "answered_at": response.answered_at,
            })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<S, P, A, N>(
    State(service): State<Arc<AssessmentService<S, P, A, N>>>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<SubmitRequest>,
) -> Response
where
    S: AssessmentStore + 'static,
    P: PipelineStore + 'static,
    A: AuditSink + ?Sized + 'static,
    N: NotificationSender + ?Sized + 'static,
{
    let session_id = SessionId(session_id);
    match service.submit(&session_id, request.answers) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn abandon_handler<S, P, A, N>(
    State(service): State<Arc<AssessmentService<S, P, A, N>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: AssessmentStore + 'static,
    P: PipelineStore + 'static,
    A: AuditSink + ?Sized + 'static,
    N: NotificationSender + ?Sized + 'static,
{
    let session_id = SessionId(session_id);
    match service.abandon(&session_id) {
        Ok(session) => (StatusCode::OK, axum::Json(SessionView::from(session))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn expire_handler<S, P, A, N>(
    State(service): State<Arc<AssessmentService<S, P, A, N>>>,
) -> Response
where
    S: AssessmentStore + 'static,
    P: PipelineStore + 'static,
    A: AuditSink + ?Sized + 'static,
    N: NotificationSender + ?Sized + 'static,
{
    match service.expire_stale() {
        Ok(affected) => (StatusCode::OK, axum::Json(json!({ "expired": affected }))).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: AssessmentError) -> Response {
    let status = match &error {
        AssessmentError::TemplateNotFound | AssessmentError::SessionNotFound => {
            StatusCode::NOT_FOUND
        }
        AssessmentError::TemplateInactive
        | AssessmentError::AlreadyCompleted
        | AssessmentError::SessionNotActive => StatusCode::CONFLICT,
        AssessmentError::ApplicationRequired => StatusCode::BAD_REQUEST,
        AssessmentError::Pipeline(EngineError::PersonNotFound)
        | AssessmentError::Pipeline(EngineError::ApplicationNotFound) => StatusCode::NOT_FOUND,
        AssessmentError::Store(_) | AssessmentError::Pipeline(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
