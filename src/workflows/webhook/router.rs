use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::json;

use crate::workflows::audit::AuditSink;
use crate::workflows::pipeline::engine::EngineError;
use crate::workflows::pipeline::repository::{NotificationSender, PipelineStore};

use super::adapter::{
    GeneralWebhookOutcome, IntakeOutcome, SpecializedWebhookOutcome, WebhookAdapter, WebhookError,
};
use super::payload::WebhookEnvelope;

/// Router builder exposing the provider webhook endpoints.
pub fn webhook_router<P, A, N>(adapter: Arc<WebhookAdapter<P, A, N>>) -> Router
where
    P: PipelineStore + 'static,
    A: AuditSink + ?Sized + 'static,
    N: NotificationSender + ?Sized + 'static,
{
    Router::new()
        .route(
            "/api/v1/webhooks/applications",
            post(application_handler::<P, A, N>),
        )
        .route(
            "/api/v1/webhooks/assessments/general",
            post(general_handler::<P, A, N>),
        )
        .route(
            "/api/v1/webhooks/assessments/specialized",
            post(specialized_handler::<P, A, N>),
        )
        .with_state(adapter)
}

pub(crate) async fn application_handler<P, A, N>(
    State(adapter): State<Arc<WebhookAdapter<P, A, N>>>,
    axum::Json(envelope): axum::Json<WebhookEnvelope>,
) -> Response
where
    P: PipelineStore + 'static,
    A: AuditSink + ?Sized + 'static,
    N: NotificationSender + ?Sized + 'static,
{
    match adapter.handle_application_submitted(&envelope) {
        Ok(IntakeOutcome::Created {
            person,
            application,
            routing,
        }) => (
            StatusCode::CREATED,
            axum::Json(json!({
                "application_id": application.id.0,
                "person_id": person.id.0,
                "stage": application.current_stage.label(),
                "status": application.status.label(),
                "routing": routing.label(),
            })),
        )
            .into_response(),
        Ok(IntakeOutcome::AlreadyProcessed(application)) => already_processed(json!({
            "application_id": application.id.0,
        })),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn general_handler<P, A, N>(
    State(adapter): State<Arc<WebhookAdapter<P, A, N>>>,
    axum::Json(envelope): axum::Json<WebhookEnvelope>,
) -> Response
where
    P: PipelineStore + 'static,
    A: AuditSink + ?Sized + 'static,
    N: NotificationSender + ?Sized + 'static,
{
    match adapter.handle_general_assessment(&envelope) {
        Ok(GeneralWebhookOutcome::Processed {
            completion,
            rejected,
        }) => (
            StatusCode::OK,
            axum::Json(json!({
                "person_id": completion.person_id.0,
                "score": completion.normalized_score,
                "passed": completion.passed,
                "advanced": completion.advanced.len(),
                "rejected": rejected.len(),
            })),
        )
            .into_response(),
        Ok(GeneralWebhookOutcome::AlreadyProcessed) => already_processed(json!({})),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn specialized_handler<P, A, N>(
    State(adapter): State<Arc<WebhookAdapter<P, A, N>>>,
    axum::Json(envelope): axum::Json<WebhookEnvelope>,
) -> Response
where
    P: PipelineStore + 'static,
    A: AuditSink + ?Sized + 'static,
    N: NotificationSender + ?Sized + 'static,
{
    match adapter.handle_specialized_assessment(&envelope) {
        Ok(SpecializedWebhookOutcome::Processed(completion)) => (
            StatusCode::OK,
            axum::Json(json!({
                "application_id": completion.application_id.0,
                "score": completion.normalized_score,
                "passed": completion.passed,
                "advanced": completion.advanced,
            })),
        )
            .into_response(),
        Ok(SpecializedWebhookOutcome::AlreadyProcessed) => already_processed(json!({})),
        Err(error) => error_response(error),
    }
}

/// Duplicate deliveries acknowledge with 200 so the provider stops
/// retrying; they are never an error.
fn already_processed(mut extra: serde_json::Value) -> Response {
    if let Some(map) = extra.as_object_mut() {
        map.insert("status".to_string(), json!("already_processed"));
    }
    (StatusCode::OK, axum::Json(extra)).into_response()
}

fn error_response(error: WebhookError) -> Response {
    let status = match &error {
        WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,
        WebhookError::UnknownPerson(_) | WebhookError::UnknownApplication(_) => {
            StatusCode::NOT_FOUND
        }
        WebhookError::Engine(EngineError::PersonNotFound)
        | WebhookError::Engine(EngineError::ApplicationNotFound) => StatusCode::NOT_FOUND,
        WebhookError::Store(_) | WebhookError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
