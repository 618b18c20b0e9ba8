use super::common::*;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use crate::store::InMemoryStore;
use crate::workflows::assessments::domain::{Answer, TemplateId};
use crate::workflows::assessments::router::{
    self, assessment_router, SaveResponseRequest, StartSessionRequest, SubmitRequest,
};
use crate::workflows::pipeline::domain::PersonId;
use crate::workflows::testing::{seed_person, MemoryAudit, MemoryNotifier};

#[tokio::test]
async fn start_handler_returns_not_found_for_unknown_template() {
    let sh = build_service();
    seed_person(&sh.h.store, "person-000301", "route@example.com");

    let response = router::start_handler::<InMemoryStore, InMemoryStore, MemoryAudit, MemoryNotifier>(
        State(sh.service.clone()),
        axum::Json(StartSessionRequest {
            template_id: TemplateId("tpl-missing".to_string()),
            person_id: PersonId("person-000301".to_string()),
            application_id: None,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert!(payload.get("error").is_some());
}

#[tokio::test]
async fn start_handler_requires_application_for_specialized_templates() {
    let sh = build_service();
    seed_person(&sh.h.store, "person-000302", "sc-route@example.com");

    let response = router::start_handler::<InMemoryStore, InMemoryStore, MemoryAudit, MemoryNotifier>(
        State(sh.service.clone()),
        axum::Json(StartSessionRequest {
            template_id: TemplateId("tpl-sc-1".to_string()),
            person_id: PersonId("person-000302".to_string()),
            application_id: None,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn submit_handler_conflicts_on_a_completed_session() {
    let sh = build_service();
    let person = seed_person(&sh.h.store, "person-000303", "done-route@example.com");
    let session = sh
        .service
        .start(&TemplateId("tpl-gc-1".to_string()), &person.id, None)
        .expect("start");
    sh.service
        .submit(&session.id, gc_passing_answers())
        .expect("first submit");

    let response =
        router::submit_handler::<InMemoryStore, InMemoryStore, MemoryAudit, MemoryNotifier>(
            State(sh.service.clone()),
            axum::extract::Path(session.id.0.clone()),
            axum::Json(SubmitRequest {
                answers: gc_passing_answers(),
            }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn save_response_handler_rejects_unknown_sessions() {
    let sh = build_service();

    let response = router::save_response_handler::<
        InMemoryStore,
        InMemoryStore,
        MemoryAudit,
        MemoryNotifier,
    >(
        State(sh.service.clone()),
        axum::extract::Path(("sess-missing".to_string(), "q-self".to_string())),
        axum::Json(SaveResponseRequest {
            answer: Answer::Rating { value: 5 },
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn start_route_creates_a_session() {
    let sh = build_service();
    seed_person(&sh.h.store, "person-000304", "oneshot@example.com");
    let router = assessment_router(sh.service.clone());

    let response = router
        .oneshot(
            axum::http::Request::post("/api/v1/assessments/sessions")
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(
                    serde_json::to_vec(&json!({
                        "template_id": "tpl-gc-1",
                        "person_id": "person-000304",
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert!(payload.get("session_id").is_some());
    assert_eq!(payload.get("status"), Some(&json!("in_progress")));
}

#[tokio::test]
async fn submit_route_reports_the_outcome() {
    let sh = build_service();
    let person = seed_person(&sh.h.store, "person-000305", "submit-route@example.com");
    let session = sh
        .service
        .start(&TemplateId("tpl-gc-1".to_string()), &person.id, None)
        .expect("start");
    let router = assessment_router(sh.service.clone());

    let response = router
        .oneshot(
            axum::http::Request::post(format!(
                "/api/v1/assessments/sessions/{}/submit",
                session.id.0
            ))
            .header(axum::http::header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(
                serde_json::to_vec(&json!({
                    "answers": [
                        {"question_id": "q-ethics", "answer": {"type": "true_false", "value": true}},
                        {"question_id": "q-self", "answer": {"type": "rating", "value": 7}},
                    ],
                }))
                .unwrap(),
            ))
            .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("raw_score"), Some(&json!(85)));
    assert_eq!(payload.get("normalized_score"), Some(&json!(850)));
    assert_eq!(payload.get("passed"), Some(&json!(true)));
}

#[tokio::test]
async fn session_route_returns_the_current_view() {
    let sh = build_service();
    let person = seed_person(&sh.h.store, "person-000306", "view@example.com");
    let session = sh
        .service
        .start(&TemplateId("tpl-gc-1".to_string()), &person.id, None)
        .expect("start");
    sh.service
        .submit(&session.id, gc_passing_answers())
        .expect("submit");
    let router = assessment_router(sh.service.clone());

    let response = router
        .oneshot(
            axum::http::Request::get(format!("/api/v1/assessments/sessions/{}", session.id.0))
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("status"), Some(&json!("completed")));
    assert_eq!(payload.get("score"), Some(&json!(85)));
    assert_eq!(payload.get("passed"), Some(&json!(true)));
}

#[tokio::test]
async fn expire_route_reports_the_sweep_count() {
    let sh = build_service();
    let router = assessment_router(sh.service.clone());

    let response = router
        .oneshot(
            axum::http::Request::post("/api/v1/assessments/sessions/expire-stale")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("expired"), Some(&json!(0)));
}
