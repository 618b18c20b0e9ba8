use std::sync::Arc;

use crate::store::InMemoryStore;
use crate::workflows::assessments::domain::TemplateId;
use crate::workflows::audit::{AuditSink, TracingAuditSink};
use crate::workflows::pipeline::domain::{
    Application, ApplicationId, ApplicationStatus, PersonId, Stage,
};
use crate::workflows::pipeline::engine::{can_advance, PipelineEngine};
use crate::workflows::pipeline::repository::{NotificationSender, PipelineStore, TracingNotifier};
use crate::workflows::testing::{harness, seed_application, seed_person};
use chrono::Utc;

fn sample_application(stage: Stage, status: ApplicationStatus) -> Application {
    Application {
        id: ApplicationId("app-guard".to_string()),
        person_id: PersonId("person-guard".to_string()),
        position: "Platform Engineer".to_string(),
        current_stage: stage,
        status,
        submission_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn can_advance_requires_forward_motion_and_active_status() {
    let active = sample_application(Stage::SpecializedCompetencies, ApplicationStatus::Active);
    assert!(can_advance(&active, Stage::Interview));
    assert!(!can_advance(&active, Stage::SpecializedCompetencies));
    assert!(!can_advance(&active, Stage::Application));

    let rejected = sample_application(Stage::Application, ApplicationStatus::Rejected);
    assert!(!can_advance(&rejected, Stage::Interview));
    let withdrawn = sample_application(Stage::Application, ApplicationStatus::Withdrawn);
    assert!(!can_advance(&withdrawn, Stage::GeneralCompetencies));
}

#[test]
fn general_pass_advances_every_waiting_application() {
    let h = harness();
    let person = seed_person(&h.store, "person-000101", "pass@example.com");
    seed_application(
        &h.store,
        "app-000101",
        &person.id,
        Stage::Application,
        ApplicationStatus::Active,
    );
    seed_application(
        &h.store,
        "app-000102",
        &person.id,
        Stage::GeneralCompetencies,
        ApplicationStatus::Active,
    );
    seed_application(
        &h.store,
        "app-000103",
        &person.id,
        Stage::Interview,
        ApplicationStatus::Active,
    );

    let completion = h
        .engine
        .on_general_completed(&person.id, 850, true, 800, "sess-gc-pass")
        .expect("handler succeeds");

    assert!(completion.passed);
    assert!(completion.recorded);
    assert_eq!(completion.advanced.len(), 2);

    let stored = h.store.person(&person.id).expect("fetch").expect("present");
    assert!(stored.general_completed);
    assert_eq!(stored.general_score, Some(850));
    assert!(stored.general_passed_at.is_some());

    for id in ["app-000101", "app-000102"] {
        let application = h
            .store
            .application(&ApplicationId(id.to_string()))
            .expect("fetch")
            .expect("present");
        assert_eq!(application.current_stage, Stage::SpecializedCompetencies);
    }
    let untouched = h
        .store
        .application(&ApplicationId("app-000103".to_string()))
        .expect("fetch")
        .expect("present");
    assert_eq!(untouched.current_stage, Stage::Interview);

    let audits = h.audit.entries_for_action("stage_changed");
    assert_eq!(audits.len(), 2);
    for entry in &audits {
        assert_eq!(
            entry.details.get("to").map(String::as_str),
            Some("specialized_competencies")
        );
        assert_eq!(entry.details.get("score").map(String::as_str), Some("850"));
    }
}

#[test]
fn general_failure_records_history_but_moves_nothing() {
    let h = harness();
    let person = seed_person(&h.store, "person-000111", "fail@example.com");
    seed_application(
        &h.store,
        "app-000111",
        &person.id,
        Stage::Application,
        ApplicationStatus::Active,
    );

    let completion = h
        .engine
        .on_general_completed(&person.id, 600, false, 800, "sess-gc-fail")
        .expect("handler succeeds");

    assert!(!completion.passed);
    assert!(completion.advanced.is_empty());

    let stored = h.store.person(&person.id).expect("fetch").expect("present");
    assert!(stored.general_completed);
    assert_eq!(stored.general_score, Some(600));
    assert!(stored.general_passed_at.is_none());

    let application = h
        .store
        .application(&ApplicationId("app-000111".to_string()))
        .expect("fetch")
        .expect("present");
    assert_eq!(application.current_stage, Stage::Application);
    assert_eq!(application.status, ApplicationStatus::Active);

    assert_eq!(h.store.assessment_history().len(), 1);
    assert!(h.audit.entries_for_action("stage_changed").is_empty());
}

#[test]
fn general_handler_tolerates_replays() {
    let h = harness();
    let person = seed_person(&h.store, "person-000121", "replay@example.com");
    seed_application(
        &h.store,
        "app-000121",
        &person.id,
        Stage::Application,
        ApplicationStatus::Active,
    );

    let first = h
        .engine
        .on_general_completed(&person.id, 850, true, 800, "sess-gc-replay")
        .expect("first invocation");
    assert!(first.recorded);
    assert_eq!(first.advanced.len(), 1);

    let second = h
        .engine
        .on_general_completed(&person.id, 850, true, 800, "sess-gc-replay")
        .expect("second invocation");
    assert!(!second.recorded);
    assert!(second.advanced.is_empty(), "no re-advancement on replay");

    assert_eq!(h.store.assessment_history().len(), 1);
}

#[test]
fn specialized_pass_advances_single_application_and_notifies() {
    let h = harness();
    let person = seed_person(&h.store, "person-000131", "sc@example.com");
    let application = seed_application(
        &h.store,
        "app-000131",
        &person.id,
        Stage::SpecializedCompetencies,
        ApplicationStatus::Active,
    );

    let completion = h
        .engine
        .on_specialized_completed(
            &application.id,
            &person.id,
            480,
            true,
            400,
            &TemplateId("tpl-sc-1".to_string()),
            "sub-sc-pass",
        )
        .expect("handler succeeds");

    assert!(completion.advanced);
    assert!(completion.recorded);

    let stored = h
        .store
        .application(&application.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(stored.current_stage, Stage::Interview);

    let notifications = h.notifier.sent();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].template, "interview_invitation");
    assert_eq!(notifications[0].application_id, application.id);

    let history = h.store.assessment_history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].application_id, Some(application.id.clone()));
    assert_eq!(history[0].template_id, Some(TemplateId("tpl-sc-1".to_string())));
}

#[test]
fn specialized_handler_is_idempotent() {
    let h = harness();
    let person = seed_person(&h.store, "person-000141", "sc-idem@example.com");
    let application = seed_application(
        &h.store,
        "app-000141",
        &person.id,
        Stage::SpecializedCompetencies,
        ApplicationStatus::Active,
    );
    let template = TemplateId("tpl-sc-1".to_string());

    let first = h
        .engine
        .on_specialized_completed(&application.id, &person.id, 480, true, 400, &template, "sub-idem")
        .expect("first invocation");
    assert!(first.advanced);

    let second = h
        .engine
        .on_specialized_completed(&application.id, &person.id, 480, true, 400, &template, "sub-idem")
        .expect("second invocation");
    assert!(!second.recorded);
    assert!(!second.advanced, "stage must advance at most once");

    assert_eq!(h.store.assessment_history().len(), 1);
    assert_eq!(h.notifier.sent().len(), 1);
    let stored = h
        .store
        .application(&application.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(stored.current_stage, Stage::Interview);
}

#[test]
fn specialized_failure_leaves_the_application_alone() {
    let h = harness();
    let person = seed_person(&h.store, "person-000151", "sc-fail@example.com");
    let application = seed_application(
        &h.store,
        "app-000151",
        &person.id,
        Stage::SpecializedCompetencies,
        ApplicationStatus::Active,
    );

    let completion = h
        .engine
        .on_specialized_completed(
            &application.id,
            &person.id,
            300,
            false,
            400,
            &TemplateId("tpl-sc-1".to_string()),
            "sub-sc-fail",
        )
        .expect("handler succeeds");

    assert!(!completion.advanced);
    let stored = h
        .store
        .application(&application.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(stored.current_stage, Stage::SpecializedCompetencies);
    assert_eq!(stored.status, ApplicationStatus::Active);
    assert!(h.notifier.sent().is_empty());
    assert_eq!(h.store.assessment_history().len(), 1);
}

#[test]
fn unknown_person_is_surfaced() {
    let h = harness();
    let result = h.engine.on_general_completed(
        &PersonId("person-missing".to_string()),
        850,
        true,
        800,
        "sess-missing",
    );
    assert!(matches!(
        result,
        Err(crate::workflows::pipeline::engine::EngineError::PersonNotFound)
    ));
    assert!(h.store.assessment_history().is_empty());
}

#[test]
fn engine_accepts_trait_object_sinks() {
    let store = Arc::new(InMemoryStore::new());
    let audit: Arc<dyn AuditSink> = Arc::new(TracingAuditSink);
    let notifier: Arc<dyn NotificationSender> = Arc::new(TracingNotifier);
    let engine: PipelineEngine<InMemoryStore, dyn AuditSink, dyn NotificationSender> =
        PipelineEngine::new(store.clone(), audit, notifier);

    let person = seed_person(&store, "person-000171", "dyn@example.com");
    seed_application(
        &store,
        "app-000171",
        &person.id,
        Stage::Application,
        ApplicationStatus::Active,
    );

    let completion = engine
        .on_general_completed(&person.id, 850, true, 800, "sess-dyn")
        .expect("handler succeeds");
    assert_eq!(completion.advanced.len(), 1);
}

#[test]
fn frozen_applications_never_advance() {
    let h = harness();
    let person = seed_person(&h.store, "person-000161", "frozen@example.com");
    seed_application(
        &h.store,
        "app-000161",
        &person.id,
        Stage::Application,
        ApplicationStatus::Withdrawn,
    );

    let completion = h
        .engine
        .on_general_completed(&person.id, 900, true, 800, "sess-frozen")
        .expect("handler succeeds");
    assert!(completion.advanced.is_empty());

    let stored = h
        .store
        .application(&ApplicationId("app-000161".to_string()))
        .expect("fetch")
        .expect("present");
    assert_eq!(stored.current_stage, Stage::Application);
    assert_eq!(stored.status, ApplicationStatus::Withdrawn);
}
