use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::store::InMemoryStore;
use crate::workflows::assessments::domain::{
    Answer, AssessmentKind, AssessmentTemplate, ChoiceOption, Question, QuestionConfig,
    QuestionId, TemplateId,
};
use crate::workflows::assessments::normalize::ScoringConfig;
use crate::workflows::assessments::repository::AssessmentStore;
use crate::workflows::assessments::service::{AssessmentService, SubmittedAnswer};
use crate::workflows::testing::{harness, Harness, MemoryAudit, MemoryNotifier};

pub(super) type TestService =
    AssessmentService<InMemoryStore, InMemoryStore, MemoryAudit, MemoryNotifier>;

pub(super) fn gc_template() -> AssessmentTemplate {
    AssessmentTemplate {
        id: TemplateId("tpl-gc-1".to_string()),
        kind: AssessmentKind::GeneralCompetencies,
        title: "General Competencies".to_string(),
        position: None,
        questions: vec![
            Question {
                id: QuestionId("q-ethics".to_string()),
                prompt: "Deadlines take priority over accuracy".to_string(),
                points: 50,
                config: QuestionConfig::TrueFalse { correct: true },
            },
            Question {
                id: QuestionId("q-self".to_string()),
                prompt: "Rate your comfort with ambiguity".to_string(),
                points: 50,
                config: QuestionConfig::Rating { min: 0, max: 10 },
            },
        ],
        passing_score: 80,
        time_limit_minutes: Some(90),
        is_active: true,
    }
}

pub(super) fn sc_template() -> AssessmentTemplate {
    AssessmentTemplate {
        id: TemplateId("tpl-sc-1".to_string()),
        kind: AssessmentKind::SpecializedCompetencies,
        title: "Platform Engineering".to_string(),
        position: Some("Platform Engineer".to_string()),
        questions: vec![
            Question {
                id: QuestionId("q-arch".to_string()),
                prompt: "Pick the resilient topology".to_string(),
                points: 30,
                config: QuestionConfig::SingleChoice {
                    options: vec![
                        ChoiceOption {
                            id: "multi-az".to_string(),
                            label: "Multi-AZ".to_string(),
                            points: 30,
                        },
                        ChoiceOption {
                            id: "single-node".to_string(),
                            label: "Single node".to_string(),
                            points: 5,
                        },
                    ],
                },
            },
            Question {
                id: QuestionId("q-oncall".to_string()),
                prompt: "How confident are you running incident response?".to_string(),
                points: 20,
                config: QuestionConfig::Likert {
                    points_map: Some(vec![0, 5, 10, 15, 20]),
                },
            },
        ],
        passing_score: 35,
        time_limit_minutes: None,
        is_active: true,
    }
}

/// Answers worth 85/100 against the general template.
pub(super) fn gc_passing_answers() -> Vec<SubmittedAnswer> {
    vec![
        SubmittedAnswer {
            question_id: QuestionId("q-ethics".to_string()),
            answer: Answer::TrueFalse { value: true },
        },
        SubmittedAnswer {
            question_id: QuestionId("q-self".to_string()),
            answer: Answer::Rating { value: 7 },
        },
    ]
}

/// Answers worth 60/100 against the general template.
pub(super) fn gc_failing_answers() -> Vec<SubmittedAnswer> {
    vec![
        SubmittedAnswer {
            question_id: QuestionId("q-ethics".to_string()),
            answer: Answer::TrueFalse { value: true },
        },
        SubmittedAnswer {
            question_id: QuestionId("q-self".to_string()),
            answer: Answer::Rating { value: 2 },
        },
    ]
}

pub(super) struct ServiceHarness {
    pub(super) service: Arc<TestService>,
    pub(super) h: Harness,
}

pub(super) fn build_service() -> ServiceHarness {
    let h = harness();
    h.store.put_template(gc_template()).expect("seed template");
    h.store.put_template(sc_template()).expect("seed template");
    let service = Arc::new(AssessmentService::new(
        h.store.clone(),
        h.engine.clone(),
        h.audit.clone(),
        ScoringConfig::default(),
    ));
    ServiceHarness { service, h }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
