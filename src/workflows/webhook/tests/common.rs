use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};

use crate::store::InMemoryStore;
use crate::workflows::assessments::normalize::ScoringConfig;
use crate::workflows::testing::{harness, Harness, MemoryAudit, MemoryNotifier};
use crate::workflows::webhook::adapter::WebhookAdapter;
use crate::workflows::webhook::payload::{WebhookData, WebhookEnvelope, WebhookField};

pub(super) type TestAdapter = WebhookAdapter<InMemoryStore, MemoryAudit, MemoryNotifier>;

pub(super) struct AdapterHarness {
    pub(super) adapter: Arc<TestAdapter>,
    pub(super) h: Harness,
}

pub(super) fn build_adapter() -> AdapterHarness {
    let h = harness();
    let adapter = Arc::new(WebhookAdapter::new(
        h.store.clone(),
        h.engine.clone(),
        h.audit.clone(),
        ScoringConfig::default(),
    ));
    AdapterHarness { adapter, h }
}

pub(super) fn field(key: &str, value: Value) -> WebhookField {
    WebhookField {
        key: key.to_string(),
        field_type: "INPUT_TEXT".to_string(),
        value,
    }
}

pub(super) fn envelope(submission_id: &str, fields: Vec<WebhookField>) -> WebhookEnvelope {
    WebhookEnvelope {
        event_id: format!("evt-{submission_id}"),
        created_at: Utc::now(),
        data: WebhookData {
            submission_id: submission_id.to_string(),
            respondent_id: "resp-1".to_string(),
            form_id: "form-1".to_string(),
            fields,
        },
    }
}

/// A complete application-submission delivery, provider field keys carrying
/// their usual suffixes.
pub(super) fn application_envelope(submission_id: &str, email: &str) -> WebhookEnvelope {
    envelope(
        submission_id,
        vec![
            field("email_a1b2c3", json!(email)),
            field("firstName_d4e5f6", json!("Ada")),
            field("lastName_g7h8i9", json!("Lovelace")),
            field("phone_j1k2l3", json!("+44 20 7946 0018")),
            field("position_m4n5o6", json!("Platform Engineer")),
        ],
    )
}

pub(super) fn general_envelope(submission_id: &str, email: &str, score: u32) -> WebhookEnvelope {
    envelope(
        submission_id,
        vec![
            field("email_a1b2c3", json!(email)),
            field("score", json!(score)),
            field("maxScore", json!(100)),
        ],
    )
}

pub(super) fn specialized_envelope(
    submission_id: &str,
    application_id: &str,
    score: u32,
) -> WebhookEnvelope {
    envelope(
        submission_id,
        vec![
            field("applicationId", json!(application_id)),
            field("templateId", json!("tpl-sc-1")),
            field("score", json!(score)),
            field("maxScore", json!(60)),
        ],
    )
}
