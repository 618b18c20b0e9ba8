use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound delivery from the external form provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEnvelope {
    pub event_id: String,
    pub created_at: DateTime<Utc>,
    pub data: WebhookData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookData {
    /// Provider-issued id, unique per submission; the de-duplication token.
    pub submission_id: String,
    pub respondent_id: String,
    pub form_id: String,
    pub fields: Vec<WebhookField>,
}

/// One key/value pair from the submitted form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookField {
    pub key: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub value: Value,
}
