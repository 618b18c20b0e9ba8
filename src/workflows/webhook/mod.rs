//! Inbound form-provider webhooks: validation, de-duplication, and mapping
//! onto the completion events the rest of the pipeline consumes.

pub mod adapter;
pub mod fields;
pub mod payload;
pub mod router;

#[cfg(test)]
mod tests;

pub use adapter::{
    ApplicationData, GcAssessmentResult, GeneralWebhookOutcome, IntakeOutcome, IntakeRouting,
    PersonData, ScAssessmentResult, SpecializedWebhookOutcome, WebhookAdapter, WebhookError,
};
pub use fields::{FieldResolver, PrefixFieldResolver};
pub use payload::{WebhookData, WebhookEnvelope, WebhookField};
pub use router::webhook_router;
