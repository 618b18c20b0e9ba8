use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One audit-trail entry describing a state change and the data behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: String,
    pub entity: String,
    pub details: BTreeMap<String, String>,
    pub actor: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(action: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            entity: entity.into(),
            details: BTreeMap::new(),
            actor: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

/// Audit delivery error.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Trait describing the outbound audit-log sink.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError>;
}

/// Best-effort recording: a failed audit write is logged, never propagated.
pub fn record_best_effort<A: AuditSink + ?Sized>(sink: &A, entry: AuditEntry) {
    let action = entry.action.clone();
    let entity = entry.entity.clone();
    if let Err(err) = sink.record(entry) {
        warn!(%action, %entity, error = %err, "audit write failed");
    }
}

/// Default sink emitting audit entries to the tracing pipeline.
#[derive(Debug, Default, Clone)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        info!(
            action = %entry.action,
            entity = %entry.entity,
            details = ?entry.details,
            actor = entry.actor.as_deref().unwrap_or("system"),
            "audit"
        );
        Ok(())
    }
}
