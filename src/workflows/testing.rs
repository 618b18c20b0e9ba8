//! Shared in-memory fakes for the workflow test suites.

use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::store::InMemoryStore;
use crate::workflows::audit::{AuditEntry, AuditError, AuditSink};
use crate::workflows::pipeline::domain::{
    Application, ApplicationId, ApplicationStatus, Person, PersonId, Stage,
};
use crate::workflows::pipeline::engine::PipelineEngine;
use crate::workflows::pipeline::repository::{
    Notification, NotificationError, NotificationSender, PipelineStore,
};

/// Capturing audit sink.
#[derive(Default)]
pub(crate) struct MemoryAudit {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAudit {
    pub(crate) fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().expect("audit mutex poisoned").clone()
    }

    pub(crate) fn entries_for_action(&self, action: &str) -> Vec<AuditEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.action == action)
            .collect()
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        self.entries
            .lock()
            .expect("audit mutex poisoned")
            .push(entry);
        Ok(())
    }
}

/// Capturing notification sender.
#[derive(Default)]
pub(crate) struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub(crate) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationSender for MemoryNotifier {
    fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(crate) struct Harness {
    pub(crate) store: Arc<InMemoryStore>,
    pub(crate) audit: Arc<MemoryAudit>,
    pub(crate) notifier: Arc<MemoryNotifier>,
    pub(crate) engine: Arc<PipelineEngine<InMemoryStore, MemoryAudit, MemoryNotifier>>,
}

pub(crate) fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let audit = Arc::new(MemoryAudit::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let engine = Arc::new(PipelineEngine::new(
        store.clone(),
        audit.clone(),
        notifier.clone(),
    ));
    Harness {
        store,
        audit,
        notifier,
        engine,
    }
}

pub(crate) fn seed_person(store: &InMemoryStore, id: &str, email: &str) -> Person {
    store
        .find_or_create_person(Person {
            id: PersonId(id.to_string()),
            email: email.to_string(),
            first_name: "Noor".to_string(),
            last_name: "Haddad".to_string(),
            phone: None,
            general_completed: false,
            general_score: None,
            general_passed_at: None,
            created_at: Utc::now(),
        })
        .expect("seed person")
}

pub(crate) fn seed_application(
    store: &InMemoryStore,
    id: &str,
    person_id: &PersonId,
    stage: Stage,
    status: ApplicationStatus,
) -> Application {
    store
        .insert_application(Application {
            id: ApplicationId(id.to_string()),
            person_id: person_id.clone(),
            position: "Platform Engineer".to_string(),
            current_stage: stage,
            status,
            submission_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .expect("seed application")
}
