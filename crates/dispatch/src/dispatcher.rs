//! Best-effort dispatch around the audit/notify collaborators.

use std::sync::{Arc, Mutex};

use tradecraft_auth::{Actor, Role};

use crate::audit::{AuditSink, TargetRef};
use crate::notify::Notifier;

/// A side effect that could not be delivered.
///
/// Dead letters are retained so the host application can drain and retry or
/// surface them; they are never re-raised into the triggering mutation.
#[derive(Debug, Clone)]
pub enum DeadLetter {
    Audit {
        actor: Actor,
        description: String,
        target: TargetRef,
        error: String,
    },
    Notification {
        recipients: Vec<Role>,
        message: String,
        metadata: serde_json::Value,
        error: String,
    },
}

/// Fire-and-forget wrapper over an [`AuditSink`] and a [`Notifier`].
///
/// Collaborator failures are logged at warn level and parked in the
/// dead-letter buffer. At-most-once: nothing is retried here.
pub struct Dispatcher {
    audit: Arc<dyn AuditSink>,
    notifier: Arc<dyn Notifier>,
    dead_letters: Mutex<Vec<DeadLetter>>,
}

impl Dispatcher {
    pub fn new(audit: Arc<dyn AuditSink>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            audit,
            notifier,
            dead_letters: Mutex::new(Vec::new()),
        }
    }

    /// Record an audit entry, swallowing delivery failure.
    pub fn audit(&self, actor: &Actor, description: impl Into<String>, target: TargetRef) {
        let description = description.into();
        if let Err(error) = self.audit.log_action(actor, &description, target) {
            tracing::warn!(%actor, %description, %error, "audit dispatch failed");
            self.park(DeadLetter::Audit {
                actor: *actor,
                description,
                target,
                error: error.to_string(),
            });
        }
    }

    /// Fan a notification out to the given roles, swallowing delivery failure.
    pub fn notify(&self, recipients: &[Role], message: impl Into<String>, metadata: serde_json::Value) {
        let message = message.into();
        if let Err(error) = self.notifier.notify(recipients, &message, metadata.clone()) {
            tracing::warn!(%message, %error, "notification dispatch failed");
            self.park(DeadLetter::Notification {
                recipients: recipients.to_vec(),
                message,
                metadata,
                error: error.to_string(),
            });
        }
    }

    /// Snapshot of the undelivered side effects.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters
            .lock()
            .map(|letters| letters.clone())
            .unwrap_or_default()
    }

    /// Drain the dead-letter buffer (e.g. for a host-side retry sweep).
    pub fn drain_dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters
            .lock()
            .map(|mut letters| letters.drain(..).collect())
            .unwrap_or_default()
    }

    fn park(&self, letter: DeadLetter) {
        // If the lock is poisoned the letter is dropped; the warn! above has
        // already recorded the failure.
        if let Ok(mut letters) = self.dead_letters.lock() {
            letters.push(letter);
        }
    }
}
