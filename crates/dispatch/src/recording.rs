//! In-memory sinks for tests/dev.

use std::sync::Mutex;

use tradecraft_auth::{Actor, Role};

use crate::audit::{AuditSink, TargetRef};
use crate::notify::Notifier;

/// A captured audit entry.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub actor: Actor,
    pub description: String,
    pub target: TargetRef,
}

/// A captured notification.
#[derive(Debug, Clone)]
pub struct SentNotification {
    pub recipients: Vec<Role>,
    pub message: String,
    pub metadata: serde_json::Value,
}

/// Records every audit entry and notification it receives.
///
/// - No IO / no async
/// - Implements both collaborator traits so one instance can back a whole
///   [`crate::Dispatcher`] in tests
#[derive(Debug, Default)]
pub struct RecordingSink {
    audit_entries: Mutex<Vec<AuditEntry>>,
    notifications: Mutex<Vec<SentNotification>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit_entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Audit descriptions in arrival order, for terse assertions.
    pub fn descriptions(&self) -> Vec<String> {
        self.audit_entries()
            .into_iter()
            .map(|entry| entry.description)
            .collect()
    }

    pub fn notifications(&self) -> Vec<SentNotification> {
        self.notifications
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl AuditSink for RecordingSink {
    fn log_action(&self, actor: &Actor, description: &str, target: TargetRef) -> anyhow::Result<()> {
        self.audit_entries
            .lock()
            .map_err(|_| anyhow::anyhow!("audit buffer poisoned"))?
            .push(AuditEntry {
                actor: *actor,
                description: description.to_string(),
                target,
            });
        Ok(())
    }
}

impl Notifier for RecordingSink {
    fn notify(
        &self,
        recipients: &[Role],
        message: &str,
        metadata: serde_json::Value,
    ) -> anyhow::Result<()> {
        self.notifications
            .lock()
            .map_err(|_| anyhow::anyhow!("notification buffer poisoned"))?
            .push(SentNotification {
                recipients: recipients.to_vec(),
                message: message.to_string(),
                metadata,
            });
        Ok(())
    }
}

/// Always fails — proves transition success is independent of dispatch.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingSink;

impl AuditSink for FailingSink {
    fn log_action(&self, _: &Actor, _: &str, _: TargetRef) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("audit store unreachable"))
    }
}

impl Notifier for FailingSink {
    fn notify(&self, _: &[Role], _: &str, _: serde_json::Value) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("notification channel unreachable"))
    }
}
