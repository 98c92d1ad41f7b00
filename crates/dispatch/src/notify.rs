use tradecraft_auth::Role;

/// Notification fan-out collaborator.
///
/// Recipients are selected by role; resolving roles to concrete user
/// accounts is the implementation's concern. Delivery is at-most-once and
/// may be deferred or dropped without affecting the triggering transaction.
pub trait Notifier: Send + Sync {
    fn notify(
        &self,
        recipients: &[Role],
        message: &str,
        metadata: serde_json::Value,
    ) -> anyhow::Result<()>;
}
