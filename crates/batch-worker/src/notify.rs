//! Requester notifications.
//!
//! Soft failures and progress are surfaced to the requester as one-line
//! notices at the point of occurrence. The delivery channel is a collaborator;
//! the default implementation reports through tracing.

use async_trait::async_trait;
use tracing::info;

/// One-line notices back to the requester.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str);
}

/// Default notifier: structured log output.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, text: &str) {
        info!(target: "notice", "{}", text);
    }
}
