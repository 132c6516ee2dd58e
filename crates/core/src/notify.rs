use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::request::RequestId;

/// Projection delivered to the notifier after every successful transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionNotice {
    pub email: String,
    pub user_name: String,
    pub request_id: RequestId,
    pub status_label: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Best-effort notification seam. The workflow invokes it once per
/// successful transition; a delivery failure is logged by the caller and
/// never fails the transition itself.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &TransitionNotice) -> Result<(), NotifyError>;
}

/// Captures notices in memory for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<TransitionNotice>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<TransitionNotice> {
        self.sent.lock().map(|notices| notices.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notice: &TransitionNotice) -> Result<(), NotifyError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(notice.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Notifier, RecordingNotifier, TransitionNotice};
    use crate::domain::request::RequestId;

    #[tokio::test]
    async fn recording_notifier_captures_notices_in_order() {
        let notifier = RecordingNotifier::default();
        for (id, label) in [(1, "First revision"), (1, "Second revision")] {
            notifier
                .notify(&TransitionNotice {
                    email: "ana@example.com".to_string(),
                    user_name: "Ana".to_string(),
                    request_id: RequestId(id),
                    status_label: label.to_string(),
                })
                .await
                .expect("recording never fails");
        }

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].status_label, "First revision");
        assert_eq!(sent[1].status_label, "Second revision");
    }
}
