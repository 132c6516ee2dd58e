use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use tripflow_core::config::{NotifierConfig, NotifierMode};
use tripflow_core::notify::{Notifier, NotifyError, TransitionNotice};

/// Default notifier: writes the transition mail as a structured log line.
/// Real SMTP dispatch is out of scope; the smtp settings in the config are
/// carried so an SMTP-backed implementation can slot in behind this trait.
pub struct LogNotifier {
    from_address: String,
}

impl LogNotifier {
    pub fn new(from_address: &str) -> Self {
        Self { from_address: from_address.to_string() }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notice: &TransitionNotice) -> Result<(), NotifyError> {
        info!(
            event_name = "notify.transition.logged",
            correlation_id = "notify",
            request_id = %notice.request_id,
            from = %self.from_address,
            to = %notice.email,
            recipient = %notice.user_name,
            status = %notice.status_label,
            "travel request status notification"
        );
        Ok(())
    }
}

pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _notice: &TransitionNotice) -> Result<(), NotifyError> {
        Ok(())
    }
}

pub fn from_config(config: &NotifierConfig) -> Arc<dyn Notifier> {
    match config.mode {
        NotifierMode::Log => Arc::new(LogNotifier::new(&config.from_address)),
        NotifierMode::Noop => Arc::new(NoopNotifier),
    }
}
