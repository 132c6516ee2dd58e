use thiserror::Error;

use crate::domain::receipt::{ReceiptId, ReceiptVerdict};
use crate::domain::request::RequestStatus;
use crate::domain::user::Role;

/// Workflow error taxonomy. Guards fail fast with one of these before any
/// write; store failures are wrapped as `Internal` and surfaced generically.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("role {role:?} is not allowed to {action}")]
    Forbidden { role: Role, action: &'static str },
    #[error("cannot {action}: request is in status {status:?} ({})", status.label())]
    InvalidState { status: RequestStatus, action: &'static str },
    #[error("receipt {receipt_id} was already decided ({})", verdict.label())]
    AlreadyDecided { receipt_id: ReceiptId, verdict: ReceiptVerdict },
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl WorkflowError {
    /// Message safe to show to the end user. Rejected transitions carry the
    /// precise reason; internal failures stay generic so storage details do
    /// not leak.
    pub fn user_message(&self) -> String {
        match self {
            Self::Internal(_) => "An unexpected internal error occurred.".to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::WorkflowError;
    use crate::domain::request::RequestStatus;
    use crate::domain::user::Role;

    #[test]
    fn rejected_transitions_carry_the_precise_reason() {
        let error = WorkflowError::InvalidState {
            status: RequestStatus::Quote,
            action: "send receipts for validation",
        };
        let message = error.user_message();
        assert!(message.contains("send receipts for validation"));
        assert!(message.contains("Trip quote"));
    }

    #[test]
    fn forbidden_names_the_role_and_action() {
        let error =
            WorkflowError::Forbidden { role: Role::TravelAgency, action: "authorize the request" };
        assert!(error.user_message().contains("authorize the request"));
    }

    #[test]
    fn internal_errors_are_surfaced_generically() {
        let error = WorkflowError::Internal("database lock timeout on request row".to_string());
        assert!(error.is_internal());
        assert!(!error.user_message().contains("database"));
    }
}
