//! Role-gated status transition table for travel requests.
//!
//! Each function is a pure guard: it maps (current status, acting role,
//! action) to the next status or a typed rejection, and performs no I/O.
//! Callers read the current status, apply the guard, and persist the target
//! in one transaction.

use crate::domain::receipt::ReceiptVerdict;
use crate::domain::request::RequestStatus;
use crate::domain::user::Role;
use crate::errors::WorkflowError;

/// Statuses from which the owner may still cancel. Once the travel agency
/// has attended the request (or it reached a terminal outcome) cancellation
/// is no longer possible.
const CANCELLABLE: [RequestStatus; 5] = [
    RequestStatus::Open,
    RequestStatus::FirstRevision,
    RequestStatus::SecondRevision,
    RequestStatus::Quote,
    RequestStatus::AgencyAttention,
];

/// Initial review status for a newly submitted request, keyed off the
/// CREATING user's own role: an applicant's request needs both review tiers,
/// an N1's own request needs one, an N2's own request goes straight to
/// quoting. This self-escalating mapping is deliberate business policy.
pub fn submission_status(creator_role: Role) -> Result<RequestStatus, WorkflowError> {
    match creator_role {
        Role::Applicant => Ok(RequestStatus::FirstRevision),
        Role::AuthorizerN1 => Ok(RequestStatus::SecondRevision),
        Role::AuthorizerN2 => Ok(RequestStatus::Quote),
        role => Err(WorkflowError::Forbidden { role, action: "create a travel request" }),
    }
}

/// Confirming an Open draft submits it using the same role mapping as a
/// direct submission.
pub fn confirm_draft(
    current: RequestStatus,
    creator_role: Role,
) -> Result<RequestStatus, WorkflowError> {
    if current != RequestStatus::Open {
        return Err(WorkflowError::InvalidState { status: current, action: "confirm the draft" });
    }
    submission_status(creator_role)
}

/// N1 advances a request under review to the second tier; N2 advances it to
/// quoting. Only requests sitting in a review tier can be authorized.
pub fn authorize(current: RequestStatus, role: Role) -> Result<RequestStatus, WorkflowError> {
    if !matches!(current, RequestStatus::FirstRevision | RequestStatus::SecondRevision) {
        return Err(WorkflowError::InvalidState { status: current, action: "authorize the request" });
    }
    match role {
        Role::AuthorizerN1 => Ok(RequestStatus::SecondRevision),
        Role::AuthorizerN2 => Ok(RequestStatus::Quote),
        role => Err(WorkflowError::Forbidden { role, action: "authorize the request" }),
    }
}

/// Either review tier may decline a request under review, which is terminal.
pub fn decline(current: RequestStatus, role: Role) -> Result<RequestStatus, WorkflowError> {
    if !role.is_authorizer() {
        return Err(WorkflowError::Forbidden { role, action: "decline the request" });
    }
    if !matches!(current, RequestStatus::FirstRevision | RequestStatus::SecondRevision) {
        return Err(WorkflowError::InvalidState { status: current, action: "decline the request" });
    }
    Ok(RequestStatus::Rejected)
}

/// Accounts payable attends a quoted request: if any route needs a hotel or
/// plane the agency takes over, otherwise the trip proceeds straight to
/// expense verification. The imposed fee is persisted alongside.
pub fn attend_accounts_payable(
    current: RequestStatus,
    needs_agency_routing: bool,
) -> Result<RequestStatus, WorkflowError> {
    if current != RequestStatus::Quote {
        return Err(WorkflowError::InvalidState {
            status: current,
            action: "attend the request as accounts payable",
        });
    }
    if needs_agency_routing {
        Ok(RequestStatus::AgencyAttention)
    } else {
        Ok(RequestStatus::TripVerification)
    }
}

pub fn attend_travel_agency(current: RequestStatus) -> Result<RequestStatus, WorkflowError> {
    if current != RequestStatus::AgencyAttention {
        return Err(WorkflowError::InvalidState {
            status: current,
            action: "attend the request as the travel agency",
        });
    }
    Ok(RequestStatus::TripVerification)
}

/// The applicant hands the submitted receipts over for validation. This is
/// strict: the request must be exactly in trip verification, there is no
/// implicit catch-up transition.
pub fn send_receipts_for_validation(
    current: RequestStatus,
) -> Result<RequestStatus, WorkflowError> {
    if current != RequestStatus::TripVerification {
        return Err(WorkflowError::InvalidState {
            status: current,
            action: "send receipts for validation",
        });
    }
    Ok(RequestStatus::ReceiptValidation)
}

/// Cancellation is allowed until the travel agency boundary. Cancelling an
/// already-cancelled request is rejected rather than treated as a no-op.
pub fn cancel(current: RequestStatus) -> Result<RequestStatus, WorkflowError> {
    if current == RequestStatus::Cancelled {
        return Err(WorkflowError::InvalidState {
            status: current,
            action: "cancel an already cancelled request",
        });
    }
    if !CANCELLABLE.contains(&current) {
        return Err(WorkflowError::InvalidState {
            status: current,
            action: "cancel the request past the travel agency boundary",
        });
    }
    Ok(RequestStatus::Cancelled)
}

/// Maps the external approval flag to a verdict: 0 rejects, 1 approves.
pub fn decide_verdict(flag: i64) -> Result<ReceiptVerdict, WorkflowError> {
    ReceiptVerdict::from_approval_flag(flag).ok_or_else(|| {
        WorkflowError::BadRequest(format!(
            "invalid approval flag `{flag}` (only 0 or 1 accepted)"
        ))
    })
}
