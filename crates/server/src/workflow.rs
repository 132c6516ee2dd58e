//! Application service for the travel-request lifecycle.
//!
//! Every operation resolves the acting user's role, re-reads the current
//! request state, applies the pure transition guard, and only then writes.
//! Successful request mutations fire one best-effort notification to the
//! request owner; a notifier failure is logged and never fails the call.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use tripflow_core::domain::receipt::{NewReceipt, Receipt, ReceiptId, ReceiptVerdict};
use tripflow_core::domain::request::{RequestId, RequestStatus, TravelRequest};
use tripflow_core::domain::user::{Role, UserId};
use tripflow_core::errors::WorkflowError;
use tripflow_core::itinerary::{assemble_routes, trip_days, RouteInput};
use tripflow_core::notify::Notifier;
use tripflow_core::workflow::aggregation::{
    display_status, sort_for_triage, ExpenseDisplayStatus, RollupOutcome,
};
use tripflow_core::workflow::transitions;
use tripflow_db::repositories::{
    NewTravelRequest, ReceiptRepository, RepositoryError, RequestRepository, RequestRevision,
    UserRepository,
};

/// Caller payload for creating or editing a request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestSubmission {
    pub notes: String,
    pub requested_fee: Decimal,
    pub main_route: RouteInput,
    pub additional_routes: Vec<RouteInput>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReceiptBatchItem {
    pub receipt_type_id: i64,
    pub amount: Decimal,
}

/// Accounts-payable read model: receipts ordered for triage plus the
/// any-pending summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpenseValidationView {
    pub receipts: Vec<Receipt>,
    pub display_status: ExpenseDisplayStatus,
}

/// Owner-facing listing, split on terminal status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OwnerRequests {
    pub active: Vec<TravelRequest>,
    pub completed: Vec<TravelRequest>,
}

pub struct WorkflowService {
    requests: Arc<dyn RequestRepository>,
    receipts: Arc<dyn ReceiptRepository>,
    users: Arc<dyn UserRepository>,
    notifier: Arc<dyn Notifier>,
}

fn internal(error: RepositoryError) -> WorkflowError {
    WorkflowError::Internal(error.to_string())
}

impl WorkflowService {
    pub fn new(
        requests: Arc<dyn RequestRepository>,
        receipts: Arc<dyn ReceiptRepository>,
        users: Arc<dyn UserRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { requests, receipts, users, notifier }
    }

    async fn role_of(&self, actor: UserId) -> Result<Role, WorkflowError> {
        self.users
            .find_role(actor)
            .await
            .map_err(internal)?
            .ok_or(WorkflowError::NotFound { entity: "user", id: actor.0 })
    }

    async fn request(&self, id: RequestId) -> Result<TravelRequest, WorkflowError> {
        self.requests
            .find(id)
            .await
            .map_err(internal)?
            .ok_or(WorkflowError::NotFound { entity: "request", id: id.0 })
    }

    async fn status_of(&self, id: RequestId) -> Result<RequestStatus, WorkflowError> {
        self.requests
            .find_status(id)
            .await
            .map_err(internal)?
            .ok_or(WorkflowError::NotFound { entity: "request", id: id.0 })
    }

    async fn owned_request(
        &self,
        actor: UserId,
        id: RequestId,
        action: &'static str,
    ) -> Result<TravelRequest, WorkflowError> {
        let request = self.request(id).await?;
        if request.owner != actor {
            let role = self.role_of(actor).await?;
            return Err(WorkflowError::Forbidden { role, action });
        }
        Ok(request)
    }

    /// Guarded status write: the transition lands only if the stored status
    /// still matches the one the guard validated. A stale read surfaces as
    /// InvalidState carrying the status that won.
    async fn transition(
        &self,
        id: RequestId,
        expected: RequestStatus,
        target: RequestStatus,
        action: &'static str,
    ) -> Result<(), WorkflowError> {
        let changed =
            self.requests.set_status_from(id, expected, target).await.map_err(internal)?;
        if !changed {
            let status = self.status_of(id).await?;
            return Err(WorkflowError::InvalidState { status, action });
        }
        Ok(())
    }

    /// Best effort: refresh the owner projection and hand it to the
    /// notifier. Failures are logged at warn and swallowed.
    async fn notify_transition(&self, correlation_id: &str, id: RequestId) {
        let notice = match self.requests.notice_for(id).await {
            Ok(Some(notice)) => notice,
            Ok(None) => return,
            Err(error) => {
                warn!(
                    event_name = "workflow.notify.projection_failed",
                    correlation_id = %correlation_id,
                    request_id = %id,
                    error = %error,
                    "could not build transition notice"
                );
                return;
            }
        };

        if let Err(error) = self.notifier.notify(&notice).await {
            warn!(
                event_name = "workflow.notify.delivery_failed",
                correlation_id = %correlation_id,
                request_id = %id,
                error = %error,
                "transition notification was not delivered"
            );
        }
    }

    /// Creates and submits a request in one step; the initial review status
    /// depends on the creator's role.
    pub async fn submit_request(
        &self,
        actor: UserId,
        submission: RequestSubmission,
    ) -> Result<RequestId, WorkflowError> {
        let correlation_id = Uuid::new_v4().to_string();
        let role = self.role_of(actor).await?;
        let status = transitions::submission_status(role)?;

        let routes = assemble_routes(submission.main_route, submission.additional_routes);
        let days = trip_days(&routes);
        let id = self
            .requests
            .create(NewTravelRequest {
                owner: actor,
                status,
                notes: submission.notes,
                requested_fee: submission.requested_fee,
                trip_days: days,
                routes,
            })
            .await
            .map_err(internal)?;

        info!(
            event_name = "workflow.request.submitted",
            correlation_id = %correlation_id,
            request_id = %id,
            actor_id = actor.0,
            status = status.label(),
            trip_days = days,
            "travel request submitted"
        );
        self.notify_transition(&correlation_id, id).await;
        Ok(id)
    }

    /// Saves a half-filled request as an Open draft. Only roles that could
    /// submit may draft; missing route fields take placeholders.
    pub async fn create_draft(
        &self,
        actor: UserId,
        submission: RequestSubmission,
    ) -> Result<RequestId, WorkflowError> {
        let correlation_id = Uuid::new_v4().to_string();
        let role = self.role_of(actor).await?;
        transitions::submission_status(role)?;

        let routes = assemble_routes(submission.main_route, submission.additional_routes);
        let days = trip_days(&routes);
        let id = self
            .requests
            .create(NewTravelRequest {
                owner: actor,
                status: RequestStatus::Open,
                notes: submission.notes,
                requested_fee: submission.requested_fee,
                trip_days: days,
                routes,
            })
            .await
            .map_err(internal)?;

        info!(
            event_name = "workflow.request.draft_created",
            correlation_id = %correlation_id,
            request_id = %id,
            actor_id = actor.0,
            "travel request draft saved"
        );
        Ok(id)
    }

    /// Replaces the request content while it is still under review; the
    /// stored route set is swapped wholesale and trip days recomputed.
    pub async fn edit_request(
        &self,
        actor: UserId,
        id: RequestId,
        submission: RequestSubmission,
    ) -> Result<(), WorkflowError> {
        let correlation_id = Uuid::new_v4().to_string();
        let request = self.owned_request(actor, id, "edit the request").await?;
        if !matches!(
            request.status,
            RequestStatus::Open | RequestStatus::FirstRevision | RequestStatus::SecondRevision
        ) {
            return Err(WorkflowError::InvalidState {
                status: request.status,
                action: "edit the request",
            });
        }

        let routes = assemble_routes(submission.main_route, submission.additional_routes);
        let days = trip_days(&routes);
        self.requests
            .revise(
                id,
                RequestRevision {
                    notes: submission.notes,
                    requested_fee: submission.requested_fee,
                    trip_days: days,
                    routes,
                },
            )
            .await
            .map_err(internal)?;

        info!(
            event_name = "workflow.request.edited",
            correlation_id = %correlation_id,
            request_id = %id,
            actor_id = actor.0,
            trip_days = days,
            "travel request content replaced"
        );
        Ok(())
    }

    /// Submits an Open draft using the creator-role mapping.
    pub async fn confirm_draft(
        &self,
        actor: UserId,
        id: RequestId,
    ) -> Result<RequestStatus, WorkflowError> {
        let correlation_id = Uuid::new_v4().to_string();
        let request = self.owned_request(actor, id, "confirm the draft").await?;
        let role = self.role_of(actor).await?;
        let target = transitions::confirm_draft(request.status, role)?;

        self.transition(id, request.status, target, "confirm the draft").await?;
        info!(
            event_name = "workflow.request.draft_confirmed",
            correlation_id = %correlation_id,
            request_id = %id,
            actor_id = actor.0,
            status = target.label(),
            "draft submitted for review"
        );
        self.notify_transition(&correlation_id, id).await;
        Ok(target)
    }

    pub async fn authorize(
        &self,
        actor: UserId,
        id: RequestId,
    ) -> Result<RequestStatus, WorkflowError> {
        let correlation_id = Uuid::new_v4().to_string();
        let role = self.role_of(actor).await?;
        let current = self.status_of(id).await?;
        let target = transitions::authorize(current, role)?;

        self.transition(id, current, target, "authorize the request").await?;
        info!(
            event_name = "workflow.request.authorized",
            correlation_id = %correlation_id,
            request_id = %id,
            actor_id = actor.0,
            status = target.label(),
            "travel request authorized"
        );
        self.notify_transition(&correlation_id, id).await;
        Ok(target)
    }

    pub async fn decline(
        &self,
        actor: UserId,
        id: RequestId,
    ) -> Result<RequestStatus, WorkflowError> {
        let correlation_id = Uuid::new_v4().to_string();
        let role = self.role_of(actor).await?;
        let current = self.status_of(id).await?;
        let target = transitions::decline(current, role)?;

        self.transition(id, current, target, "decline the request").await?;
        info!(
            event_name = "workflow.request.declined",
            correlation_id = %correlation_id,
            request_id = %id,
            actor_id = actor.0,
            "travel request declined"
        );
        self.notify_transition(&correlation_id, id).await;
        Ok(target)
    }

    /// Accounts payable attends a quoted request, recording the imposed fee
    /// and routing it either to the travel agency or straight to trip
    /// verification.
    pub async fn attend_accounts_payable(
        &self,
        actor: UserId,
        id: RequestId,
        imposed_fee: Decimal,
    ) -> Result<RequestStatus, WorkflowError> {
        let correlation_id = Uuid::new_v4().to_string();
        let role = self.role_of(actor).await?;
        if role != Role::AccountsPayable {
            return Err(WorkflowError::Forbidden {
                role,
                action: "attend the request as accounts payable",
            });
        }

        let current = self.status_of(id).await?;
        let needs_agency = self.requests.needs_agency_routing(id).await.map_err(internal)?;
        let target = transitions::attend_accounts_payable(current, needs_agency)?;

        let changed = self
            .requests
            .set_status_and_imposed_fee(id, current, target, imposed_fee)
            .await
            .map_err(internal)?;
        if !changed {
            let status = self.status_of(id).await?;
            return Err(WorkflowError::InvalidState {
                status,
                action: "attend the request as accounts payable",
            });
        }
        info!(
            event_name = "workflow.request.accounts_payable_attended",
            correlation_id = %correlation_id,
            request_id = %id,
            actor_id = actor.0,
            status = target.label(),
            imposed_fee = %imposed_fee,
            "accounts payable attended the request"
        );
        self.notify_transition(&correlation_id, id).await;
        Ok(target)
    }

    pub async fn attend_travel_agency(
        &self,
        actor: UserId,
        id: RequestId,
    ) -> Result<RequestStatus, WorkflowError> {
        let correlation_id = Uuid::new_v4().to_string();
        let role = self.role_of(actor).await?;
        if role != Role::TravelAgency {
            return Err(WorkflowError::Forbidden {
                role,
                action: "attend the request as the travel agency",
            });
        }

        let current = self.status_of(id).await?;
        let target = transitions::attend_travel_agency(current)?;

        self.transition(id, current, target, "attend the request as the travel agency").await?;
        info!(
            event_name = "workflow.request.agency_attended",
            correlation_id = %correlation_id,
            request_id = %id,
            actor_id = actor.0,
            "travel agency attended the request"
        );
        self.notify_transition(&correlation_id, id).await;
        Ok(target)
    }

    /// Attaches a batch of pending receipts while the trip is being
    /// verified.
    pub async fn add_receipt_batch(
        &self,
        actor: UserId,
        id: RequestId,
        items: Vec<ReceiptBatchItem>,
    ) -> Result<(), WorkflowError> {
        let correlation_id = Uuid::new_v4().to_string();
        if items.is_empty() {
            return Err(WorkflowError::BadRequest("receipt batch is empty".to_string()));
        }
        if let Some(item) = items.iter().find(|item| item.amount.is_sign_negative()) {
            return Err(WorkflowError::BadRequest(format!(
                "receipt amount {} is negative",
                item.amount
            )));
        }

        let request = self.owned_request(actor, id, "attach receipts").await?;
        if request.status != RequestStatus::TripVerification {
            return Err(WorkflowError::InvalidState {
                status: request.status,
                action: "attach receipts",
            });
        }

        let count = items.len();
        let receipts = items
            .into_iter()
            .map(|item| NewReceipt {
                request_id: id,
                receipt_type_id: item.receipt_type_id,
                amount: item.amount,
            })
            .collect();
        self.receipts.insert_batch(receipts).await.map_err(internal)?;

        info!(
            event_name = "workflow.receipt.batch_added",
            correlation_id = %correlation_id,
            request_id = %id,
            actor_id = actor.0,
            count,
            "receipt batch attached"
        );
        Ok(())
    }

    /// Hands the attached receipts over for validation. Strict: the request
    /// must be exactly in trip verification.
    pub async fn send_receipts_for_validation(
        &self,
        actor: UserId,
        id: RequestId,
    ) -> Result<RequestStatus, WorkflowError> {
        let correlation_id = Uuid::new_v4().to_string();
        let request = self.owned_request(actor, id, "send receipts for validation").await?;
        let target = transitions::send_receipts_for_validation(request.status)?;

        self.transition(id, request.status, target, "send receipts for validation").await?;
        info!(
            event_name = "workflow.request.receipts_sent",
            correlation_id = %correlation_id,
            request_id = %id,
            actor_id = actor.0,
            "receipts handed over for validation"
        );
        self.notify_transition(&correlation_id, id).await;
        Ok(target)
    }

    /// Decides one receipt. Flag 0 rejects, 1 approves; a receipt is decided
    /// exactly once.
    pub async fn validate_receipt(
        &self,
        actor: UserId,
        receipt_id: ReceiptId,
        approval_flag: i64,
    ) -> Result<ReceiptVerdict, WorkflowError> {
        let correlation_id = Uuid::new_v4().to_string();
        let role = self.role_of(actor).await?;
        if role != Role::AccountsPayable {
            return Err(WorkflowError::Forbidden { role, action: "validate receipts" });
        }
        let verdict = transitions::decide_verdict(approval_flag)?;

        let receipt = self
            .receipts
            .find(receipt_id)
            .await
            .map_err(internal)?
            .ok_or(WorkflowError::NotFound { entity: "receipt", id: receipt_id.0 })?;
        let request_status = self.status_of(receipt.request_id).await?;
        if request_status != RequestStatus::ReceiptValidation {
            return Err(WorkflowError::InvalidState {
                status: request_status,
                action: "validate receipts",
            });
        }
        if receipt.verdict.is_decided() {
            return Err(WorkflowError::AlreadyDecided { receipt_id, verdict: receipt.verdict });
        }

        let changed =
            self.receipts.set_verdict_if_pending(receipt_id, verdict).await.map_err(internal)?;
        if !changed {
            // Lost the race against another reviewer; report what won.
            let current = self
                .receipts
                .find(receipt_id)
                .await
                .map_err(internal)?
                .map(|receipt| receipt.verdict)
                .unwrap_or(receipt.verdict);
            return Err(WorkflowError::AlreadyDecided { receipt_id, verdict: current });
        }

        info!(
            event_name = "workflow.receipt.decided",
            correlation_id = %correlation_id,
            request_id = %receipt.request_id,
            actor_id = actor.0,
            receipt_id = %receipt_id,
            verdict = verdict.label(),
            "receipt verdict recorded"
        );
        Ok(verdict)
    }

    /// Rolls up all verdicts of the request: any rejection bounces it back
    /// to trip verification, a non-empty fully approved set finalizes it,
    /// anything else leaves the status untouched.
    pub async fn validate_all_and_rollup(
        &self,
        actor: UserId,
        id: RequestId,
    ) -> Result<RollupOutcome, WorkflowError> {
        let correlation_id = Uuid::new_v4().to_string();
        let role = self.role_of(actor).await?;
        if role != Role::AccountsPayable {
            return Err(WorkflowError::Forbidden { role, action: "roll up receipt verdicts" });
        }
        let current = self.status_of(id).await?;
        if current != RequestStatus::ReceiptValidation {
            return Err(WorkflowError::InvalidState {
                status: current,
                action: "roll up receipt verdicts",
            });
        }

        let outcome = self.receipts.rollup_and_apply(id).await.map_err(internal)?;
        info!(
            event_name = "workflow.receipt.rollup",
            correlation_id = %correlation_id,
            request_id = %id,
            actor_id = actor.0,
            outcome = outcome.message,
            "receipt verdicts rolled up"
        );
        if outcome.target.is_some() {
            self.notify_transition(&correlation_id, id).await;
        }
        Ok(outcome)
    }

    /// Removes a receipt the owner attached by mistake; only possible while
    /// it is still pending and the receipts have not been handed over.
    pub async fn delete_receipt(
        &self,
        actor: UserId,
        receipt_id: ReceiptId,
    ) -> Result<(), WorkflowError> {
        let correlation_id = Uuid::new_v4().to_string();
        let receipt = self
            .receipts
            .find(receipt_id)
            .await
            .map_err(internal)?
            .ok_or(WorkflowError::NotFound { entity: "receipt", id: receipt_id.0 })?;
        let request = self.owned_request(actor, receipt.request_id, "delete the receipt").await?;
        if request.status != RequestStatus::TripVerification {
            return Err(WorkflowError::InvalidState {
                status: request.status,
                action: "delete the receipt",
            });
        }
        if receipt.verdict.is_decided() {
            return Err(WorkflowError::AlreadyDecided { receipt_id, verdict: receipt.verdict });
        }

        let removed = self.receipts.delete_if_pending(receipt_id).await.map_err(internal)?;
        if !removed {
            let current = self
                .receipts
                .find(receipt_id)
                .await
                .map_err(internal)?
                .map(|receipt| receipt.verdict)
                .unwrap_or(receipt.verdict);
            return Err(WorkflowError::AlreadyDecided { receipt_id, verdict: current });
        }

        info!(
            event_name = "workflow.receipt.deleted",
            correlation_id = %correlation_id,
            request_id = %receipt.request_id,
            actor_id = actor.0,
            receipt_id = %receipt_id,
            "pending receipt removed"
        );
        Ok(())
    }

    pub async fn cancel(&self, actor: UserId, id: RequestId) -> Result<(), WorkflowError> {
        let correlation_id = Uuid::new_v4().to_string();
        let request = self.owned_request(actor, id, "cancel the request").await?;
        let target = transitions::cancel(request.status)?;

        self.transition(id, request.status, target, "cancel the request").await?;
        info!(
            event_name = "workflow.request.cancelled",
            correlation_id = %correlation_id,
            request_id = %id,
            actor_id = actor.0,
            "travel request cancelled"
        );
        self.notify_transition(&correlation_id, id).await;
        Ok(())
    }

    /// Read path for the accounts-payable screen: receipts in triage order
    /// plus the any-pending summary. Visible to the reviewer and the owner.
    pub async fn expense_validations(
        &self,
        actor: UserId,
        id: RequestId,
    ) -> Result<ExpenseValidationView, WorkflowError> {
        let request = self.request(id).await?;
        if request.owner != actor {
            let role = self.role_of(actor).await?;
            if role != Role::AccountsPayable {
                return Err(WorkflowError::Forbidden { role, action: "view expense validations" });
            }
        }

        let mut receipts = self.receipts.list_for_request(id).await.map_err(internal)?;
        let verdicts: Vec<ReceiptVerdict> =
            receipts.iter().map(|receipt| receipt.verdict).collect();
        sort_for_triage(&mut receipts);

        Ok(ExpenseValidationView { receipts, display_status: display_status(&verdicts) })
    }

    /// The owner's requests, split into still-moving and closed.
    pub async fn my_requests(&self, actor: UserId) -> Result<OwnerRequests, WorkflowError> {
        let all = self.requests.list_for_owner(actor).await.map_err(internal)?;
        let (completed, active) =
            all.into_iter().partition(|request| request.status.is_terminal());
        Ok(OwnerRequests { active, completed })
    }

    /// Work queue for the acting role: the statuses that role attends.
    pub async fn review_queue(&self, actor: UserId) -> Result<Vec<TravelRequest>, WorkflowError> {
        let role = self.role_of(actor).await?;
        let statuses: &[RequestStatus] = match role {
            Role::AuthorizerN1 => &[RequestStatus::FirstRevision],
            Role::AuthorizerN2 => &[RequestStatus::SecondRevision],
            Role::AccountsPayable => &[RequestStatus::Quote, RequestStatus::ReceiptValidation],
            Role::TravelAgency => &[RequestStatus::AgencyAttention],
            role => return Err(WorkflowError::Forbidden { role, action: "view a review queue" }),
        };

        let mut queue = Vec::new();
        for status in statuses {
            queue.extend(self.requests.list_by_status(*status).await.map_err(internal)?);
        }
        Ok(queue)
    }
}
