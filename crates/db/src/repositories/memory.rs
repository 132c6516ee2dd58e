use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use tripflow_core::domain::receipt::{NewReceipt, Receipt, ReceiptId, ReceiptVerdict};
use tripflow_core::domain::request::{RequestId, RequestStatus, TravelRequest};
use tripflow_core::domain::user::{Role, User, UserId};
use tripflow_core::notify::TransitionNotice;
use tripflow_core::workflow::aggregation::{rollup, RollupOutcome};

use super::{
    NewTravelRequest, ReceiptRepository, ReceiptTypeRow, RepositoryError, RequestRepository,
    RequestRevision, UserRepository,
};

#[derive(Default)]
struct StoreState {
    users: HashMap<i64, User>,
    requests: HashMap<i64, TravelRequest>,
    receipts: HashMap<i64, Receipt>,
    receipt_types: HashMap<i64, String>,
    next_request_id: i64,
    next_receipt_id: i64,
}

/// One store backs all three repository traits so cross-entity operations
/// (rollup, notification projection) see consistent state, mirroring the
/// single database they stand in for.
#[derive(Default)]
pub struct InMemoryWorkflowStore {
    state: RwLock<StoreState>,
}

impl InMemoryWorkflowStore {
    pub async fn add_user(&self, user: User) {
        let mut state = self.state.write().await;
        state.users.insert(user.id.0, user);
    }

    pub async fn add_receipt_type(&self, id: i64, name: &str) {
        let mut state = self.state.write().await;
        state.receipt_types.insert(id, name.to_string());
    }
}

#[async_trait::async_trait]
impl RequestRepository for InMemoryWorkflowStore {
    async fn create(&self, request: NewTravelRequest) -> Result<RequestId, RepositoryError> {
        let mut state = self.state.write().await;
        state.next_request_id += 1;
        let id = RequestId(state.next_request_id);
        let now = Utc::now();

        state.requests.insert(
            id.0,
            TravelRequest {
                id,
                owner: request.owner,
                status: request.status,
                notes: request.notes,
                requested_fee: request.requested_fee,
                imposed_fee: Decimal::ZERO,
                trip_days: request.trip_days,
                routes: request.routes,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn find(&self, id: RequestId) -> Result<Option<TravelRequest>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.requests.get(&id.0).cloned())
    }

    async fn find_status(&self, id: RequestId) -> Result<Option<RequestStatus>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.requests.get(&id.0).map(|request| request.status))
    }

    async fn set_status_from(
        &self,
        id: RequestId,
        expected: RequestStatus,
        status: RequestStatus,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        match state.requests.get_mut(&id.0) {
            Some(request) if request.status == expected => {
                request.status = status;
                request.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_status_and_imposed_fee(
        &self,
        id: RequestId,
        expected: RequestStatus,
        status: RequestStatus,
        imposed_fee: Decimal,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        match state.requests.get_mut(&id.0) {
            Some(request) if request.status == expected => {
                request.status = status;
                request.imposed_fee = imposed_fee;
                request.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revise(
        &self,
        id: RequestId,
        revision: RequestRevision,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if let Some(request) = state.requests.get_mut(&id.0) {
            request.notes = revision.notes;
            request.requested_fee = revision.requested_fee;
            request.trip_days = revision.trip_days;
            request.routes = revision.routes;
            request.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn needs_agency_routing(&self, id: RequestId) -> Result<bool, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .requests
            .get(&id.0)
            .map(TravelRequest::needs_agency_routing)
            .unwrap_or(false))
    }

    async fn notice_for(
        &self,
        id: RequestId,
    ) -> Result<Option<TransitionNotice>, RepositoryError> {
        let state = self.state.read().await;
        let Some(request) = state.requests.get(&id.0) else {
            return Ok(None);
        };
        let Some(owner) = state.users.get(&request.owner.0) else {
            return Ok(None);
        };

        Ok(Some(TransitionNotice {
            email: owner.email.clone(),
            user_name: owner.name.clone(),
            request_id: id,
            status_label: request.status.label().to_string(),
        }))
    }

    async fn list_for_owner(
        &self,
        owner: UserId,
    ) -> Result<Vec<TravelRequest>, RepositoryError> {
        let state = self.state.read().await;
        let mut requests: Vec<TravelRequest> =
            state.requests.values().filter(|request| request.owner == owner).cloned().collect();
        requests.sort_by_key(|request| request.id.0);
        Ok(requests)
    }

    async fn list_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<TravelRequest>, RepositoryError> {
        let state = self.state.read().await;
        let mut requests: Vec<TravelRequest> =
            state.requests.values().filter(|request| request.status == status).cloned().collect();
        requests.sort_by_key(|request| request.id.0);
        Ok(requests)
    }
}

#[async_trait::async_trait]
impl ReceiptRepository for InMemoryWorkflowStore {
    async fn insert_batch(&self, receipts: Vec<NewReceipt>) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        for receipt in receipts {
            let type_name = state
                .receipt_types
                .get(&receipt.receipt_type_id)
                .cloned()
                .ok_or_else(|| {
                    RepositoryError::Decode(format!(
                        "unknown receipt type {}",
                        receipt.receipt_type_id
                    ))
                })?;
            state.next_receipt_id += 1;
            let id = ReceiptId(state.next_receipt_id);
            state.receipts.insert(
                id.0,
                Receipt {
                    id,
                    request_id: receipt.request_id,
                    receipt_type_id: receipt.receipt_type_id,
                    receipt_type_name: type_name,
                    amount: receipt.amount,
                    verdict: ReceiptVerdict::Pending,
                },
            );
        }
        Ok(())
    }

    async fn find(&self, id: ReceiptId) -> Result<Option<Receipt>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.receipts.get(&id.0).cloned())
    }

    async fn set_verdict_if_pending(
        &self,
        id: ReceiptId,
        verdict: ReceiptVerdict,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        match state.receipts.get_mut(&id.0) {
            Some(receipt) if receipt.verdict == ReceiptVerdict::Pending => {
                receipt.verdict = verdict;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_for_request(
        &self,
        request_id: RequestId,
    ) -> Result<Vec<Receipt>, RepositoryError> {
        let state = self.state.read().await;
        let mut receipts: Vec<Receipt> = state
            .receipts
            .values()
            .filter(|receipt| receipt.request_id == request_id)
            .cloned()
            .collect();
        receipts.sort_by_key(|receipt| receipt.id.0);
        Ok(receipts)
    }

    async fn rollup_and_apply(
        &self,
        request_id: RequestId,
    ) -> Result<RollupOutcome, RepositoryError> {
        let mut state = self.state.write().await;
        let verdicts: Vec<ReceiptVerdict> = state
            .receipts
            .values()
            .filter(|receipt| receipt.request_id == request_id)
            .map(|receipt| receipt.verdict)
            .collect();

        let outcome = rollup(&verdicts);
        if let Some(target) = outcome.target {
            if let Some(request) = state.requests.get_mut(&request_id.0) {
                request.status = target;
                request.updated_at = Utc::now();
            }
        }
        Ok(outcome)
    }

    async fn delete_if_pending(&self, id: ReceiptId) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        match state.receipts.get(&id.0) {
            Some(receipt) if receipt.verdict == ReceiptVerdict::Pending => {
                state.receipts.remove(&id.0);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_types(&self) -> Result<Vec<ReceiptTypeRow>, RepositoryError> {
        let state = self.state.read().await;
        let mut types: Vec<ReceiptTypeRow> = state
            .receipt_types
            .iter()
            .map(|(id, name)| ReceiptTypeRow { id: *id, name: name.clone() })
            .collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(types)
    }
}

#[async_trait::async_trait]
impl UserRepository for InMemoryWorkflowStore {
    async fn find(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.users.get(&id.0).cloned())
    }

    async fn find_role(&self, id: UserId) -> Result<Option<Role>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.users.get(&id.0).map(|user| user.role))
    }

    async fn upsert(&self, user: User) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.users.insert(user.id.0, user);
        Ok(())
    }
}
