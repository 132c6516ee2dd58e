use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tripflow_core::domain::receipt::{NewReceipt, Receipt, ReceiptId, ReceiptVerdict};
use tripflow_core::domain::request::{RequestId, RequestStatus, TravelRequest};
use tripflow_core::domain::route::Route;
use tripflow_core::domain::user::{Role, User, UserId};
use tripflow_core::notify::TransitionNotice;
use tripflow_core::workflow::aggregation::RollupOutcome;

pub mod memory;
pub mod receipt;
pub mod request;
pub mod user;

pub use memory::InMemoryWorkflowStore;
pub use receipt::SqlReceiptRepository;
pub use request::SqlRequestRepository;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Request fields supplied on creation. Routes are stored in the same
/// transaction as the request row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewTravelRequest {
    pub owner: UserId,
    pub status: RequestStatus,
    pub notes: String,
    pub requested_fee: Decimal,
    pub trip_days: i64,
    pub routes: Vec<Route>,
}

/// Replacement content for an editable request. The stored route set is
/// dropped and reinserted wholesale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestRevision {
    pub notes: String,
    pub requested_fee: Decimal,
    pub trip_days: i64,
    pub routes: Vec<Route>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptTypeRow {
    pub id: i64,
    pub name: String,
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn create(&self, request: NewTravelRequest) -> Result<RequestId, RepositoryError>;

    async fn find(&self, id: RequestId) -> Result<Option<TravelRequest>, RepositoryError>;

    async fn find_status(&self, id: RequestId) -> Result<Option<RequestStatus>, RepositoryError>;

    /// Writes the new status only while the stored status still equals
    /// `expected`; returns whether a row changed. Guarded the same way as
    /// receipt verdicts so two reviewers racing on one request cannot both
    /// land their transition.
    async fn set_status_from(
        &self,
        id: RequestId,
        expected: RequestStatus,
        status: RequestStatus,
    ) -> Result<bool, RepositoryError>;

    /// Status write plus the imposed fee, with the same expected-status
    /// guard as `set_status_from`.
    async fn set_status_and_imposed_fee(
        &self,
        id: RequestId,
        expected: RequestStatus,
        status: RequestStatus,
        imposed_fee: Decimal,
    ) -> Result<bool, RepositoryError>;

    async fn revise(
        &self,
        id: RequestId,
        revision: RequestRevision,
    ) -> Result<(), RepositoryError>;

    async fn needs_agency_routing(&self, id: RequestId) -> Result<bool, RepositoryError>;

    /// Owner projection used to notify after a transition; `None` when the
    /// request does not exist.
    async fn notice_for(&self, id: RequestId)
        -> Result<Option<TransitionNotice>, RepositoryError>;

    async fn list_for_owner(&self, owner: UserId)
        -> Result<Vec<TravelRequest>, RepositoryError>;

    async fn list_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<TravelRequest>, RepositoryError>;
}

#[async_trait]
pub trait ReceiptRepository: Send + Sync {
    async fn insert_batch(&self, receipts: Vec<NewReceipt>) -> Result<(), RepositoryError>;

    async fn find(&self, id: ReceiptId) -> Result<Option<Receipt>, RepositoryError>;

    /// Applies the verdict only if the receipt is still pending; returns
    /// whether a row changed.
    async fn set_verdict_if_pending(
        &self,
        id: ReceiptId,
        verdict: ReceiptVerdict,
    ) -> Result<bool, RepositoryError>;

    async fn list_for_request(
        &self,
        request_id: RequestId,
    ) -> Result<Vec<Receipt>, RepositoryError>;

    /// Reads every verdict of the request and applies the resulting status
    /// change, if any, in the same transaction as the read.
    async fn rollup_and_apply(
        &self,
        request_id: RequestId,
    ) -> Result<RollupOutcome, RepositoryError>;

    /// Deletes the receipt only while it is still pending; returns whether a
    /// row was removed.
    async fn delete_if_pending(&self, id: ReceiptId) -> Result<bool, RepositoryError>;

    async fn list_types(&self) -> Result<Vec<ReceiptTypeRow>, RepositoryError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn find_role(&self, id: UserId) -> Result<Option<Role>, RepositoryError>;

    async fn upsert(&self, user: User) -> Result<(), RepositoryError>;
}
