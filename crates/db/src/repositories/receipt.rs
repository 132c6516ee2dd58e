use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::Row;

use tripflow_core::domain::receipt::{NewReceipt, Receipt, ReceiptId, ReceiptVerdict};
use tripflow_core::domain::request::RequestId;
use tripflow_core::workflow::aggregation::{rollup, RollupOutcome};

use super::{ReceiptRepository, ReceiptTypeRow, RepositoryError};
use crate::DbPool;

pub struct SqlReceiptRepository {
    pool: DbPool,
}

impl SqlReceiptRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_i64(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<i64, RepositoryError> {
    row.try_get::<i64, _>(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn decode_string(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<String, RepositoryError> {
    row.try_get::<String, _>(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn parse_verdict(code: i64) -> Result<ReceiptVerdict, RepositoryError> {
    ReceiptVerdict::from_code(code)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown receipt verdict code {code}")))
}

fn row_to_receipt(row: &sqlx::sqlite::SqliteRow) -> Result<Receipt, RepositoryError> {
    let amount_raw = decode_string(row, "amount")?;
    Ok(Receipt {
        id: ReceiptId(decode_i64(row, "id")?),
        request_id: RequestId(decode_i64(row, "request_id")?),
        receipt_type_id: decode_i64(row, "receipt_type_id")?,
        receipt_type_name: decode_string(row, "receipt_type_name")?,
        amount: amount_raw
            .parse::<Decimal>()
            .map_err(|e| RepositoryError::Decode(format!("invalid amount `{amount_raw}`: {e}")))?,
        verdict: parse_verdict(decode_i64(row, "verdict_code")?)?,
    })
}

#[async_trait::async_trait]
impl ReceiptRepository for SqlReceiptRepository {
    async fn insert_batch(&self, receipts: Vec<NewReceipt>) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for receipt in &receipts {
            sqlx::query(
                "INSERT INTO receipt (request_id, receipt_type_id, amount, verdict_code)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(receipt.request_id.0)
            .bind(receipt.receipt_type_id)
            .bind(receipt.amount.to_string())
            .bind(ReceiptVerdict::Pending.code())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn find(&self, id: ReceiptId) -> Result<Option<Receipt>, RepositoryError> {
        let row = sqlx::query(
            "SELECT r.id, r.request_id, r.receipt_type_id, t.name AS receipt_type_name,
                    r.amount, r.verdict_code
             FROM receipt r
             JOIN receipt_type t ON t.id = r.receipt_type_id
             WHERE r.id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref row) => Ok(Some(row_to_receipt(row)?)),
            None => Ok(None),
        }
    }

    async fn set_verdict_if_pending(
        &self,
        id: ReceiptId,
        verdict: ReceiptVerdict,
    ) -> Result<bool, RepositoryError> {
        // Guarded update so a concurrent reviewer cannot flip a decided
        // receipt; losers see zero rows affected.
        let result = sqlx::query("UPDATE receipt SET verdict_code = ? WHERE id = ? AND verdict_code = ?")
            .bind(verdict.code())
            .bind(id.0)
            .bind(ReceiptVerdict::Pending.code())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_for_request(
        &self,
        request_id: RequestId,
    ) -> Result<Vec<Receipt>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT r.id, r.request_id, r.receipt_type_id, t.name AS receipt_type_name,
                    r.amount, r.verdict_code
             FROM receipt r
             JOIN receipt_type t ON t.id = r.receipt_type_id
             WHERE r.request_id = ?
             ORDER BY r.id",
        )
        .bind(request_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_receipt).collect()
    }

    async fn rollup_and_apply(
        &self,
        request_id: RequestId,
    ) -> Result<RollupOutcome, RepositoryError> {
        // Verdicts are read and the status written in one transaction so a
        // receipt decided mid-rollup cannot produce a stale final status.
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query("SELECT verdict_code FROM receipt WHERE request_id = ?")
            .bind(request_id.0)
            .fetch_all(&mut *tx)
            .await?;
        let verdicts = rows
            .iter()
            .map(|row| parse_verdict(decode_i64(row, "verdict_code")?))
            .collect::<Result<Vec<_>, _>>()?;

        let outcome = rollup(&verdicts);
        if let Some(target) = outcome.target {
            sqlx::query("UPDATE request SET status_code = ?, updated_at = ? WHERE id = ?")
                .bind(target.code())
                .bind(Utc::now().to_rfc3339())
                .bind(request_id.0)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn delete_if_pending(&self, id: ReceiptId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM receipt WHERE id = ? AND verdict_code = ?")
            .bind(id.0)
            .bind(ReceiptVerdict::Pending.code())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_types(&self) -> Result<Vec<ReceiptTypeRow>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name FROM receipt_type ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(ReceiptTypeRow { id: decode_i64(row, "id")?, name: decode_string(row, "name")? })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use tripflow_core::domain::receipt::{NewReceipt, ReceiptId, ReceiptVerdict};
    use tripflow_core::domain::request::{RequestId, RequestStatus};
    use tripflow_core::domain::user::{Role, User, UserId};

    use super::SqlReceiptRepository;
    use crate::migrations::run_pending;
    use crate::repositories::request::SqlRequestRepository;
    use crate::repositories::user::SqlUserRepository;
    use crate::repositories::{
        NewTravelRequest, ReceiptRepository, RequestRepository, UserRepository,
    };
    use crate::{connect_with_settings, DbPool};

    async fn seeded_request(pool: &DbPool, status: RequestStatus) -> RequestId {
        let users = SqlUserRepository::new(pool.clone());
        users
            .upsert(User {
                id: UserId(1),
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                role: Role::Applicant,
            })
            .await
            .expect("seed owner");

        let requests = SqlRequestRepository::new(pool.clone());
        requests
            .create(NewTravelRequest {
                owner: UserId(1),
                status,
                notes: String::new(),
                requested_fee: Decimal::ZERO,
                trip_days: 0,
                routes: vec![],
            })
            .await
            .expect("seed request")
    }

    async fn test_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");
        sqlx::query("INSERT INTO receipt_type (id, name) VALUES (1, 'Hotel'), (2, 'Meals')")
            .execute(&pool)
            .await
            .expect("seed receipt types");
        pool
    }

    #[tokio::test]
    async fn batch_insert_creates_pending_receipts() {
        let pool = test_pool().await;
        let request_id = seeded_request(&pool, RequestStatus::ReceiptValidation).await;
        let repo = SqlReceiptRepository::new(pool);

        repo.insert_batch(vec![
            NewReceipt { request_id, receipt_type_id: 1, amount: Decimal::new(9_950, 2) },
            NewReceipt { request_id, receipt_type_id: 2, amount: Decimal::new(1_200, 2) },
        ])
        .await
        .expect("insert batch");

        let receipts = repo.list_for_request(request_id).await.expect("list");
        assert_eq!(receipts.len(), 2);
        assert!(receipts.iter().all(|r| r.verdict == ReceiptVerdict::Pending));
        assert_eq!(receipts[0].receipt_type_name, "Hotel");
    }

    #[tokio::test]
    async fn verdict_update_is_guarded_against_double_decision() {
        let pool = test_pool().await;
        let request_id = seeded_request(&pool, RequestStatus::ReceiptValidation).await;
        let repo = SqlReceiptRepository::new(pool);

        repo.insert_batch(vec![NewReceipt {
            request_id,
            receipt_type_id: 1,
            amount: Decimal::new(9_950, 2),
        }])
        .await
        .expect("insert batch");
        let id = repo.list_for_request(request_id).await.expect("list")[0].id;

        assert!(repo.set_verdict_if_pending(id, ReceiptVerdict::Approved).await.expect("decide"));
        assert!(
            !repo.set_verdict_if_pending(id, ReceiptVerdict::Rejected).await.expect("re-decide"),
            "a decided receipt must not change verdict",
        );

        let receipt = repo.find(id).await.expect("find").expect("receipt exists");
        assert_eq!(receipt.verdict, ReceiptVerdict::Approved);
    }

    #[tokio::test]
    async fn rollup_moves_rejected_sets_back_to_verification() {
        let pool = test_pool().await;
        let request_id = seeded_request(&pool, RequestStatus::ReceiptValidation).await;
        let requests = SqlRequestRepository::new(pool.clone());
        let repo = SqlReceiptRepository::new(pool);

        repo.insert_batch(vec![
            NewReceipt { request_id, receipt_type_id: 1, amount: Decimal::new(9_950, 2) },
            NewReceipt { request_id, receipt_type_id: 2, amount: Decimal::new(1_200, 2) },
        ])
        .await
        .expect("insert batch");
        let receipts = repo.list_for_request(request_id).await.expect("list");
        repo.set_verdict_if_pending(receipts[0].id, ReceiptVerdict::Approved)
            .await
            .expect("decide");
        repo.set_verdict_if_pending(receipts[1].id, ReceiptVerdict::Rejected)
            .await
            .expect("decide");

        let outcome = repo.rollup_and_apply(request_id).await.expect("rollup");
        assert_eq!(outcome.target, Some(RequestStatus::TripVerification));

        let status = requests.find_status(request_id).await.expect("status");
        assert_eq!(status, Some(RequestStatus::TripVerification));
    }

    #[tokio::test]
    async fn rollup_finalizes_fully_approved_sets() {
        let pool = test_pool().await;
        let request_id = seeded_request(&pool, RequestStatus::ReceiptValidation).await;
        let requests = SqlRequestRepository::new(pool.clone());
        let repo = SqlReceiptRepository::new(pool);

        repo.insert_batch(vec![NewReceipt {
            request_id,
            receipt_type_id: 1,
            amount: Decimal::new(9_950, 2),
        }])
        .await
        .expect("insert batch");
        let id = repo.list_for_request(request_id).await.expect("list")[0].id;
        repo.set_verdict_if_pending(id, ReceiptVerdict::Approved).await.expect("decide");

        let outcome = repo.rollup_and_apply(request_id).await.expect("rollup");
        assert_eq!(outcome.target, Some(RequestStatus::Finalized));

        let status = requests.find_status(request_id).await.expect("status");
        assert_eq!(status, Some(RequestStatus::Finalized));
    }

    #[tokio::test]
    async fn rollup_with_no_receipts_changes_nothing() {
        let pool = test_pool().await;
        let request_id = seeded_request(&pool, RequestStatus::ReceiptValidation).await;
        let requests = SqlRequestRepository::new(pool.clone());
        let repo = SqlReceiptRepository::new(pool);

        let outcome = repo.rollup_and_apply(request_id).await.expect("rollup");
        assert_eq!(outcome.target, None);

        let status = requests.find_status(request_id).await.expect("status");
        assert_eq!(status, Some(RequestStatus::ReceiptValidation));
    }

    #[tokio::test]
    async fn only_pending_receipts_can_be_deleted() {
        let pool = test_pool().await;
        let request_id = seeded_request(&pool, RequestStatus::ReceiptValidation).await;
        let repo = SqlReceiptRepository::new(pool);

        repo.insert_batch(vec![NewReceipt {
            request_id,
            receipt_type_id: 1,
            amount: Decimal::new(9_950, 2),
        }])
        .await
        .expect("insert batch");
        let id = repo.list_for_request(request_id).await.expect("list")[0].id;
        repo.set_verdict_if_pending(id, ReceiptVerdict::Approved).await.expect("decide");

        assert!(!repo.delete_if_pending(id).await.expect("delete decided"));
        assert!(!repo.delete_if_pending(ReceiptId(999)).await.expect("delete missing"));
        assert_eq!(repo.list_for_request(request_id).await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn receipt_types_list_alphabetically() {
        let pool = test_pool().await;
        let repo = SqlReceiptRepository::new(pool);

        let types = repo.list_types().await.expect("list types");
        let names: Vec<&str> = types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Hotel", "Meals"]);
    }
}
