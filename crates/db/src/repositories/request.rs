use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Row, Sqlite, Transaction};

use tripflow_core::domain::request::{RequestId, RequestStatus, TravelRequest};
use tripflow_core::domain::route::Route;
use tripflow_core::domain::user::UserId;
use tripflow_core::notify::TransitionNotice;

use super::{NewTravelRequest, RepositoryError, RequestRepository, RequestRevision};
use crate::DbPool;

pub struct SqlRequestRepository {
    pool: DbPool,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_routes(&self, id: RequestId) -> Result<Vec<Route>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT r.router_index,
                    oc.name AS origin_country, oci.name AS origin_city,
                    dc.name AS destination_country, dci.name AS destination_city,
                    r.beginning_date, r.beginning_time, r.ending_date, r.ending_time,
                    r.plane_needed, r.hotel_needed
             FROM route r
             JOIN country oc ON oc.id = r.origin_country_id
             JOIN city oci ON oci.id = r.origin_city_id
             JOIN country dc ON dc.id = r.destination_country_id
             JOIN city dci ON dci.id = r.destination_city_id
             WHERE r.request_id = ?
             ORDER BY r.router_index",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_route).collect()
    }

    async fn load_request(
        &self,
        row: &sqlx::sqlite::SqliteRow,
    ) -> Result<TravelRequest, RepositoryError> {
        let id = RequestId(decode_i64(row, "id")?);
        let routes = self.load_routes(id).await?;
        row_to_request(row, routes)
    }
}

fn decode_i64(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<i64, RepositoryError> {
    row.try_get::<i64, _>(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn decode_string(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<String, RepositoryError> {
    row.try_get::<String, _>(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn parse_status(code: i64) -> Result<RequestStatus, RepositoryError> {
    RequestStatus::from_code(code)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown request status code {code}")))
}

fn parse_decimal(raw: &str) -> Result<Decimal, RepositoryError> {
    raw.parse::<Decimal>()
        .map_err(|e| RepositoryError::Decode(format!("invalid decimal `{raw}`: {e}")))
}

fn parse_date(raw: &str) -> Result<NaiveDate, RepositoryError> {
    raw.parse::<NaiveDate>().map_err(|e| RepositoryError::Decode(format!("invalid date: {e}")))
}

fn parse_time(raw: &str) -> Result<NaiveTime, RepositoryError> {
    raw.parse::<NaiveTime>().map_err(|e| RepositoryError::Decode(format!("invalid time: {e}")))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid timestamp: {e}")))
}

fn row_to_route(row: &sqlx::sqlite::SqliteRow) -> Result<Route, RepositoryError> {
    Ok(Route {
        router_index: decode_i64(row, "router_index")?,
        origin_country: decode_string(row, "origin_country")?,
        origin_city: decode_string(row, "origin_city")?,
        destination_country: decode_string(row, "destination_country")?,
        destination_city: decode_string(row, "destination_city")?,
        beginning_date: parse_date(&decode_string(row, "beginning_date")?)?,
        beginning_time: parse_time(&decode_string(row, "beginning_time")?)?,
        ending_date: parse_date(&decode_string(row, "ending_date")?)?,
        ending_time: parse_time(&decode_string(row, "ending_time")?)?,
        plane_needed: decode_i64(row, "plane_needed")? != 0,
        hotel_needed: decode_i64(row, "hotel_needed")? != 0,
    })
}

fn row_to_request(
    row: &sqlx::sqlite::SqliteRow,
    routes: Vec<Route>,
) -> Result<TravelRequest, RepositoryError> {
    Ok(TravelRequest {
        id: RequestId(decode_i64(row, "id")?),
        owner: UserId(decode_i64(row, "owner_id")?),
        status: parse_status(decode_i64(row, "status_code")?)?,
        notes: decode_string(row, "notes")?,
        requested_fee: parse_decimal(&decode_string(row, "requested_fee")?)?,
        imposed_fee: parse_decimal(&decode_string(row, "imposed_fee")?)?,
        trip_days: decode_i64(row, "trip_days")?,
        routes,
        created_at: parse_timestamp(&decode_string(row, "created_at")?)?,
        updated_at: parse_timestamp(&decode_string(row, "updated_at")?)?,
    })
}

/// Looks up the place by name, inserting it when new. Routes reference
/// places by id so renames stay cheap; the lookup runs inside the caller's
/// transaction.
async fn country_id(tx: &mut Transaction<'_, Sqlite>, name: &str) -> Result<i64, RepositoryError> {
    let existing = sqlx::query("SELECT id FROM country WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut **tx)
        .await?;
    if let Some(row) = existing {
        return decode_i64(&row, "id");
    }

    let result =
        sqlx::query("INSERT INTO country (name) VALUES (?)").bind(name).execute(&mut **tx).await?;
    Ok(result.last_insert_rowid())
}

async fn city_id(
    tx: &mut Transaction<'_, Sqlite>,
    name: &str,
    country: i64,
) -> Result<i64, RepositoryError> {
    let existing = sqlx::query("SELECT id FROM city WHERE name = ? AND country_id = ?")
        .bind(name)
        .bind(country)
        .fetch_optional(&mut **tx)
        .await?;
    if let Some(row) = existing {
        return decode_i64(&row, "id");
    }

    let result = sqlx::query("INSERT INTO city (name, country_id) VALUES (?, ?)")
        .bind(name)
        .bind(country)
        .execute(&mut **tx)
        .await?;
    Ok(result.last_insert_rowid())
}

async fn insert_routes(
    tx: &mut Transaction<'_, Sqlite>,
    request_id: RequestId,
    routes: &[Route],
) -> Result<(), RepositoryError> {
    for route in routes {
        let origin_country = country_id(tx, &route.origin_country).await?;
        let origin_city = city_id(tx, &route.origin_city, origin_country).await?;
        let destination_country = country_id(tx, &route.destination_country).await?;
        let destination_city = city_id(tx, &route.destination_city, destination_country).await?;

        sqlx::query(
            "INSERT INTO route (request_id, router_index,
                                origin_country_id, origin_city_id,
                                destination_country_id, destination_city_id,
                                beginning_date, beginning_time, ending_date, ending_time,
                                plane_needed, hotel_needed)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(request_id.0)
        .bind(route.router_index)
        .bind(origin_country)
        .bind(origin_city)
        .bind(destination_country)
        .bind(destination_city)
        .bind(route.beginning_date.to_string())
        .bind(route.beginning_time.to_string())
        .bind(route.ending_date.to_string())
        .bind(route.ending_time.to_string())
        .bind(route.plane_needed as i64)
        .bind(route.hotel_needed as i64)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl RequestRepository for SqlRequestRepository {
    async fn create(&self, request: NewTravelRequest) -> Result<RequestId, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO request (owner_id, status_code, notes, requested_fee, imposed_fee,
                                  trip_days, created_at, updated_at)
             VALUES (?, ?, ?, ?, '0', ?, ?, ?)",
        )
        .bind(request.owner.0)
        .bind(request.status.code())
        .bind(&request.notes)
        .bind(request.requested_fee.to_string())
        .bind(request.trip_days)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let id = RequestId(result.last_insert_rowid());
        insert_routes(&mut tx, id, &request.routes).await?;

        tx.commit().await?;
        Ok(id)
    }

    async fn find(&self, id: RequestId) -> Result<Option<TravelRequest>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, owner_id, status_code, notes, requested_fee, imposed_fee,
                    trip_days, created_at, updated_at
             FROM request WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref row) => Ok(Some(self.load_request(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_status(&self, id: RequestId) -> Result<Option<RequestStatus>, RepositoryError> {
        let row = sqlx::query("SELECT status_code FROM request WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref row) => Ok(Some(parse_status(decode_i64(row, "status_code")?)?)),
            None => Ok(None),
        }
    }

    async fn set_status_from(
        &self,
        id: RequestId,
        expected: RequestStatus,
        status: RequestStatus,
    ) -> Result<bool, RepositoryError> {
        // Compare-and-swap: a transition validated against a stale read
        // must not land after the status has already moved.
        let result = sqlx::query(
            "UPDATE request SET status_code = ?, updated_at = ?
             WHERE id = ? AND status_code = ?",
        )
        .bind(status.code())
        .bind(Utc::now().to_rfc3339())
        .bind(id.0)
        .bind(expected.code())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_status_and_imposed_fee(
        &self,
        id: RequestId,
        expected: RequestStatus,
        status: RequestStatus,
        imposed_fee: Decimal,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE request SET status_code = ?, imposed_fee = ?, updated_at = ?
             WHERE id = ? AND status_code = ?",
        )
        .bind(status.code())
        .bind(imposed_fee.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(id.0)
        .bind(expected.code())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn revise(
        &self,
        id: RequestId,
        revision: RequestRevision,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE request SET notes = ?, requested_fee = ?, trip_days = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&revision.notes)
        .bind(revision.requested_fee.to_string())
        .bind(revision.trip_days)
        .bind(Utc::now().to_rfc3339())
        .bind(id.0)
        .execute(&mut *tx)
        .await?;

        // The route set is replaced wholesale rather than diffed.
        sqlx::query("DELETE FROM route WHERE request_id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        insert_routes(&mut tx, id, &revision.routes).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn needs_agency_routing(&self, id: RequestId) -> Result<bool, RepositoryError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM route
             WHERE request_id = ? AND (plane_needed = 1 OR hotel_needed = 1)",
        )
        .bind(id.0)
        .fetch_one(&self.pool)
        .await?;
        Ok(decode_i64(&row, "count")? > 0)
    }

    async fn notice_for(
        &self,
        id: RequestId,
    ) -> Result<Option<TransitionNotice>, RepositoryError> {
        let row = sqlx::query(
            "SELECT u.email, u.name, r.status_code
             FROM request r
             JOIN app_user u ON u.id = r.owner_id
             WHERE r.id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref row) => {
                let status = parse_status(decode_i64(row, "status_code")?)?;
                Ok(Some(TransitionNotice {
                    email: decode_string(row, "email")?,
                    user_name: decode_string(row, "name")?,
                    request_id: id,
                    status_label: status.label().to_string(),
                }))
            }
            None => Ok(None),
        }
    }

    async fn list_for_owner(
        &self,
        owner: UserId,
    ) -> Result<Vec<TravelRequest>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, owner_id, status_code, notes, requested_fee, imposed_fee,
                    trip_days, created_at, updated_at
             FROM request WHERE owner_id = ? ORDER BY id",
        )
        .bind(owner.0)
        .fetch_all(&self.pool)
        .await?;

        let mut requests = Vec::with_capacity(rows.len());
        for row in &rows {
            requests.push(self.load_request(row).await?);
        }
        Ok(requests)
    }

    async fn list_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<TravelRequest>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, owner_id, status_code, notes, requested_fee, imposed_fee,
                    trip_days, created_at, updated_at
             FROM request WHERE status_code = ? ORDER BY id",
        )
        .bind(status.code())
        .fetch_all(&self.pool)
        .await?;

        let mut requests = Vec::with_capacity(rows.len());
        for row in &rows {
            requests.push(self.load_request(row).await?);
        }
        Ok(requests)
    }
}
