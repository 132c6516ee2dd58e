//! Demo dataset for local environments and end-to-end checks.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tripflow_core::domain::request::RequestStatus;
use tripflow_core::domain::route::Route;
use tripflow_core::domain::user::{Role, User, UserId};
use tripflow_core::itinerary;

use crate::connection::DbPool;
use crate::repositories::{
    NewTravelRequest, RepositoryError, RequestRepository, SqlRequestRepository, SqlUserRepository,
    UserRepository,
};

struct SeedUser {
    id: i64,
    name: &'static str,
    email: &'static str,
    role: Role,
}

/// One account per workflow role, so every screen of the flow can be
/// exercised right after seeding.
const SEED_USERS: &[SeedUser] = &[
    SeedUser { id: 1, name: "Ana Torres", email: "ana.torres@example.com", role: Role::Applicant },
    SeedUser {
        id: 2,
        name: "Viajes Centrales",
        email: "agency@example.com",
        role: Role::TravelAgency,
    },
    SeedUser {
        id: 3,
        name: "Pedro Lima",
        email: "pedro.lima@example.com",
        role: Role::AccountsPayable,
    },
    SeedUser {
        id: 4,
        name: "Nadia Kaur",
        email: "nadia.kaur@example.com",
        role: Role::AuthorizerN1,
    },
    SeedUser {
        id: 5,
        name: "Miguel Ortiz",
        email: "miguel.ortiz@example.com",
        role: Role::AuthorizerN2,
    },
    SeedUser { id: 6, name: "Root Admin", email: "admin@example.com", role: Role::Admin },
];

const SEED_RECEIPT_TYPES: &[&str] = &["Ground transport", "Hotel", "Meals", "Other", "Plane fare"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedSummary {
    pub users: usize,
    pub receipt_types: usize,
    pub demo_request_created: bool,
}

fn demo_routes() -> Vec<Route> {
    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d);
    let time = |h, m| NaiveTime::from_hms_opt(h, m, 0);

    vec![
        Route {
            router_index: 0,
            origin_country: "Mexico".to_string(),
            origin_city: "Monterrey".to_string(),
            destination_country: "Germany".to_string(),
            destination_city: "Berlin".to_string(),
            beginning_date: date(2026, 9, 7).unwrap_or_default(),
            beginning_time: time(9, 30).unwrap_or_default(),
            ending_date: date(2026, 9, 8).unwrap_or_default(),
            ending_time: time(11, 0).unwrap_or_default(),
            plane_needed: true,
            hotel_needed: true,
        },
        Route {
            router_index: 1,
            origin_country: "Germany".to_string(),
            origin_city: "Berlin".to_string(),
            destination_country: "Mexico".to_string(),
            destination_city: "Monterrey".to_string(),
            beginning_date: date(2026, 9, 12).unwrap_or_default(),
            beginning_time: time(14, 0).unwrap_or_default(),
            ending_date: date(2026, 9, 13).unwrap_or_default(),
            ending_time: time(6, 45).unwrap_or_default(),
            plane_needed: true,
            hotel_needed: false,
        },
    ]
}

/// Seeds the demo dataset. Safe to run repeatedly; users are upserted,
/// receipt types are inserted once, and the demo request is only created on
/// an empty request table.
pub async fn seed_demo_data(pool: &DbPool) -> Result<SeedSummary, RepositoryError> {
    let users = SqlUserRepository::new(pool.clone());
    for seed in SEED_USERS {
        users
            .upsert(User {
                id: UserId(seed.id),
                name: seed.name.to_string(),
                email: seed.email.to_string(),
                role: seed.role,
            })
            .await?;
    }

    for name in SEED_RECEIPT_TYPES {
        sqlx::query("INSERT OR IGNORE INTO receipt_type (name) VALUES (?)")
            .bind(name)
            .execute(pool)
            .await?;
    }

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM request").fetch_one(pool).await?;
    let demo_request_created = existing == 0;
    if demo_request_created {
        let routes = demo_routes();
        let trip_days = itinerary::trip_days(&routes);
        let requests = SqlRequestRepository::new(pool.clone());
        requests
            .create(NewTravelRequest {
                owner: UserId(1),
                status: RequestStatus::FirstRevision,
                notes: "Berlin partner onboarding".to_string(),
                requested_fee: Decimal::new(185_000, 2),
                trip_days,
                routes,
            })
            .await?;
    }

    Ok(SeedSummary {
        users: SEED_USERS.len(),
        receipt_types: SEED_RECEIPT_TYPES.len(),
        demo_request_created,
    })
}
