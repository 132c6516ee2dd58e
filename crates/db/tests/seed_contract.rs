use tripflow_core::domain::request::RequestStatus;
use tripflow_core::domain::user::{Role, UserId};
use tripflow_db::migrations::run_pending;
use tripflow_db::repositories::{
    ReceiptRepository, RequestRepository, SqlReceiptRepository, SqlRequestRepository,
    SqlUserRepository, UserRepository,
};
use tripflow_db::{connect_with_settings, seed_demo_data, DbPool};

async fn seeded_pool() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    run_pending(&pool).await.expect("run migrations");
    seed_demo_data(&pool).await.expect("seed");
    pool
}

#[tokio::test]
async fn seed_creates_one_user_per_role() {
    let pool = seeded_pool().await;
    let users = SqlUserRepository::new(pool);

    let expected = [
        (1, Role::Applicant),
        (2, Role::TravelAgency),
        (3, Role::AccountsPayable),
        (4, Role::AuthorizerN1),
        (5, Role::AuthorizerN2),
        (6, Role::Admin),
    ];
    for (id, role) in expected {
        let found = users.find_role(UserId(id)).await.expect("find role");
        assert_eq!(found, Some(role), "seed user {id} should carry role {role:?}");
    }
}

#[tokio::test]
async fn seed_provides_receipt_types_and_a_submitted_demo_request() {
    let pool = seeded_pool().await;

    let receipts = SqlReceiptRepository::new(pool.clone());
    let types = receipts.list_types().await.expect("list types");
    assert_eq!(types.len(), 5);
    assert!(types.iter().any(|t| t.name == "Hotel"));

    let requests = SqlRequestRepository::new(pool);
    let submitted =
        requests.list_by_status(RequestStatus::FirstRevision).await.expect("list requests");
    assert_eq!(submitted.len(), 1);
    let demo = &submitted[0];
    assert_eq!(demo.owner, UserId(1));
    assert_eq!(demo.routes.len(), 2);
    assert!(demo.needs_agency_routing());
    assert!(demo.trip_days > 0);
}

#[tokio::test]
async fn seeding_twice_is_idempotent() {
    let pool = seeded_pool().await;
    let summary = seed_demo_data(&pool).await.expect("reseed");
    assert!(!summary.demo_request_created, "second seed must not duplicate the demo request");

    let requests = SqlRequestRepository::new(pool.clone());
    let submitted =
        requests.list_by_status(RequestStatus::FirstRevision).await.expect("list requests");
    assert_eq!(submitted.len(), 1);

    let receipts = SqlReceiptRepository::new(pool);
    assert_eq!(receipts.list_types().await.expect("list types").len(), 5);
}
