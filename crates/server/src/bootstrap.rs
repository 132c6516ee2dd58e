use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use tripflow_core::config::{AppConfig, ConfigError, LoadOptions};
use tripflow_db::repositories::{SqlReceiptRepository, SqlRequestRepository, SqlUserRepository};
use tripflow_db::{connect, migrations, DbPool};

use crate::notifier;
use crate::workflow::WorkflowService;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub workflow: Arc<WorkflowService>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let workflow = Arc::new(WorkflowService::new(
        Arc::new(SqlRequestRepository::new(db_pool.clone())),
        Arc::new(SqlReceiptRepository::new(db_pool.clone())),
        Arc::new(SqlUserRepository::new(db_pool.clone())),
        notifier::from_config(&config.notifier),
    ));

    Ok(Application { config, db_pool, workflow })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use tripflow_core::config::{ConfigOverrides, LoadOptions};
    use tripflow_core::domain::request::RequestStatus;
    use tripflow_core::domain::user::UserId;
    use tripflow_core::itinerary::RouteInput;
    use tripflow_db::seed_demo_data;

    use crate::bootstrap::bootstrap;
    use crate::workflow::RequestSubmission;

    fn memory_overrides() -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_exposes_the_schema() {
        let app = bootstrap(memory_overrides()).await.expect("bootstrap succeeds");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('app_user', 'request', 'route', 'receipt')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("baseline tables should exist after bootstrap");
        assert_eq!(table_count, 4, "bootstrap should expose the workflow tables");
    }

    #[tokio::test]
    async fn integration_smoke_covers_startup_seed_and_submission() {
        let app = bootstrap(memory_overrides()).await.expect("bootstrap succeeds");
        seed_demo_data(&app.db_pool).await.expect("seed demo data");

        let id = app
            .workflow
            .submit_request(
                UserId(1),
                RequestSubmission {
                    notes: "smoke".to_string(),
                    requested_fee: Decimal::new(10_000, 2),
                    main_route: RouteInput::default(),
                    additional_routes: vec![],
                },
            )
            .await
            .expect("seeded applicant can submit");

        let queue = app.workflow.review_queue(UserId(4)).await.expect("n1 queue");
        assert!(
            queue.iter().any(|request| request.id == id),
            "submitted request should land in the first-revision queue",
        );
    }
}
