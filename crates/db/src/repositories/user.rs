use sqlx::Row;

use tripflow_core::domain::user::{Role, User, UserId};

use super::{RepositoryError, UserRepository};
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_role(code: i64) -> Result<Role, RepositoryError> {
    Role::from_code(code)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown role code {code}")))
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, RepositoryError> {
    let id = row.try_get::<i64, _>("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name =
        row.try_get::<String, _>("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let email =
        row.try_get::<String, _>("email").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let role_code =
        row.try_get::<i64, _>("role_code").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(User { id: UserId(id), name, email, role: parse_role(role_code)? })
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn find(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, email, role_code FROM app_user WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref row) => Ok(Some(row_to_user(row)?)),
            None => Ok(None),
        }
    }

    async fn find_role(&self, id: UserId) -> Result<Option<Role>, RepositoryError> {
        let row = sqlx::query("SELECT role_code FROM app_user WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref row) => {
                let code = row
                    .try_get::<i64, _>("role_code")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                Ok(Some(parse_role(code)?))
            }
            None => Ok(None),
        }
    }

    async fn upsert(&self, user: User) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO app_user (id, name, email, role_code)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 email = excluded.email,
                 role_code = excluded.role_code",
        )
        .bind(user.id.0)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.code())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tripflow_core::domain::user::{Role, User, UserId};

    use super::SqlUserRepository;
    use crate::migrations::run_pending;
    use crate::repositories::UserRepository;
    use crate::{connect_with_settings, DbPool};

    async fn test_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");
        pool
    }

    #[tokio::test]
    async fn upsert_then_find_round_trips_the_role() {
        let pool = test_pool().await;
        let repo = SqlUserRepository::new(pool);

        repo.upsert(User {
            id: UserId(4),
            name: "Nadia".to_string(),
            email: "nadia@example.com".to_string(),
            role: Role::AuthorizerN1,
        })
        .await
        .expect("upsert");

        let user = repo.find(UserId(4)).await.expect("find").expect("user exists");
        assert_eq!(user.role, Role::AuthorizerN1);
        assert_eq!(repo.find_role(UserId(4)).await.expect("role"), Some(Role::AuthorizerN1));
        assert_eq!(repo.find_role(UserId(99)).await.expect("role"), None);
    }

    #[tokio::test]
    async fn upsert_replaces_existing_fields() {
        let pool = test_pool().await;
        let repo = SqlUserRepository::new(pool);

        let mut user = User {
            id: UserId(4),
            name: "Nadia".to_string(),
            email: "nadia@example.com".to_string(),
            role: Role::AuthorizerN1,
        };
        repo.upsert(user.clone()).await.expect("insert");

        user.role = Role::AuthorizerN2;
        repo.upsert(user).await.expect("update");

        assert_eq!(repo.find_role(UserId(4)).await.expect("role"), Some(Role::AuthorizerN2));
    }
}
