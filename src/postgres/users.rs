use async_trait::async_trait;
use sqlx::PgPool;

use super::{lock_exclusive, next_id};
use crate::error::{AppError, AppResult};
use crate::users::{NewUser, User, UserRepository, UserUpdate};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    passhash: String,
    email: String,
    emergency_telephone: String,
    research_group: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.username,
            password_hash: row.passhash,
            email: row.email,
            emergency_telephone: row.emergency_telephone,
            research_group: row.research_group,
        }
    }
}

const SELECT_USER: &str =
    "SELECT id, username, passhash, email, emergency_telephone, research_group FROM users";

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{} WHERE id = $1", SELECT_USER))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{} WHERE username = $1", SELECT_USER))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn list_all(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!("{} ORDER BY id", SELECT_USER))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;
        lock_exclusive(&mut tx, "users").await?;

        let taken: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = $1")
            .bind(&user.name)
            .fetch_optional(&mut *tx)
            .await?;
        if taken.is_some() {
            return Err(AppError::Duplicate(format!(
                "a user named '{}' already exists",
                user.name
            )));
        }

        let user = user.with_id(next_id(&mut tx, "users").await?);
        sqlx::query(
            r#"
            INSERT INTO users (id, username, passhash, email, emergency_telephone, research_group)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(&user.emergency_telephone)
        .bind(&user.research_group)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    async fn update_with(&self, id: i64, update: UserUpdate) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;

        let mut user: User =
            sqlx::query_as::<_, UserRow>(&format!("{} WHERE id = $1 FOR UPDATE", SELECT_USER))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .map(User::from)
                .ok_or_else(|| AppError::NotFound(format!("user {} not found", id)))?;

        update.apply_to(&mut user)?;

        sqlx::query(
            r#"
            UPDATE users
            SET email = $2, emergency_telephone = $3, research_group = $4
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.emergency_telephone)
        .bind(&user.research_group)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user)
    }
}
