use async_trait::async_trait;
use sqlx::PgPool;

use super::{lock_exclusive, next_id};
use crate::error::AppResult;
use crate::hoods::{duplicate_number, Hood, HoodDraft, HoodRepository};

#[derive(sqlx::FromRow)]
struct HoodRow {
    id: i64,
    hood_number: i64,
    room: String,
}

impl From<HoodRow> for Hood {
    fn from(row: HoodRow) -> Self {
        Self {
            id: row.id,
            hood_number: row.hood_number,
            room: row.room,
        }
    }
}

pub struct PgHoodRepository {
    pool: PgPool,
}

impl PgHoodRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HoodRepository for PgHoodRepository {
    async fn find_by_number(&self, hood_number: i64) -> AppResult<Option<Hood>> {
        let row = sqlx::query_as::<_, HoodRow>(
            "SELECT id, hood_number, room FROM hoods WHERE hood_number = $1",
        )
        .bind(hood_number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Hood::from))
    }

    async fn list_all(&self) -> AppResult<Vec<Hood>> {
        let rows = sqlx::query_as::<_, HoodRow>("SELECT id, hood_number, room FROM hoods ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Hood::from).collect())
    }

    async fn create(&self, hood: HoodDraft) -> AppResult<Hood> {
        let mut tx = self.pool.begin().await?;
        lock_exclusive(&mut tx, "hoods").await?;

        let taken: Option<i64> = sqlx::query_scalar("SELECT id FROM hoods WHERE hood_number = $1")
            .bind(hood.hood_number)
            .fetch_optional(&mut *tx)
            .await?;
        if taken.is_some() {
            return Err(duplicate_number(hood.hood_number));
        }

        let hood = hood.with_id(next_id(&mut tx, "hoods").await?);
        sqlx::query("INSERT INTO hoods (id, hood_number, room) VALUES ($1, $2, $3)")
            .bind(hood.id)
            .bind(hood.hood_number)
            .bind(&hood.room)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(hood)
    }
}
