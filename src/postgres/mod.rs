//! # PostgreSQL Backend
//!
//! Durable implementations of the four store traits.
//!
//! Writers that assign ids or check for conflicts take an `EXCLUSIVE` lock on
//! their table for the length of the transaction. Readers are not blocked.

mod bookings;
mod hoods;
mod sessions;
mod users;

use std::sync::Arc;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres, Transaction};

use crate::config::DatabaseConfig;
use crate::error::AppResult;
use crate::service::Stores;

pub use bookings::PgBookingRepository;
pub use hoods::PgHoodRepository;
pub use sessions::PgSessionRepository;
pub use users::PgUserRepository;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id                  BIGINT PRIMARY KEY,
        username            TEXT NOT NULL UNIQUE,
        passhash            TEXT NOT NULL,
        email               TEXT NOT NULL,
        emergency_telephone TEXT NOT NULL,
        research_group      TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS hoods (
        id          BIGINT PRIMARY KEY,
        hood_number BIGINT NOT NULL UNIQUE,
        room        TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bookings (
        id           BIGINT PRIMARY KEY,
        user_name    TEXT NOT NULL,
        hood_number  BIGINT NOT NULL,
        booking_time TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS bookings_booking_time_idx ON bookings (booking_time)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS session_tokens (
        token_hash TEXT PRIMARY KEY,
        user_id    BIGINT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS session_tokens_user_id_idx ON session_tokens (user_id)
    "#,
];

fn make_pg_connect_options(cfg: &DatabaseConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&cfg.host)
        .port(cfg.port)
        .username(&cfg.username)
        .password(&cfg.password)
        .database(&cfg.dbname)
}

/// Shared connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Build a pool that connects on first use
    pub fn connect_lazy(cfg: &DatabaseConfig) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .connect_lazy_with(make_pg_connect_options(cfg));
        Self { pool }
    }

    /// Build a lazy pool from a `postgres://` URL
    pub fn connect_lazy_url(url: &str, max_connections: u32) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(url)?;
        Ok(Self { pool })
    }

    /// Create any missing tables and indexes
    pub async fn migrate(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!("database schema is up to date");
        Ok(())
    }

    pub fn stores(&self) -> Stores {
        Stores {
            users: Arc::new(PgUserRepository::new(self.pool.clone())),
            hoods: Arc::new(PgHoodRepository::new(self.pool.clone())),
            bookings: Arc::new(PgBookingRepository::new(self.pool.clone())),
            sessions: Arc::new(PgSessionRepository::new(self.pool.clone())),
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Serialize writers on `table` until the transaction ends
async fn lock_exclusive(tx: &mut Transaction<'_, Postgres>, table: &str) -> AppResult<()> {
    let statement = format!("LOCK TABLE {} IN EXCLUSIVE MODE", table);
    sqlx::query(&statement).execute(&mut **tx).await?;
    Ok(())
}

/// `max(id) + 1`, or 1 for an empty table; call with the table locked
async fn next_id(tx: &mut Transaction<'_, Postgres>, table: &str) -> AppResult<i64> {
    let statement = format!("SELECT COALESCE(MAX(id), 0) + 1 FROM {}", table);
    let id: i64 = sqlx::query_scalar(&statement).fetch_one(&mut **tx).await?;
    Ok(id)
}
