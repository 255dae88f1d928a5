use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{lock_exclusive, next_id};
use crate::bookings::{find_conflict, Booking, BookingRepository, NewBooking};
use crate::error::{AppError, AppResult};

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: i64,
    user_name: String,
    hood_number: i64,
    booking_time: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Self {
            id: row.id,
            user_name: row.user_name,
            hood_number: row.hood_number,
            booking_time: row.booking_time,
        }
    }
}

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn list_all(&self) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT id, user_name, hood_number, booking_time FROM bookings ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn create(&self, booking: NewBooking) -> AppResult<Booking> {
        let mut tx = self.pool.begin().await?;
        lock_exclusive(&mut tx, "bookings").await?;

        // Only rows at the same instant touching the same user or hood can clash.
        let same_instant: Vec<Booking> = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT id, user_name, hood_number, booking_time
            FROM bookings
            WHERE booking_time = $1
              AND (user_name = $2 OR hood_number = $3)
            ORDER BY id
            "#,
        )
        .bind(booking.booking_time)
        .bind(&booking.user_name)
        .bind(booking.hood_number)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(Booking::from)
        .collect();

        if let Some(conflict) = find_conflict(&same_instant, &booking) {
            return Err(AppError::Conflict(conflict));
        }

        let booking = booking.with_id(next_id(&mut tx, "bookings").await?);
        sqlx::query(
            r#"
            INSERT INTO bookings (id, user_name, hood_number, booking_time)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(booking.id)
        .bind(&booking.user_name)
        .bind(booking.hood_number)
        .bind(booking.booking_time)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(booking)
    }
}
