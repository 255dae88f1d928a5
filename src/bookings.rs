//! # Booking Ledger
//!
//! Append-only list of hood bookings. A booking is an exact instant, not a range.
//!
//! ## Invariants
//! - No two bookings share the same instant and the same hood.
//! - No two bookings share the same instant and the same user.
//! - The conflict scan and the append happen under one write lock (or one
//!   locked transaction), so two racing requests cannot both commit.

use std::fmt;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::next_id;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub user_name: String,
    pub hood_number: i64,
    pub booking_time: DateTime<Utc>,
}

/// Booking payload as decoded from the wire
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingRequest {
    #[serde(default, alias = "user")]
    pub user_name: Option<String>,

    #[serde(default, alias = "hood")]
    pub hood_number: Option<i64>,

    #[serde(default, alias = "timestamp")]
    pub booking_time: Option<DateTime<Utc>>,
}

/// A booking with every field present, not yet checked for conflicts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub user_name: String,
    pub hood_number: i64,
    pub booking_time: DateTime<Utc>,
}

impl BookingRequest {
    pub fn validate(self) -> AppResult<NewBooking> {
        let user_name = self
            .user_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        match (user_name, self.hood_number, self.booking_time) {
            (Some(user_name), Some(hood_number), Some(booking_time)) => Ok(NewBooking {
                user_name,
                hood_number,
                booking_time,
            }),
            _ => Err(AppError::Validation(
                "user_name, hood_number and booking_time are all required".to_string(),
            )),
        }
    }
}

impl NewBooking {
    pub(crate) fn with_id(self, id: i64) -> Booking {
        Booking {
            id,
            user_name: self.user_name,
            hood_number: self.hood_number,
            booking_time: self.booking_time,
        }
    }
}

/// Why a booking collided with an existing one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingConflict {
    /// The user already holds a booking at that instant
    UserAlreadyBooked { hood_number: i64 },

    /// The hood is already taken at that instant
    HoodAlreadyBooked { hood_number: i64 },
}

impl fmt::Display for BookingConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingConflict::UserAlreadyBooked { hood_number } => write!(
                f,
                "you are already booked into hood {} at the requested time",
                hood_number
            ),
            BookingConflict::HoodAlreadyBooked { hood_number } => write!(
                f,
                "hood {} is already booked at the requested time",
                hood_number
            ),
        }
    }
}

/// Scan `existing` in order and report the first booking that collides with `candidate`.
///
/// Only bookings at exactly the same instant are compared. Within one existing
/// booking the user check runs before the hood check.
pub fn find_conflict<'a, I>(existing: I, candidate: &NewBooking) -> Option<BookingConflict>
where
    I: IntoIterator<Item = &'a Booking>,
{
    existing
        .into_iter()
        .filter(|b| b.booking_time == candidate.booking_time)
        .find_map(|b| {
            if b.user_name == candidate.user_name {
                Some(BookingConflict::UserAlreadyBooked {
                    hood_number: b.hood_number,
                })
            } else if b.hood_number == candidate.hood_number {
                Some(BookingConflict::HoodAlreadyBooked {
                    hood_number: b.hood_number,
                })
            } else {
                None
            }
        })
}

/// Booking repository trait
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// All bookings in insertion order
    async fn list_all(&self) -> AppResult<Vec<Booking>>;

    /// Conflict-check and append in one atomic step
    async fn create(&self, booking: NewBooking) -> AppResult<Booking>;
}

/// In-memory booking repository
#[derive(Debug, Default)]
pub struct InMemoryBookingRepository {
    bookings: RwLock<Vec<Booking>>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn list_all(&self) -> AppResult<Vec<Booking>> {
        let bookings = self.bookings.read().map_err(|_| AppError::lock_poisoned())?;
        Ok(bookings.clone())
    }

    async fn create(&self, booking: NewBooking) -> AppResult<Booking> {
        let mut bookings = self.bookings.write().map_err(|_| AppError::lock_poisoned())?;

        if let Some(conflict) = find_conflict(bookings.iter(), &booking) {
            return Err(AppError::Conflict(conflict));
        }

        let booking = booking.with_id(next_id(bookings.iter().map(|b| b.id)));
        bookings.push(booking.clone());
        Ok(booking)
    }
}
