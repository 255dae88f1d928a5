//! hoodbook - booking service for shared laboratory fume hoods
//!
//! Users register and log in; authenticated callers list and create hoods and
//! reserve a hood at an instant, with double bookings rejected.

pub mod bookings;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod hoods;
pub mod http_server;
pub mod observability;
pub mod postgres;
pub mod service;
pub mod session;
pub mod users;

/// Next identifier under the `max + 1` convention; 1 for an empty collection
pub(crate) fn next_id<I: IntoIterator<Item = i64>>(ids: I) -> i64 {
    ids.into_iter().max().map_or(1, |max| max + 1)
}
