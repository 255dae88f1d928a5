//! Request handlers
//!
//! Each handler decodes its payload, calls the booking service and renders the
//! result. Errors render through `AppError`'s `IntoResponse`.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Extension, Json, Path, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{json, Value};

use super::auth::Identity;
use super::state::AppState;
use crate::bookings::{Booking, BookingRequest};
use crate::error::AppResult;
use crate::hoods::{Hood, NewHood};
use crate::users::{LoginRequest, RegisterRequest, User, UserUpdate};

// ==================
// Open Handlers
// ==================

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<StatusCode> {
    let Json(request) = payload?;
    state.service.register(request).await?;
    Ok(StatusCode::OK)
}

/// Issue a session; the token goes out both as a cookie and in the body
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(request) = payload?;
    let issued = state.service.login(request).await?;
    let cookie = state.cookie.issue(&issued.token);

    Ok(([(header::SET_COOKIE, cookie)], Json(issued)).into_response())
}

// ==================
// Gated Handlers
// ==================

pub async fn logout(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Response> {
    state.service.logout(&identity.token).await?;
    tracing::info!(user_id = identity.user_id, "user logged out");

    Ok(([(header::SET_COOKIE, state.cookie.clear())], StatusCode::OK).into_response())
}

pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.service.list_users().await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    target: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UserUpdate>, JsonRejection>,
) -> AppResult<Json<User>> {
    let Path(target_id) = target?;
    let Json(update) = payload?;

    let user = state
        .service
        .update_user(identity.user_id, target_id, update)
        .await?;
    Ok(Json(user))
}

pub async fn list_hoods(State(state): State<AppState>) -> AppResult<Json<Vec<Hood>>> {
    Ok(Json(state.service.list_hoods().await?))
}

pub async fn create_hood(
    State(state): State<AppState>,
    payload: Result<Json<NewHood>, JsonRejection>,
) -> AppResult<Json<Hood>> {
    let Json(request) = payload?;
    Ok(Json(state.service.create_hood(request).await?))
}

pub async fn list_bookings(State(state): State<AppState>) -> AppResult<Json<Vec<Booking>>> {
    Ok(Json(state.service.list_bookings().await?))
}

pub async fn create_booking(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> AppResult<Json<Booking>> {
    let Json(request) = payload?;
    let booking = state
        .service
        .create_booking(identity.user_id, request)
        .await?;
    Ok(Json(booking))
}
