//! Session gate
//!
//! Route middleware that resolves the presented token and hands the caller's
//! identity to the handler through request extensions.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::state::AppState;
use crate::error::AppError;

/// Resolved caller of a gated request
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: i64,
    pub token: String,
}

/// Extract Bearer token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Extract a named cookie from any `Cookie` header
fn extract_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
}

/// Token from the Authorization header, falling back to the session cookie
pub(crate) fn presented_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    extract_bearer_token(headers)
        .or_else(|| extract_cookie(headers, cookie_name))
        .filter(|token| !token.is_empty())
}

/// Reject the request unless it carries a live session
pub async fn session_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = presented_token(request.headers(), &state.cookie.name)
        .ok_or(AppError::AuthenticationRequired)?
        .to_string();

    let user_id = state.service.authenticate(&token).await?;
    request
        .extensions_mut()
        .insert(Identity { user_id, token });

    Ok(next.run(request).await)
}
