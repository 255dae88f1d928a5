//! # Session Directory
//!
//! Opaque bearer tokens mapped to user ids.
//!
//! ## Invariants
//! - At most one live session per user: issuing a token drops the user's older ones
//! - Tokens are stored only as SHA-256 digests
//! - Sessions expire at their stated time
//! - Revocation takes effect immediately

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::SessionSettings;
use crate::crypto::{constant_time_str_eq, generate_token, hash_token};
use crate::error::{AppError, AppResult};

/// Stored session record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token_hash: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Raw token handed to the client at login
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub user_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Longest accepted session lifetime: ten years
pub const MAX_TTL_HOURS: i64 = 24 * 365 * 10;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Random bytes per token
    pub token_bytes: usize,

    pub ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_bytes: 32,
            ttl: Duration::hours(24),
        }
    }
}

impl From<&SessionSettings> for SessionConfig {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            token_bytes: settings.token_bytes,
            ttl: Duration::hours(settings.ttl_hours.clamp(1, MAX_TTL_HOURS)),
        }
    }
}

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Drop every session of `session.user_id`, then store `session`
    async fn replace_for_user(&self, session: Session) -> AppResult<()>;

    async fn find_by_token_hash(&self, token_hash: &str) -> AppResult<Option<Session>>;

    /// Returns whether a session was removed
    async fn delete_by_token_hash(&self, token_hash: &str) -> AppResult<bool>;
}

/// Session manager handles issuing, resolving and revoking tokens
pub struct SessionManager {
    config: SessionConfig,
    repository: Arc<dyn SessionRepository>,
}

impl SessionManager {
    pub fn new(config: SessionConfig, repository: Arc<dyn SessionRepository>) -> Self {
        Self { config, repository }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Create a session for `user_id`, invalidating any earlier one
    pub async fn issue(&self, user_id: i64) -> AppResult<IssuedSession> {
        let token = generate_token(self.config.token_bytes);
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.config.ttl)
            .ok_or_else(|| AppError::Backend("session expiry out of range".to_string()))?;
        let session = Session {
            token_hash: hash_token(&token),
            user_id,
            created_at: now,
            expires_at,
        };
        let expires_at = session.expires_at;

        self.repository.replace_for_user(session).await?;

        Ok(IssuedSession {
            user_id,
            token,
            expires_at,
        })
    }

    /// Resolve a raw token to its user id
    pub async fn resolve(&self, token: &str) -> AppResult<i64> {
        let token_hash = hash_token(token);

        let session = self
            .repository
            .find_by_token_hash(&token_hash)
            .await?
            .ok_or(AppError::SessionInvalid)?;

        if session.expires_at <= Utc::now() {
            self.repository.delete_by_token_hash(&token_hash).await?;
            return Err(AppError::SessionInvalid);
        }

        Ok(session.user_id)
    }

    /// Revoke a raw token (logout)
    pub async fn revoke(&self, token: &str) -> AppResult<()> {
        if self.repository.delete_by_token_hash(&hash_token(token)).await? {
            Ok(())
        } else {
            Err(AppError::SessionInvalid)
        }
    }
}

/// In-memory session repository
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<Vec<Session>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn replace_for_user(&self, session: Session) -> AppResult<()> {
        let mut sessions = self.sessions.write().map_err(|_| AppError::lock_poisoned())?;
        sessions.retain(|s| s.user_id != session.user_id);
        sessions.push(session);
        Ok(())
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> AppResult<Option<Session>> {
        let sessions = self.sessions.read().map_err(|_| AppError::lock_poisoned())?;
        Ok(sessions
            .iter()
            .find(|s| constant_time_str_eq(&s.token_hash, token_hash))
            .cloned())
    }

    async fn delete_by_token_hash(&self, token_hash: &str) -> AppResult<bool> {
        let mut sessions = self.sessions.write().map_err(|_| AppError::lock_poisoned())?;
        let len_before = sessions.len();
        sessions.retain(|s| !constant_time_str_eq(&s.token_hash, token_hash));
        Ok(sessions.len() != len_before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_manager(config: SessionConfig) -> SessionManager {
        SessionManager::new(config, Arc::new(InMemorySessionRepository::new()))
    }

    #[tokio::test]
    async fn test_issue_and_resolve() {
        let manager = create_manager(SessionConfig::default());

        let issued = manager.issue(3).await.unwrap();

        assert_eq!(issued.token.len(), 64);
        assert_eq!(manager.resolve(&issued.token).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_unknown_token_rejected() {
        let manager = create_manager(SessionConfig::default());
        manager.issue(3).await.unwrap();

        let result = manager.resolve("deadbeef").await;
        assert!(matches!(result, Err(AppError::SessionInvalid)));
    }

    #[tokio::test]
    async fn test_new_login_invalidates_previous_token() {
        let manager = create_manager(SessionConfig::default());

        let first = manager.issue(3).await.unwrap();
        let other_user = manager.issue(4).await.unwrap();
        let second = manager.issue(3).await.unwrap();

        assert!(matches!(
            manager.resolve(&first.token).await,
            Err(AppError::SessionInvalid)
        ));
        assert_eq!(manager.resolve(&second.token).await.unwrap(), 3);
        assert_eq!(manager.resolve(&other_user.token).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_revoke() {
        let manager = create_manager(SessionConfig::default());
        let issued = manager.issue(3).await.unwrap();

        manager.revoke(&issued.token).await.unwrap();

        assert!(manager.resolve(&issued.token).await.is_err());
        assert!(matches!(
            manager.revoke(&issued.token).await,
            Err(AppError::SessionInvalid)
        ));
    }

    #[tokio::test]
    async fn test_expired_session_rejected() {
        let manager = create_manager(SessionConfig {
            token_bytes: 32,
            ttl: Duration::seconds(-1),
        });
        let issued = manager.issue(3).await.unwrap();

        assert!(matches!(
            manager.resolve(&issued.token).await,
            Err(AppError::SessionInvalid)
        ));
    }

    #[tokio::test]
    async fn test_unrepresentable_expiry_is_an_error() {
        let manager = create_manager(SessionConfig {
            token_bytes: 32,
            ttl: Duration::days(1_000_000_000),
        });

        assert!(matches!(manager.issue(3).await, Err(AppError::Backend(_))));
    }

    #[tokio::test]
    async fn test_extreme_settings_are_clamped() {
        let settings = SessionSettings {
            ttl_hours: i64::MAX,
            ..Default::default()
        };

        let config = SessionConfig::from(&settings);
        assert_eq!(config.ttl, Duration::hours(MAX_TTL_HOURS));

        let manager = create_manager(config);
        let issued = manager.issue(3).await.unwrap();
        assert_eq!(manager.resolve(&issued.token).await.unwrap(), 3);
    }

    #[test]
    fn test_config_from_settings() {
        let settings = SessionSettings {
            cookie_name: "sid".to_string(),
            token_bytes: 48,
            ttl_hours: 2,
        };

        let config = SessionConfig::from(&settings);

        assert_eq!(config.token_bytes, 48);
        assert_eq!(config.ttl, Duration::hours(2));
    }
}
