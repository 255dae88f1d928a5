//! Shared handler state

use std::sync::Arc;

use crate::config::SessionSettings;
use crate::service::{BookingService, Stores};
use crate::session::SessionConfig;

/// How the session token travels in a cookie
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub max_age_secs: i64,
}

impl CookieSettings {
    /// `Set-Cookie` value carrying a freshly issued token
    pub fn issue(&self, token: &str) -> String {
        format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.name, token, self.max_age_secs
        )
    }

    /// `Set-Cookie` value that makes the client drop the token
    pub fn clear(&self) -> String {
        format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", self.name)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BookingService>,
    pub cookie: CookieSettings,
}

impl AppState {
    pub fn new(stores: Stores, settings: &SessionSettings) -> Self {
        let session_config = SessionConfig::from(settings);
        let cookie = CookieSettings {
            name: settings.cookie_name.clone(),
            max_age_secs: session_config.ttl.num_seconds(),
        };

        Self {
            service: Arc::new(BookingService::new(stores, session_config)),
            cookie,
        }
    }

    /// State backed by process-local stores
    pub fn in_memory(settings: &SessionSettings) -> Self {
        Self::new(Stores::in_memory(), settings)
    }
}
