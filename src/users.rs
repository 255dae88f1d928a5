//! # Credential Store
//!
//! User records keyed by a unique display name, which doubles as the login key.

use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AppError, AppResult};
use crate::next_id;

/// User model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,

    /// Display name (unique, used to log in)
    pub name: String,

    /// Argon2id password hash (never plaintext)
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub email: String,

    pub emergency_telephone: String,

    pub research_group: String,
}

/// A user about to be inserted; the store assigns the id
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub password_hash: String,
    pub email: String,
    pub emergency_telephone: String,
    pub research_group: String,
}

impl NewUser {
    pub(crate) fn with_id(self, id: i64) -> User {
        User {
            id,
            name: self.name,
            password_hash: self.password_hash,
            email: self.email,
            emergency_telephone: self.emergency_telephone,
            research_group: self.research_group,
        }
    }
}

/// Registration payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, alias = "hash")]
    pub password: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "text_or_number")]
    pub emergency_telephone: Option<String>,

    #[serde(default)]
    pub research_group: Option<String>,
}

/// A registration with every field present and non-blank
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub password: String,
    pub email: String,
    pub emergency_telephone: String,
    pub research_group: String,
}

impl RegisterRequest {
    pub fn validate(self) -> AppResult<Registration> {
        Ok(Registration {
            name: required(self.name, "name")?,
            password: required_secret(self.password, "password")?,
            email: required(self.email, "email")?,
            emergency_telephone: required(self.emergency_telephone, "emergency_telephone")?,
            research_group: required(self.research_group, "research_group")?,
        })
    }
}

/// Login payload
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub name: String,

    #[serde(alias = "hash")]
    pub password: String,
}

impl LoginRequest {
    /// Name as registration stores it
    pub fn login_name(&self) -> &str {
        self.name.trim()
    }
}

/// Self-service profile update
///
/// Every field is optional; a field left out keeps its stored value.
/// `id`, `name` and `password` are accepted only so that attempts to change
/// them can be rejected explicitly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, alias = "hash")]
    pub password: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "text_or_number")]
    pub emergency_telephone: Option<String>,

    #[serde(default)]
    pub research_group: Option<String>,
}

impl UserUpdate {
    /// Merge this update into `user`, which must already be the caller's own record
    pub fn apply_to(self, user: &mut User) -> AppResult<()> {
        if self.password.is_some() {
            return Err(AppError::Validation(
                "unable to edit password hash".to_string(),
            ));
        }

        if let Some(id) = self.id {
            if id != user.id {
                return Err(AppError::Permission(
                    "cannot edit another user's data".to_string(),
                ));
            }
        }

        if let Some(name) = self.name {
            if name.trim() != user.name {
                return Err(AppError::Validation("name cannot be changed".to_string()));
            }
        }

        let email = self.email.map(|v| non_blank(v, "email")).transpose()?;
        let telephone = self
            .emergency_telephone
            .map(|v| non_blank(v, "emergency_telephone"))
            .transpose()?;
        let group = self
            .research_group
            .map(|v| non_blank(v, "research_group"))
            .transpose()?;

        if let Some(email) = email {
            user.email = email;
        }
        if let Some(telephone) = telephone {
            user.emergency_telephone = telephone;
        }
        if let Some(group) = group {
            user.research_group = group;
        }

        Ok(())
    }
}

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    match value {
        Some(v) => non_blank(v, field),
        None => Err(AppError::Validation(format!("missing field '{}'", field))),
    }
}

/// Like `required`, but the value is kept byte for byte
fn required_secret(value: Option<String>, field: &str) -> AppResult<String> {
    match value {
        Some(v) if v.trim().is_empty() => {
            Err(AppError::Validation(format!("field '{}' is empty", field)))
        }
        Some(v) => Ok(v),
        None => Err(AppError::Validation(format!("missing field '{}'", field))),
    }
}

fn non_blank(value: String, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("field '{}' is empty", field)));
    }
    Ok(trimmed.to_string())
}

/// Telephone numbers arrive either as JSON strings or as bare integers.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrNumber {
        Text(String),
        Number(i64),
    }

    Ok(
        Option::<TextOrNumber>::deserialize(deserializer)?.map(|value| match value {
            TextOrNumber::Text(s) => s,
            TextOrNumber::Number(n) => n.to_string(),
        }),
    )
}

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>>;

    async fn find_by_name(&self, name: &str) -> AppResult<Option<User>>;

    /// All users ordered by id
    async fn list_all(&self) -> AppResult<Vec<User>>;

    /// Insert a user, rejecting a taken name and assigning `max(id) + 1`
    async fn create(&self, user: NewUser) -> AppResult<User>;

    /// Apply `update` to user `id` as one step and return the new record
    async fn update_with(&self, id: i64, update: UserUpdate) -> AppResult<User>;
}

/// In-memory user repository
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let users = self.users.read().map_err(|_| AppError::lock_poisoned())?;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<User>> {
        let users = self.users.read().map_err(|_| AppError::lock_poisoned())?;
        Ok(users.iter().find(|u| u.name == name).cloned())
    }

    async fn list_all(&self) -> AppResult<Vec<User>> {
        let users = self.users.read().map_err(|_| AppError::lock_poisoned())?;
        Ok(users.clone())
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        let mut users = self.users.write().map_err(|_| AppError::lock_poisoned())?;

        if users.iter().any(|u| u.name == user.name) {
            return Err(AppError::Duplicate(format!(
                "a user named '{}' already exists",
                user.name
            )));
        }

        let user = user.with_id(next_id(users.iter().map(|u| u.id)));
        users.push(user.clone());
        Ok(user)
    }

    async fn update_with(&self, id: i64, update: UserUpdate) -> AppResult<User> {
        let mut users = self.users.write().map_err(|_| AppError::lock_poisoned())?;

        let existing = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::NotFound(format!("user {} not found", id)))?;

        let mut updated = existing.clone();
        update.apply_to(&mut updated)?;
        *existing = updated.clone();
        Ok(updated)
    }
}
