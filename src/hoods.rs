//! # Hood Registry
//!
//! Bookable lab hoods, each identified to people by a hood number and a room.

use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::next_id;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hood {
    pub id: i64,
    pub hood_number: i64,
    pub room: String,
}

/// Hood creation payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewHood {
    #[serde(default)]
    pub hood_number: Option<i64>,

    #[serde(default)]
    pub room: Option<String>,
}

/// A hood that passed validation and is ready to insert
#[derive(Debug, Clone)]
pub struct HoodDraft {
    pub hood_number: i64,
    pub room: String,
}

impl NewHood {
    pub fn validate(self) -> AppResult<HoodDraft> {
        let hood_number = match self.hood_number {
            Some(n) if n > 0 => n,
            Some(n) => {
                return Err(AppError::Validation(format!(
                    "hood number must be positive, got {}",
                    n
                )))
            }
            None => return Err(AppError::Validation("missing field 'hood_number'".to_string())),
        };

        let room = self.room.map(|r| r.trim().to_string()).unwrap_or_default();
        if room.is_empty() {
            return Err(AppError::Validation("missing field 'room'".to_string()));
        }

        Ok(HoodDraft { hood_number, room })
    }
}

impl HoodDraft {
    pub(crate) fn with_id(self, id: i64) -> Hood {
        Hood {
            id,
            hood_number: self.hood_number,
            room: self.room,
        }
    }
}

pub(crate) fn duplicate_number(hood_number: i64) -> AppError {
    AppError::Duplicate(format!("hood number {} already exists", hood_number))
}

/// Hood repository trait
#[async_trait]
pub trait HoodRepository: Send + Sync {
    async fn find_by_number(&self, hood_number: i64) -> AppResult<Option<Hood>>;

    /// All hoods ordered by id
    async fn list_all(&self) -> AppResult<Vec<Hood>>;

    /// Insert a hood, rejecting a taken number and assigning `max(id) + 1`
    async fn create(&self, hood: HoodDraft) -> AppResult<Hood>;
}

/// In-memory hood repository
#[derive(Debug, Default)]
pub struct InMemoryHoodRepository {
    hoods: RwLock<Vec<Hood>>,
}

impl InMemoryHoodRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HoodRepository for InMemoryHoodRepository {
    async fn find_by_number(&self, hood_number: i64) -> AppResult<Option<Hood>> {
        let hoods = self.hoods.read().map_err(|_| AppError::lock_poisoned())?;
        Ok(hoods.iter().find(|h| h.hood_number == hood_number).cloned())
    }

    async fn list_all(&self) -> AppResult<Vec<Hood>> {
        let hoods = self.hoods.read().map_err(|_| AppError::lock_poisoned())?;
        Ok(hoods.clone())
    }

    async fn create(&self, hood: HoodDraft) -> AppResult<Hood> {
        let mut hoods = self.hoods.write().map_err(|_| AppError::lock_poisoned())?;

        if hoods.iter().any(|h| h.hood_number == hood.hood_number) {
            return Err(duplicate_number(hood.hood_number));
        }

        let hood = hood.with_id(next_id(hoods.iter().map(|h| h.id)));
        hoods.push(hood.clone());
        Ok(hood)
    }
}
