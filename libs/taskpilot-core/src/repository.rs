//! Persistence for tasks and users
//!
//! Services depend on the [`TaskRepository`] and [`UserRepository`] traits;
//! [`InMemoryStore`] and [`SqliteStore`] implement both.

mod memory;
mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use crate::config::{DatabaseConfig, StorageKind};
use crate::error::Result;
use crate::models::{NewTask, Task, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// All tasks of `owner_id`, ordered by id
    async fn list_for_owner(&self, owner_id: i64) -> Result<Vec<Task>>;

    /// A task by id, only if it belongs to `owner_id`
    async fn get(&self, owner_id: i64, id: i64) -> Result<Option<Task>>;

    /// Persist a new task and return it with its assigned id
    async fn insert(&self, owner_id: i64, task: NewTask, created_at: DateTime<Utc>) -> Result<Task>;

    /// Replace a stored task; `false` when it no longer exists
    async fn update(&self, task: &Task) -> Result<bool>;

    /// Remove a task of `owner_id`; `false` when there was none
    async fn delete(&self, owner_id: i64, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Persist a new user
    ///
    /// Fails with `TaskPilotError::Conflict` when the username is taken.
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        created_at: DateTime<Utc>,
    ) -> Result<User>;
}

/// Both repositories backed by the same storage
#[derive(Clone)]
pub struct Repositories {
    pub tasks: Arc<dyn TaskRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}

impl Repositories {
    #[must_use]
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            tasks: store.clone(),
            users: store,
        }
    }

    /// Open the storage selected by `config`
    ///
    /// # Errors
    /// Returns a database error if the SQLite file cannot be opened or migrated
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        match config.storage {
            StorageKind::Memory => Ok(Self::in_memory()),
            StorageKind::Sqlite => {
                let store = Arc::new(SqliteStore::open(&config.path, config.max_connections).await?);
                Ok(Self {
                    tasks: store.clone(),
                    users: store,
                })
            }
        }
    }
}
