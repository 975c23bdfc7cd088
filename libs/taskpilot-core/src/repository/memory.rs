use super::{TaskRepository, UserRepository};
use crate::error::{Result, TaskPilotError};
use crate::models::{NewTask, Task, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// Process-local storage, lost on restart
#[derive(Debug)]
pub struct InMemoryStore {
    tasks: DashMap<i64, Task>,
    users: DashMap<i64, User>,
    usernames: DashMap<String, i64>,
    next_task_id: AtomicI64,
    next_user_id: AtomicI64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks: DashMap::new(),
            users: DashMap::new(),
            usernames: DashMap::new(),
            next_task_id: AtomicI64::new(1),
            next_user_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl TaskRepository for InMemoryStore {
    async fn list_for_owner(&self, owner_id: i64) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|entry| entry.owner_id == owner_id)
            .map(|entry| entry.value().clone())
            .collect();
        tasks.sort_by_key(|t| t.id);
        Ok(tasks)
    }

    async fn get(&self, owner_id: i64, id: i64) -> Result<Option<Task>> {
        Ok(self
            .tasks
            .get(&id)
            .filter(|task| task.owner_id == owner_id)
            .map(|task| task.value().clone()))
    }

    async fn insert(&self, owner_id: i64, task: NewTask, created_at: DateTime<Utc>) -> Result<Task> {
        let id = self.next_task_id.fetch_add(1, Ordering::SeqCst);
        let task = Task {
            id,
            title: task.title,
            description: task.description,
            due_date: task.due_date,
            completed: false,
            created_at,
            owner_id,
            priority: task.priority,
            tags: task.tags,
            mini_tasks: task.mini_tasks,
        };
        self.tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn update(&self, task: &Task) -> Result<bool> {
        match self.tasks.get_mut(&task.id) {
            Some(mut stored) if stored.owner_id == task.owner_id => {
                *stored = task.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, owner_id: i64, id: i64) -> Result<bool> {
        Ok(self
            .tasks
            .remove_if(&id, |_, task| task.owner_id == owner_id)
            .is_some())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let Some(id) = self.usernames.get(username).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|user| user.value().clone()))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|user| user.value().clone()))
    }

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        created_at: DateTime<Utc>,
    ) -> Result<User> {
        match self.usernames.entry(username.to_string()) {
            Entry::Occupied(_) => Err(TaskPilotError::conflict(format!(
                "Username '{username}' is already registered"
            ))),
            Entry::Vacant(slot) => {
                let id = self.next_user_id.fetch_add(1, Ordering::SeqCst);
                let user = User {
                    id,
                    username: username.to_string(),
                    password_hash: password_hash.to_string(),
                    created_at,
                };
                self.users.insert(id, user.clone());
                slot.insert(id);
                Ok(user)
            }
        }
    }
}
