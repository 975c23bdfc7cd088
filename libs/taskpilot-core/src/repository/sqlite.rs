use super::{TaskRepository, UserRepository};
use crate::error::{Result, TaskPilotError};
use crate::models::{NewTask, Priority, Task, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, instrument};

const CREATE_USERS: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
)";

// Tags and sub-tasks are JSON text; only this module reads or writes them.
const CREATE_TASKS: &str = r"
CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT,
    due_date TEXT,
    completed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    owner_id INTEGER NOT NULL,
    priority TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    mini_tasks TEXT NOT NULL DEFAULT '{}'
)";

const CREATE_TASK_OWNER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks (owner_id)";

const TASK_COLUMNS: &str =
    "id, title, description, due_date, completed, created_at, owner_id, priority, tags, mini_tasks";

/// SQLite storage through an `sqlx` pool
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database file and its schema
    ///
    /// # Errors
    /// Returns a database error if the file cannot be opened or migrated
    #[instrument]
    pub async fn open(path: &Path, max_connections: u32) -> Result<Self> {
        info!(path = %path.display(), "Opening SQLite database");

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| TaskPilotError::database(format!("Failed to open database: {e}")))?;

        Self::with_pool(pool).await
    }

    /// Private in-memory database, one connection
    ///
    /// # Errors
    /// Returns a database error if the schema cannot be created
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| TaskPilotError::database(format!("Failed to open database: {e}")))?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        for statement in [CREATE_USERS, CREATE_TASKS, CREATE_TASK_OWNER_INDEX] {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| TaskPilotError::database(format!("Failed to create schema: {e}")))?;
        }
        debug!("Database schema ready");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn map_task(row: &SqliteRow) -> Result<Task> {
    let priority = row
        .try_get::<Option<String>, _>("priority")
        .map_err(TaskPilotError::database)?
        .map(|raw| raw.parse::<Priority>())
        .transpose()
        .map_err(TaskPilotError::database)?;
    let tags: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("tags").map_err(TaskPilotError::database)?)?;
    let mini_tasks: BTreeMap<String, bool> = serde_json::from_str(
        &row.try_get::<String, _>("mini_tasks")
            .map_err(TaskPilotError::database)?,
    )?;

    Ok(Task {
        id: row.try_get("id").map_err(TaskPilotError::database)?,
        title: row.try_get("title").map_err(TaskPilotError::database)?,
        description: row.try_get("description").map_err(TaskPilotError::database)?,
        due_date: row.try_get("due_date").map_err(TaskPilotError::database)?,
        completed: row.try_get("completed").map_err(TaskPilotError::database)?,
        created_at: row.try_get("created_at").map_err(TaskPilotError::database)?,
        owner_id: row.try_get("owner_id").map_err(TaskPilotError::database)?,
        priority,
        tags,
        mini_tasks,
    })
}

fn map_user(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id").map_err(TaskPilotError::database)?,
        username: row.try_get("username").map_err(TaskPilotError::database)?,
        password_hash: row.try_get("password_hash").map_err(TaskPilotError::database)?,
        created_at: row.try_get("created_at").map_err(TaskPilotError::database)?,
    })
}

#[async_trait]
impl TaskRepository for SqliteStore {
    async fn list_for_owner(&self, owner_id: i64) -> Result<Vec<Task>> {
        let rows = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = ? ORDER BY id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(TaskPilotError::database)?;

        rows.iter().map(map_task).collect()
    }

    async fn get(&self, owner_id: i64, id: i64) -> Result<Option<Task>> {
        let row = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND owner_id = ?"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(TaskPilotError::database)?;

        row.as_ref().map(map_task).transpose()
    }

    async fn insert(&self, owner_id: i64, task: NewTask, created_at: DateTime<Utc>) -> Result<Task> {
        let tags = serde_json::to_string(&task.tags)?;
        let mini_tasks = serde_json::to_string(&task.mini_tasks)?;

        let result = sqlx::query(
            "INSERT INTO tasks (title, description, due_date, completed, created_at, owner_id, priority, tags, mini_tasks) \
             VALUES (?, ?, ?, 0, ?, ?, ?, ?, ?)",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.due_date)
        .bind(created_at)
        .bind(owner_id)
        .bind(task.priority.map(Priority::as_str))
        .bind(tags)
        .bind(mini_tasks)
        .execute(&self.pool)
        .await
        .map_err(TaskPilotError::database)?;

        Ok(Task {
            id: result.last_insert_rowid(),
            title: task.title,
            description: task.description,
            due_date: task.due_date,
            completed: false,
            created_at,
            owner_id,
            priority: task.priority,
            tags: task.tags,
            mini_tasks: task.mini_tasks,
        })
    }

    async fn update(&self, task: &Task) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE tasks SET title = ?, description = ?, due_date = ?, completed = ?, \
             priority = ?, tags = ?, mini_tasks = ? WHERE id = ? AND owner_id = ?",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.due_date)
        .bind(task.completed)
        .bind(task.priority.map(Priority::as_str))
        .bind(serde_json::to_string(&task.tags)?)
        .bind(serde_json::to_string(&task.mini_tasks)?)
        .bind(task.id)
        .bind(task.owner_id)
        .execute(&self.pool)
        .await
        .map_err(TaskPilotError::database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, owner_id: i64, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(TaskPilotError::database)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepository for SqliteStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(TaskPilotError::database)?;

        row.as_ref().map(map_user).transpose()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, password_hash, created_at FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(TaskPilotError::database)?;

        row.as_ref().map(map_user).transpose()
    }

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        created_at: DateTime<Utc>,
    ) -> Result<User> {
        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)",
        )
        .bind(username)
        .bind(password_hash)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
                TaskPilotError::conflict(format!("Username '{username}' is already registered"))
            } else {
                TaskPilotError::database(e)
            }
        })?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at,
        })
    }
}
