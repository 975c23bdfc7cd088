//! Data models for TaskPilot entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Task priority enumeration
///
/// Ordered from least to most urgent, so a `BTreeMap<Priority, _>` iterates
/// `Low`, `Medium`, `High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "low")]
    Low,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "high")]
    High,
}

impl Priority {
    /// Lowercase wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Marker used when rendering a task in prompt text
    #[must_use]
    pub fn marker(self) -> &'static str {
        match self {
            Self::Low => "🟢",
            Self::Medium => "🟡",
            Self::High => "🔴",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("Invalid priority: {other}")),
        }
    }
}

/// Main task entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: i64,
    /// Task title, never empty
    pub title: String,
    /// Optional free-form description
    pub description: Option<String>,
    /// Due timestamp
    pub due_date: Option<DateTime<Utc>>,
    /// Completion flag
    pub completed: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Owning user, fixed at creation
    pub owner_id: i64,
    /// Optional priority
    pub priority: Option<Priority>,
    /// Tags in the order the user gave them
    #[serde(default)]
    pub tags: Vec<String>,
    /// Sub-task label to completion flag
    #[serde(default)]
    pub mini_tasks: BTreeMap<String, bool>,
}

/// Task creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    /// Task title (required)
    pub title: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Due date (required)
    pub due_date: Option<DateTime<Utc>>,
    /// Optional priority
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Tags
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Sub-tasks
    #[serde(default)]
    pub mini_tasks: Option<BTreeMap<String, bool>>,
}

/// Partial task update request; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub mini_tasks: Option<BTreeMap<String, bool>>,
}

impl UpdateTaskRequest {
    /// True when the request changes nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.completed.is_none()
            && self.priority.is_none()
            && self.tags.is_none()
            && self.mini_tasks.is_none()
    }
}

/// Fields a repository needs to persist a new task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
    pub mini_tasks: BTreeMap<String, bool>,
}

/// Registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Registration and login payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Issued access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    /// Wrap a token as a bearer token response
    #[must_use]
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}
