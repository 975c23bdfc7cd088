//! Application services used by the HTTP API and the CLI

use crate::auth::{PasswordHasher, TokenService};
use crate::error::{Result, TaskPilotError};
use crate::generation::GenerationCache;
use crate::insights::{RecommendationStats, TaskSummaryStats};
use crate::models::{
    CreateTaskRequest, Credentials, NewTask, Task, TokenResponse, UpdateTaskRequest, User,
};
use crate::prompts::{
    build_recommendation_prompt, build_summary_prompt, RECOMMENDATION_INSTRUCTIONS,
    SUMMARY_INSTRUCTIONS,
};
use crate::provider::{ProviderKind, TextGenerator};
use crate::repository::{TaskRepository, UserRepository};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use taskpilot_common::{
    MIN_PASSWORD_LEN, RECOMMENDATIONS_ENDPOINT, SUMMARY_ENDPOINT, USERNAME_LEN_RANGE,
};
use tracing::{debug, info, instrument};

/// Task CRUD scoped to one owner per call
#[derive(Clone)]
pub struct TaskService {
    repo: Arc<dyn TaskRepository>,
}

impl TaskService {
    #[must_use]
    pub fn new(repo: Arc<dyn TaskRepository>) -> Self {
        Self { repo }
    }

    /// # Errors
    /// Returns a database error if the tasks cannot be read
    pub async fn list(&self, owner_id: i64) -> Result<Vec<Task>> {
        self.repo.list_for_owner(owner_id).await
    }

    /// # Errors
    /// Returns `TaskNotFound` if the task does not exist or belongs to someone else
    pub async fn get(&self, owner_id: i64, id: i64) -> Result<Task> {
        self.repo
            .get(owner_id, id)
            .await?
            .ok_or(TaskPilotError::TaskNotFound { id })
    }

    /// # Errors
    /// Returns a validation error for a blank title or a missing due date
    #[instrument(skip(self, request))]
    pub async fn create(&self, owner_id: i64, request: CreateTaskRequest) -> Result<Task> {
        let title = required_title(&request.title)?;
        let due_date = request
            .due_date
            .ok_or_else(|| TaskPilotError::validation("Due date is required"))?;

        let task = NewTask {
            title,
            description: clean_description(request.description),
            due_date: Some(due_date),
            priority: request.priority,
            tags: clean_tags(request.tags.unwrap_or_default()),
            mini_tasks: request.mini_tasks.unwrap_or_default(),
        };
        let task = self.repo.insert(owner_id, task, Utc::now()).await?;
        info!(task_id = task.id, "Created task");
        Ok(task)
    }

    /// Apply the fields present in `request`
    ///
    /// # Errors
    /// Returns `TaskNotFound` for a task the owner cannot see, or a validation
    /// error for a blank title
    #[instrument(skip(self, request))]
    pub async fn update(&self, owner_id: i64, id: i64, request: UpdateTaskRequest) -> Result<Task> {
        let mut task = self.get(owner_id, id).await?;
        if request.is_empty() {
            return Ok(task);
        }

        if let Some(title) = request.title {
            task.title = required_title(&title)?;
        }
        if request.description.is_some() {
            task.description = clean_description(request.description);
        }
        if let Some(due_date) = request.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(completed) = request.completed {
            task.completed = completed;
        }
        if let Some(priority) = request.priority {
            task.priority = Some(priority);
        }
        if let Some(tags) = request.tags {
            task.tags = clean_tags(tags);
        }
        if let Some(mini_tasks) = request.mini_tasks {
            task.mini_tasks = mini_tasks;
        }

        if !self.repo.update(&task).await? {
            return Err(TaskPilotError::TaskNotFound { id });
        }
        debug!(task_id = id, "Updated task");
        Ok(task)
    }

    /// # Errors
    /// Returns `TaskNotFound` if there was nothing to delete
    #[instrument(skip(self))]
    pub async fn delete(&self, owner_id: i64, id: i64) -> Result<()> {
        if self.repo.delete(owner_id, id).await? {
            info!(task_id = id, "Deleted task");
            Ok(())
        } else {
            Err(TaskPilotError::TaskNotFound { id })
        }
    }
}

fn required_title(raw: &str) -> Result<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(TaskPilotError::validation("Title cannot be empty"));
    }
    Ok(title.to_string())
}

fn clean_description(raw: Option<String>) -> Option<String> {
    raw.map(|d| d.trim().to_string()).filter(|d| !d.is_empty())
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Registration, login, and token resolution
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    tokens: TokenService,
}

impl UserService {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, hasher: PasswordHasher, tokens: TokenService) -> Self {
        Self {
            users,
            hasher,
            tokens,
        }
    }

    /// # Errors
    /// Returns a validation error for a bad username or password, or
    /// `Conflict` when the username is taken
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn register(&self, credentials: Credentials) -> Result<User> {
        let username = credentials.username.trim().to_string();
        let (min_len, max_len) = USERNAME_LEN_RANGE;
        let len = username.chars().count();
        if len < min_len || len > max_len {
            return Err(TaskPilotError::validation(format!(
                "Username must be between {min_len} and {max_len} characters"
            )));
        }
        if credentials.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(TaskPilotError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.users.find_by_username(&username).await?.is_some() {
            return Err(TaskPilotError::conflict("Username already registered"));
        }

        let hasher = self.hasher.clone();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&credentials.password))
            .await
            .map_err(|e| TaskPilotError::unknown(format!("Password hashing failed: {e}")))??;

        let user = self
            .users
            .create_user(&username, &password_hash, Utc::now())
            .await?;
        info!(user_id = user.id, "Registered user");
        Ok(user)
    }

    /// # Errors
    /// Returns `Unauthorized` for an unknown user or a wrong password
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(&self, credentials: Credentials) -> Result<TokenResponse> {
        let invalid = || TaskPilotError::unauthorized("Incorrect username or password");

        let user = self
            .users
            .find_by_username(credentials.username.trim())
            .await?
            .ok_or_else(invalid)?;

        let hasher = self.hasher.clone();
        let stored = user.password_hash.clone();
        let matches =
            tokio::task::spawn_blocking(move || hasher.verify(&credentials.password, &stored))
                .await
                .map_err(|e| TaskPilotError::unknown(format!("Password check failed: {e}")))?;
        if !matches {
            return Err(invalid());
        }

        let token = self.tokens.issue(&user, Utc::now())?;
        Ok(TokenResponse::bearer(token))
    }

    /// Resolve a bearer token to its user
    ///
    /// # Errors
    /// Returns `Unauthorized` if the token is invalid or the user is gone
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let user_id = self.tokens.user_id(token)?;
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| TaskPilotError::unauthorized("User no longer exists"))
    }
}

/// Generated project summary with the figures it was based on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub summary: String,
    pub metadata: TaskSummaryStats,
    pub generated_at: DateTime<Utc>,
    pub prompt_type: String,
}

/// Generated recommendations with the figures they were based on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecommendations {
    pub recommendations: String,
    pub metadata: RecommendationStats,
    pub generated_at: DateTime<Utc>,
    pub prompt_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentHealth {
    pub status: String,
    pub provider: String,
    pub provider_configured: bool,
    pub service: String,
    pub version: String,
}

/// Summaries and recommendations over a user's tasks, served through the cache
#[derive(Clone)]
pub struct AgentService {
    tasks: Arc<dyn TaskRepository>,
    cache: GenerationCache,
    generator: Arc<dyn TextGenerator>,
    provider_kind: ProviderKind,
}

impl AgentService {
    #[must_use]
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        cache: GenerationCache,
        generator: Arc<dyn TextGenerator>,
        provider_kind: ProviderKind,
    ) -> Self {
        Self {
            tasks,
            cache,
            generator,
            provider_kind,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &GenerationCache {
        &self.cache
    }

    /// # Errors
    /// Returns a provider error if generation fails on a cache miss
    pub async fn summary(&self, owner_id: i64) -> Result<AgentSummary> {
        self.summary_at(owner_id, Utc::now()).await
    }

    /// Summary with `now` used for both the prompt and the metadata
    ///
    /// # Errors
    /// Returns a provider error if generation fails on a cache miss
    #[instrument(skip(self))]
    pub async fn summary_at(&self, owner_id: i64, now: DateTime<Utc>) -> Result<AgentSummary> {
        let tasks = self.tasks.list_for_owner(owner_id).await?;
        let generator = &self.generator;

        let summary = self
            .cache
            .get_or_generate(SUMMARY_ENDPOINT, &tasks, |tasks| async move {
                let prompt = build_summary_prompt(tasks, now);
                generator.generate(&prompt, SUMMARY_INSTRUCTIONS).await
            })
            .await?;

        Ok(AgentSummary {
            summary,
            metadata: TaskSummaryStats::from_tasks(&tasks),
            generated_at: now,
            prompt_type: "project_summary".to_string(),
        })
    }

    /// # Errors
    /// Returns a provider error if generation fails on a cache miss
    pub async fn recommendations(&self, owner_id: i64) -> Result<AgentRecommendations> {
        self.recommendations_at(owner_id, Utc::now()).await
    }

    /// Recommendations with `now` used for both the prompt and the metadata
    ///
    /// # Errors
    /// Returns a provider error if generation fails on a cache miss
    #[instrument(skip(self))]
    pub async fn recommendations_at(
        &self,
        owner_id: i64,
        now: DateTime<Utc>,
    ) -> Result<AgentRecommendations> {
        let tasks = self.tasks.list_for_owner(owner_id).await?;
        let generator = &self.generator;

        let recommendations = self
            .cache
            .get_or_generate(RECOMMENDATIONS_ENDPOINT, &tasks, |tasks| async move {
                let prompt = build_recommendation_prompt(tasks, now);
                generator.generate(&prompt, RECOMMENDATION_INSTRUCTIONS).await
            })
            .await?;

        Ok(AgentRecommendations {
            recommendations,
            metadata: RecommendationStats::from_tasks(&tasks, now),
            generated_at: now,
            prompt_type: "task_recommendations".to_string(),
        })
    }

    /// Whether a remote provider is in use
    #[must_use]
    pub fn health(&self) -> AgentHealth {
        let configured = self.provider_kind.is_remote();
        AgentHealth {
            status: if configured {
                "healthy"
            } else {
                "configuration_required"
            }
            .to_string(),
            provider: self.provider_kind.as_str().to_string(),
            provider_configured: configured,
            service: format!("{} AI Agent", taskpilot_common::APP_NAME),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
