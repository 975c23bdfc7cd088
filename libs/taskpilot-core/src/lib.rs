//! TaskPilot Core - tasks, users, and cached AI generation over task lists
//!
//! The centre of the crate is [`GenerationCache`]: given an endpoint name and
//! a user's tasks it returns generated text, calling the configured
//! [`TextGenerator`] only when no cached answer exists for that exact task
//! collection. The cache is fail-open; a missing or broken backend only costs
//! extra generator calls.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskpilot_core::{AppConfig, CacheStore, GenerationCache, Provider, TextGenerator};
//! use taskpilot_core::prompts::{build_summary_prompt, SUMMARY_INSTRUCTIONS};
//!
//! # async fn example() -> taskpilot_core::Result<()> {
//! let config = AppConfig::load(None)?;
//! let store = Arc::new(CacheStore::from_config(&config.cache).await);
//! let cache = GenerationCache::new(store);
//! let provider = Provider::from_config(&config.provider)?;
//!
//! let tasks = Vec::new();
//! let now = chrono::Utc::now();
//! let text = cache
//!     .get_or_generate("summary", &tasks, |tasks| async move {
//!         provider
//!             .generate(&build_summary_prompt(tasks, now), SUMMARY_INSTRUCTIONS)
//!             .await
//!     })
//!     .await?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```
//!
//! # Crate Features
//!
//! - `test-utils`: fixtures and test doubles in [`test_utils`]
//! - `observability`: `metrics` counters for cache and provider activity

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod generation;
pub mod insights;
pub mod models;
pub mod prompts;
pub mod provider;
pub mod repository;
pub mod services;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use auth::{Claims, PasswordHasher, TokenService};
pub use cache::{fingerprint, CacheBackend, CacheStats, CacheStore, ClearOutcome};
pub use config::{
    AppConfig, AuthConfig, CacheBackendKind, CacheConfig, DatabaseConfig, LoggingConfig,
    ProviderConfig, ServerConfig, StorageKind,
};
pub use error::{Result, TaskPilotError};
pub use generation::GenerationCache;
pub use models::*;
pub use provider::{Provider, ProviderError, ProviderKind, TextGenerator};
pub use repository::{InMemoryStore, Repositories, SqliteStore, TaskRepository, UserRepository};
pub use services::{
    AgentHealth, AgentRecommendations, AgentService, AgentSummary, TaskService, UserService,
};

/// Re-export commonly used types
pub use chrono::{DateTime, Utc};
