//! Services wired together from one configuration

use std::sync::Arc;
use taskpilot_core::{
    AgentService, AppConfig, AuthConfig, CacheStore, GenerationCache, PasswordHasher, Provider,
    ProviderKind, Repositories, Result, TaskPilotError, TaskService, TextGenerator, TokenService,
    User, UserRepository, UserService,
};
use tracing::{info, instrument};

/// Everything a command or request handler needs
#[derive(Clone)]
pub struct AppContext {
    pub users: UserService,
    pub tasks: TaskService,
    pub agent: AgentService,
    pub cache: Arc<CacheStore>,
    user_repo: Arc<dyn UserRepository>,
}

impl AppContext {
    /// Assemble services over already-built collaborators
    ///
    /// # Errors
    /// Returns a configuration error for an unusable PBKDF2 iteration count
    pub fn new(
        repos: Repositories,
        cache: Arc<CacheStore>,
        generator: Arc<dyn TextGenerator>,
        provider_kind: ProviderKind,
        auth: &AuthConfig,
    ) -> Result<Self> {
        let hasher = PasswordHasher::new(auth.pbkdf2_iterations)?;
        let users = UserService::new(repos.users.clone(), hasher, TokenService::from_config(auth));
        let agent = AgentService::new(
            repos.tasks.clone(),
            GenerationCache::new(cache.clone()),
            generator,
            provider_kind,
        );

        Ok(Self {
            users,
            tasks: TaskService::new(repos.tasks),
            agent,
            cache,
            user_repo: repos.users,
        })
    }

    /// Open storage, connect the cache, and resolve the provider
    ///
    /// # Errors
    /// Returns an error if storage cannot be opened or the provider client
    /// cannot be built. An unreachable cache backend is not an error.
    #[instrument(skip(config))]
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let repos = Repositories::from_config(&config.database).await?;
        let cache = Arc::new(CacheStore::from_config(&config.cache).await);
        let provider = Provider::from_config(&config.provider)?;
        let kind = provider.kind();

        info!(
            storage = ?config.database.storage,
            cache_backend = cache.backend_name(),
            cache_connected = cache.is_connected(),
            provider = kind.as_str(),
            "Application context ready"
        );

        Self::new(repos, cache, Arc::new(provider), kind, &config.auth)
    }

    /// Look a user up by name for the offline commands
    ///
    /// # Errors
    /// Returns a validation error when no such user exists
    pub async fn resolve_user(&self, username: &str) -> Result<User> {
        self.user_repo
            .find_by_username(username.trim())
            .await?
            .ok_or_else(|| TaskPilotError::validation(format!("Unknown user '{username}'")))
    }
}
