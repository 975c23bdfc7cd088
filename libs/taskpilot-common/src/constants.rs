//! Constants shared across TaskPilot crates

/// Application name reported by health endpoints
pub const APP_NAME: &str = "TaskPilot";

/// Namespace prefix for every generation cache key
pub const DEFAULT_CACHE_NAMESPACE: &str = "ai_cache";

/// Default lifetime of a cached generation, in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Default capacity of the in-memory cache backend
pub const DEFAULT_CACHE_MAX_ENTRIES: u64 = 10_000;

/// Cache endpoint name for project summaries
pub const SUMMARY_ENDPOINT: &str = "summary";

/// Cache endpoint name for task recommendations
pub const RECOMMENDATIONS_ENDPOINT: &str = "recommendations";

/// Default HTTP port
pub const DEFAULT_HTTP_PORT: u16 = 8000;

/// Prefix for all JSON API routes
pub const API_PREFIX: &str = "/api";

/// Default access token lifetime, in minutes
pub const DEFAULT_TOKEN_EXPIRY_MINUTES: u64 = 30;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 6;

/// Accepted username length range (inclusive)
pub const USERNAME_LEN_RANGE: (usize, usize) = (3, 50);

/// Format used for due dates inside prompt text
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";
