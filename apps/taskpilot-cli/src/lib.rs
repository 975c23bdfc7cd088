//! TaskPilot CLI library
//!
//! Argument parsing, logging setup, the HTTP API, and the one-shot commands
//! that print agent output and cache diagnostics.

pub mod context;
pub mod logging;
#[cfg(feature = "observability")]
pub mod metrics;
pub mod server;

pub use context::AppContext;

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use taskpilot_common::{format_datetime, API_PREFIX};
use taskpilot_core::{
    AgentHealth, AgentRecommendations, AgentSummary, AppConfig, CacheStats, ClearOutcome, Result,
};

#[derive(Parser, Debug)]
#[command(name = "taskpilot")]
#[command(about = "Task manager backend with cached AI summaries and recommendations")]
#[command(version)]
pub struct Cli {
    /// Configuration file (.json, .yaml or .yml)
    #[arg(long, short, env = "TASKPILOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(long, short)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP API
    Serve {
        /// Override the configured listen host
        #[arg(long)]
        host: Option<String>,
        /// Override the configured listen port
        #[arg(long, short)]
        port: Option<u16>,
    },
    /// Print a generated project summary for a user
    Summary {
        /// Username whose tasks are summarized
        #[arg(long, short)]
        user: String,
    },
    /// Print generated task recommendations for a user
    Recommend {
        /// Username whose tasks are analyzed
        #[arg(long, short)]
        user: String,
    },
    /// Inspect or clear the generation cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
    /// Report provider and cache health
    Health,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum CacheCommand {
    /// Show hit/miss counters and backend diagnostics
    Stats,
    /// Remove every generated entry in the cache namespace
    Clear,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if self.json_logs {
            config.logging.json_logs = true;
        }
        if let Commands::Serve { host, port } = &self.command {
            if let Some(host) = host {
                config.server.host.clone_from(host);
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
        }
    }
}

/// Run a one-shot command, writing its output to `writer`
///
/// `Serve` is not handled here; it needs the runtime for its whole life.
///
/// # Errors
/// Returns an error for an unknown user, a failed generation, or a write
/// failure
pub async fn run_command<W: Write>(
    command: &Commands,
    ctx: &AppContext,
    writer: &mut W,
) -> Result<()> {
    match command {
        Commands::Serve { .. } => Ok(()),
        Commands::Summary { user } => {
            let user = ctx.resolve_user(user).await?;
            let summary = ctx.agent.summary(user.id).await?;
            print_summary(&summary, writer)
        }
        Commands::Recommend { user } => {
            let user = ctx.resolve_user(user).await?;
            let recommendations = ctx.agent.recommendations(user.id).await?;
            print_recommendations(&recommendations, writer)
        }
        Commands::Cache {
            action: CacheCommand::Stats,
        } => {
            if is_process_local(ctx) {
                return print_process_local_notice("GET", "/cache/stats", writer);
            }
            print_cache_stats(&ctx.cache.stats().await, writer)
        }
        Commands::Cache {
            action: CacheCommand::Clear,
        } => {
            let outcome = clear_cache(ctx).await;
            if is_process_local(ctx) {
                print_process_local_notice("DELETE", "/cache", writer)?;
            }
            print_clear_outcome(&outcome, writer)
        }
        Commands::Health => {
            print_health(&ctx.agent.health(), &ctx.cache.stats().await, writer)
        }
    }
}

/// Clear the cache namespace from a one-shot command
///
/// A memory cache belongs to the process that created it, so clearing it
/// here would never reach a running server's entries. That case reports
/// failure without touching anything.
pub async fn clear_cache(ctx: &AppContext) -> ClearOutcome {
    if is_process_local(ctx) {
        return ClearOutcome {
            success: false,
            removed: 0,
        };
    }
    ctx.cache.clear_namespace().await
}

fn is_process_local(ctx: &AppContext) -> bool {
    ctx.cache.backend_name() == "memory"
}

fn print_process_local_notice<W: Write>(method: &str, route: &str, writer: &mut W) -> Result<()> {
    writeln!(
        writer,
        "The memory cache is process-local; use {method} {API_PREFIX}{route} on the running server"
    )?;
    Ok(())
}

/// Print a summary and the figures behind it
///
/// # Errors
/// Returns an error if writing fails
pub fn print_summary<W: Write>(summary: &AgentSummary, writer: &mut W) -> Result<()> {
    let stats = &summary.metadata;
    writeln!(writer, "{}", summary.summary.trim_end())?;
    writeln!(writer)?;
    writeln!(
        writer,
        "Tasks: {} total, {} completed, {} pending ({:.1}% complete)",
        stats.total_tasks, stats.completed_tasks, stats.pending_tasks, stats.completion_rate
    )?;
    writeln!(writer, "Generated at {}", format_datetime(&summary.generated_at))?;
    Ok(())
}

/// Print recommendations and the figures behind them
///
/// # Errors
/// Returns an error if writing fails
pub fn print_recommendations<W: Write>(
    recommendations: &AgentRecommendations,
    writer: &mut W,
) -> Result<()> {
    let stats = &recommendations.metadata;
    writeln!(writer, "{}", recommendations.recommendations.trim_end())?;
    writeln!(writer)?;
    writeln!(
        writer,
        "Pending: {}, high priority: {}, overdue: {}",
        stats.total_pending_tasks, stats.high_priority_tasks, stats.overdue_tasks
    )?;
    if !stats.overdue_task_ids.is_empty() {
        let ids: Vec<String> = stats.overdue_task_ids.iter().map(ToString::to_string).collect();
        writeln!(writer, "Overdue task ids: {}", ids.join(", "))?;
    }
    Ok(())
}

/// Print cache diagnostics
///
/// # Errors
/// Returns an error if writing fails
pub fn print_cache_stats<W: Write>(stats: &CacheStats, writer: &mut W) -> Result<()> {
    let state = if stats.connected {
        "connected"
    } else {
        "disconnected"
    };
    writeln!(writer, "Cache backend: {} ({state})", stats.backend)?;
    writeln!(writer, "  Namespace: {}", stats.namespace)?;
    writeln!(writer, "  Keys: {}", stats.key_count)?;
    writeln!(
        writer,
        "  Hits: {}  Misses: {}  Errors: {}  Hit rate: {:.1}%",
        stats.hits,
        stats.misses,
        stats.errors,
        stats.hit_rate * 100.0
    )?;
    if let Some(memory) = &stats.memory_usage {
        writeln!(writer, "  Memory: {memory}")?;
    }
    if let Some(version) = &stats.backend_version {
        writeln!(writer, "  Version: {version}")?;
    }
    if let Some(error) = &stats.error {
        writeln!(writer, "  Last error: {error}")?;
    }
    Ok(())
}

/// Print the result of a namespace clear
///
/// # Errors
/// Returns an error if writing fails
pub fn print_clear_outcome<W: Write>(outcome: &ClearOutcome, writer: &mut W) -> Result<()> {
    if outcome.success {
        writeln!(writer, "Cleared {} cached entries", outcome.removed)?;
    } else {
        writeln!(writer, "Cache unavailable; nothing cleared")?;
    }
    Ok(())
}

/// Print agent and cache health
///
/// # Errors
/// Returns an error if writing fails
pub fn print_health<W: Write>(
    agent: &AgentHealth,
    cache: &CacheStats,
    writer: &mut W,
) -> Result<()> {
    writeln!(writer, "{} v{}", agent.service, agent.version)?;
    writeln!(writer, "  Status: {}", agent.status)?;
    writeln!(
        writer,
        "  Provider: {} ({})",
        agent.provider,
        if agent.provider_configured {
            "configured"
        } else {
            "offline responses"
        }
    )?;
    writeln!(
        writer,
        "  Cache: {} ({})",
        cache.backend,
        if cache.connected {
            "connected"
        } else {
            "disconnected"
        }
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use taskpilot_core::insights::{RecommendationStats, TaskSummaryStats};

    #[test]
    fn test_parse_serve_with_overrides() {
        let cli = Cli::try_parse_from(["taskpilot", "serve", "--port", "9000"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Serve {
                host: None,
                port: Some(9000)
            }
        );

        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_parse_summary_requires_user() {
        assert!(Cli::try_parse_from(["taskpilot", "summary"]).is_err());
        let cli = Cli::try_parse_from(["taskpilot", "summary", "--user", "alice"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Summary {
                user: "alice".to_string()
            }
        );
    }

    #[test]
    fn test_parse_cache_subcommands() {
        let cli = Cli::try_parse_from(["taskpilot", "cache", "clear"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Cache {
                action: CacheCommand::Clear
            }
        );
        assert!(Cli::try_parse_from(["taskpilot", "cache"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "taskpilot",
            "--config",
            "taskpilot.yaml",
            "--verbose",
            "--json-logs",
            "health",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("taskpilot.yaml")));
        assert!(cli.verbose);

        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config);
        assert!(config.logging.json_logs);
    }

    #[test]
    fn test_print_summary() {
        let summary = AgentSummary {
            summary: "All good.\n".to_string(),
            metadata: TaskSummaryStats {
                total_tasks: 4,
                completed_tasks: 1,
                pending_tasks: 3,
                completion_rate: 25.0,
            },
            generated_at: Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap(),
            prompt_type: "project_summary".to_string(),
        };

        let mut out = Vec::new();
        print_summary(&summary, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("All good.\n\n"));
        assert!(text.contains("4 total, 1 completed, 3 pending (25.0% complete)"));
        assert!(text.contains("Generated at 2024-06-15 12:00:00 UTC"));
    }

    #[test]
    fn test_print_recommendations_lists_overdue() {
        let recommendations = AgentRecommendations {
            recommendations: "Do the thing".to_string(),
            metadata: RecommendationStats {
                total_pending_tasks: 3,
                high_priority_tasks: 1,
                overdue_tasks: 2,
                overdue_task_ids: vec![4, 9],
            },
            generated_at: Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap(),
            prompt_type: "task_recommendations".to_string(),
        };

        let mut out = Vec::new();
        print_recommendations(&recommendations, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Pending: 3, high priority: 1, overdue: 2"));
        assert!(text.contains("Overdue task ids: 4, 9"));
    }

    #[test]
    fn test_print_disconnected_cache() {
        let stats = CacheStats {
            connected: false,
            backend: "redis".to_string(),
            namespace: "ai_cache".to_string(),
            error: Some("connection refused".to_string()),
            ..CacheStats::default()
        };

        let mut out = Vec::new();
        print_cache_stats(&stats, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Cache backend: redis (disconnected)"));
        assert!(text.contains("Last error: connection refused"));

        let mut out = Vec::new();
        print_clear_outcome(
            &ClearOutcome {
                success: false,
                removed: 0,
            },
            &mut out,
        )
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Cache unavailable; nothing cleared\n");
    }
}
