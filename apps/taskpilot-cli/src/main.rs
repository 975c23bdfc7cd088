//! TaskPilot - task manager backend with cached AI summaries and recommendations

use anyhow::Context;
use clap::Parser;
use taskpilot_cli::{logging, run_command, server, AppContext, Cli, Commands};
use taskpilot_core::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);

    let _log_guard =
        logging::init_logging(&config.logging, cli.verbose).context("Failed to initialize logging")?;

    let ctx = AppContext::from_config(&config)
        .await
        .context("Failed to initialize TaskPilot")?;

    match &cli.command {
        Commands::Serve { .. } => {
            let address = config.server.bind_address();
            server::serve(ctx, &address)
                .await
                .with_context(|| format!("HTTP server on {address} failed"))?;
        }
        command => {
            run_command(command, &ctx, &mut std::io::stdout()).await?;
        }
    }

    Ok(())
}
