//! cmdkit CLI entry point.
//!
//! Binary name: `cmdkit`
//!
//! Parses CLI arguments, sets up tracing, loads configuration and persisted
//! variables, then dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands};
use cmdkit_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = TracingOptions::from_verbosity(cli.verbose, cli.quiet)
        .json(cli.log_json)
        .otel(cli.otel);
    init_tracing(&options).map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = dispatch(cli).await;
    shutdown_tracing();
    result
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "cmdkit", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init(cli.data_dir.clone()).await?;

    match cli.command {
        Commands::Run {
            file,
            session,
            args,
        } => {
            let cancel = CancellationToken::new();
            tokio::spawn(cancel_on_ctrl_c(cancel.clone()));
            cli::run::run_file(&state, &file, session, args, cancel, cli.json).await?;
        }

        Commands::Vars { scope, session } => {
            cli::vars::list_vars(&state, scope, session, cli.json).await?;
        }

        Commands::Set {
            path,
            value,
            scope,
            session,
        } => {
            cli::vars::set_var(&state, &path, &value, &scope, session, cli.json).await?;
        }

        Commands::Operations => {
            cli::operations::list_operations(&state.catalogue, cli.json)?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Cancel `token` on Ctrl+C. The engine stops before the next operation.
async fn cancel_on_ctrl_c(token: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::warn!("interrupt received, cancelling command");
            token.cancel();
        }
        Err(err) => tracing::warn!("failed to install Ctrl+C handler: {err}"),
    }
}
