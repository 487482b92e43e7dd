//! Nexus CLI and REST API entry point.
//!
//! Binary name: `nexus`
//!
//! Parses CLI arguments, initializes database and services, then dispatches
//! to the appropriate command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands, CreateResource, KeyCommand, ListResource, TeamCommand};
use nexus_observe::tracing_setup::{init_tracing, shutdown_tracing, verbosity_directive};
use nexus_types::bot::CreateBotRequest;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing or app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "nexus", &mut std::io::stdout());
        return Ok(());
    }

    let otel = matches!(cli.command, Commands::Serve { otel: true, .. });
    init_tracing(verbosity_directive(cli.verbose, cli.quiet), otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let state = AppState::init().await?;
    let user = cli.user.as_str();

    match cli.command {
        Commands::Create { resource } => match resource {
            CreateResource::Bot {
                name,
                model,
                description,
                system_prompt,
                temperature,
                max_tokens,
                role,
            } => {
                let request = CreateBotRequest {
                    name,
                    model: model.unwrap_or_else(|| state.config.provider.default_model.clone()),
                    description,
                    system_prompt,
                    temperature,
                    max_tokens,
                    role,
                };
                cli::roster::create_bot(&state, user, request, cli.json).await?;
            }
            CreateResource::Team { name, description } => {
                cli::roster::create_team(&state, user, name, description, cli.json).await?;
            }
        },

        Commands::List { resource } => match resource {
            ListResource::Bots => {
                cli::roster::list_bots(&state, user, cli.json).await?;
            }
            ListResource::Sessions { team_id } => {
                cli::roster::list_sessions(&state, user, &team_id, cli.json).await?;
            }
        },

        Commands::Team { action } => match action {
            TeamCommand::AddBot { team_id, bot_id } => {
                cli::roster::add_team_bot(&state, user, &team_id, &bot_id, cli.json).await?;
            }
            TeamCommand::RemoveBot { team_id, bot_id } => {
                cli::roster::remove_team_bot(&state, user, &team_id, &bot_id, cli.json).await?;
            }
        },

        Commands::Key { action } => match action {
            KeyCommand::Create { name } => {
                cli::key::create_key(&state, user, &name, cli.json).await?;
            }
        },

        Commands::Serve { port, host, .. } => {
            // First start: mint a key so the API is usable at all
            if let Some(api_key) = http::extractors::auth::ensure_api_key(&state.db_pool, user).await? {
                cli::key::print_new_key(user, &api_key);
            }

            let host = host.unwrap_or_else(|| state.config.server.host.clone());
            let port = port.unwrap_or(state.config.server.port);
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} Nexus API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}/api/v1")).cyan()
            );
            println!(
                "  {}",
                console::style(format!(
                    "Provider: {} ({})",
                    state.config.provider.name, state.config.provider.default_model
                ))
                .dim()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());
            tracing::info!(%addr, "serving REST API");

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
///
/// A handler that fails to install is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
