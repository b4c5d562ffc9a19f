//! Samvad CLI and session server entry point.
//!
//! Binary name: `samvad`
//!
//! Parses CLI arguments, initializes the database and services, then
//! dispatches to the appropriate command handler or starts the
//! HTTP/WebSocket server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands, UserCommand, WalletCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity; `serve --otel` adds span export.
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,samvad=debug",
        _ => "trace",
    };
    let otel = matches!(cli.command, Commands::Serve { otel: true, .. });
    samvad_observe::init_tracing(filter, otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "samvad", &mut std::io::stdout());
        return Ok(());
    }

    // Initialize application state (DB, services)
    let state = AppState::init().await?;

    match cli.command {
        Commands::Serve { port, host, .. } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} Samvad listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!(
                "  {}",
                console::style("Press Ctrl+C to stop").dim()
            );

            let registry = state.registry.clone();
            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            // Stop session actors; each persists its current row first.
            registry.shutdown();
            samvad_observe::shutdown_tracing();
            println!("\n  Server stopped.");
        }

        Commands::User { action } => match action {
            UserCommand::Add {
                phone,
                name,
                provider,
            } => {
                cli::admin::add_user(&state, &phone, &name, provider, cli.json).await?;
            }
            UserCommand::Token { user_id } => {
                cli::admin::issue_token(&state, &user_id, cli.json).await?;
            }
        },

        Commands::Wallet { action } => match action {
            WalletCommand::Topup { user_id, amount } => {
                cli::admin::topup_wallet(&state, &user_id, amount, cli.json).await?;
            }
            WalletCommand::Balance { user_id } => {
                cli::admin::show_balance(&state, &user_id, cli.json).await?;
            }
        },

        Commands::Rate { provider_id, rate } => {
            cli::admin::set_rate(&state, &provider_id, rate, cli.json).await?;
        }

        Commands::Sessions { limit } => {
            cli::session::list_sessions(&state, limit, cli.json).await?;
        }

        Commands::Status => {
            cli::status::status(&state, cli.json).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
