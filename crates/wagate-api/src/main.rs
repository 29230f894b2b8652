//! Wagate gateway entry point.
//!
//! Binary name: `wagate`
//!
//! Parses CLI arguments, wires the session manager, then starts the REST
//! API server or runs a one-off command.

mod http;
mod state;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use state::AppState;

/// Multi-session chat-network HTTP gateway.
#[derive(Parser)]
#[command(name = "wagate", version, about, long_about = None)]
struct Cli {
    /// Suppress all output except errors.
    #[arg(long, global = true)]
    quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server.
    Serve {
        /// Address to bind.
        #[arg(long, env = "WAGATE_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on.
        #[arg(long, env = "WAGATE_PORT", default_value_t = 3000)]
        port: u16,
    },

    /// Print the resolved configuration and data directory.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,wagate=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let state = AppState::init().await?;

    match cli.command {
        Commands::Serve { host, port } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!(%addr, "starting API server");

            println!(
                "  {} Wagate API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            if state.api_key_hash.is_none() {
                println!(
                    "  {}",
                    console::style("No API key configured -- running open (dev mode)").yellow()
                );
            }
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            info!("API server stopped");
            println!("\n  Server stopped.");
        }

        Commands::Config => {
            let config = wagate_engine::load_gateway_config(&state.data_dir).await;
            println!(
                "  {} Data directory: {}",
                console::style("⚙").bold(),
                console::style(state.data_dir.display()).cyan()
            );
            println!("  Default engine:  {}", config.engine);
            println!("  Auth timeout:    {}s", config.auth_timeout_secs);
            println!(
                "  API key:         {}",
                if state.api_key_hash.is_some() { "configured" } else { "none (dev mode)" }
            );
            match &config.remote {
                Some(remote) => println!("  Remote daemon:   {}", remote.base_url),
                None => println!("  Remote daemon:   not configured"),
            }
        }
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
