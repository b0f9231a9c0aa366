//! QuestGenie CLI
//!
//! Loads configuration, resolves the completion-service API key and serves
//! the QuestGenie HTTP API until interrupted.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use questgenie_core::{create_router, AppState, Config};
use questgenie_llm::OpenAiClient;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Upper bound on the pause between idle-session sweeps.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// QuestGenie - Q&A feedback buddy
///
/// Generates practice questions on any topic, gives hints, critiques answers
/// and writes optimal code solutions using a hosted language model.
#[derive(Parser, Debug)]
#[command(name = "questgenie")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: questgenie.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,

    /// Interface to bind the HTTP server to
    #[arg(long, value_name = "ADDR")]
    host: Option<String>,

    /// Port for the HTTP server
    #[arg(short, long)]
    port: Option<u16>,

    /// Model to use for every prompt
    #[arg(short, long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("QuestGenie starting");
    tracing::debug!(config = ?args.config, "Config file");

    match run_server(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Runs the HTTP server.
///
/// 1. Load config and apply CLI overrides
/// 2. Load `.env` and resolve the API key
/// 3. Start the idle-session sweeper
/// 4. Bind and serve until Ctrl+C
async fn run_server(args: Args) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(ref host) = args.host {
        config.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(ref model) = args.model {
        config.model.clone_from(model);
    }

    // Re-validate after overrides
    config.validate()?;

    print_config(&config);

    load_env_file(args.config.as_deref());
    let api_key = config.resolve_api_key()?;

    let client = OpenAiClient::new(config.client_settings(api_key));
    let addr = config.socket_addr()?;
    let idle_timeout = config.session_idle_timeout();
    let state = AppState::new(config, Arc::new(client));
    let sweeper = Arc::clone(&state.sessions)
        .spawn_idle_sweeper(idle_timeout, idle_timeout.min(MAX_SWEEP_INTERVAL));
    let router = create_router(state);

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {addr}: {e}\n\nSuggestion: Try a different port with --port"
        )
    })?;

    println!();
    println!("QuestGenie running on http://{addr}");
    println!("Press Ctrl+C to stop");
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    sweeper.abort();

    tracing::info!("QuestGenie stopped");
    Ok(())
}

/// Resolves when Ctrl+C is received.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    tracing::info!("Received Ctrl+C, shutting down");
}

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Loads a `.env` file into the process environment.
///
/// A `.env` next to the config file wins over one in the working directory.
/// Variables already set in the environment are never overwritten.
fn load_env_file(config_path: Option<&str>) {
    let beside_config = config_path
        .and_then(|p| Path::new(p).parent())
        .map(|dir| dir.join(".env"))
        .filter(|p| p.exists());

    let loaded = match beside_config {
        Some(path) => dotenv::from_path(&path).map(|()| path),
        None => dotenv::dotenv(),
    };
    match loaded {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) => tracing::debug!(error = %e, "No .env file loaded"),
    }
}

/// Prints the loaded configuration.
fn print_config(config: &Config) {
    println!("Configuration loaded:");
    println!("  Completion API: {}", config.base_url);
    println!("  Model: {}", config.model);
    println!("  Temperature: {}", config.temperature);
    println!("  Max tokens: {}", config.max_tokens);
    println!("  API key variable: {}", config.api_key_env);
    println!("  Session idle timeout: {}s", config.session_idle_secs);
}
