//! Filedir Daemon
//!
//! HTTP file management over a single storage directory.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use filedir::config::{default_config_path, Config};
use filedir::HttpServer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{reload, EnvFilter, Registry};

/// Filedir - manage the files of one directory over HTTP.
#[derive(Parser, Debug)]
#[command(name = "filedir")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to bind
        #[arg(long, short)]
        port: Option<u16>,

        /// Storage root directory
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
    },

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing before anything that logs
    let reload_handle = init_tracing(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    let command = cli.command.clone().unwrap_or(Commands::Serve {
        host: None,
        port: None,
        root: None,
    });

    match command {
        Commands::Serve { host, port, root } => {
            tracing::info!("Using config file: {:?}", config_path);
            let config = load_config(&config_path, host, port, root)?;

            if let Some(handle) = reload_handle {
                apply_log_level(&handle, &config.daemon.log_level);
            }

            run_server(config).await?;
        }
        Commands::InitConfig { force } => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {} (use --force to overwrite)",
                    config_path.display()
                );
            }

            Config::default().save(&config_path)?;
            println!("Wrote default configuration to {}", config_path.display());
        }
    }

    Ok(())
}

/// Handle for swapping the log filter once the configuration is known.
type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Initialize tracing.
///
/// `--verbose` and `RUST_LOG` fix the filter for the whole run. Otherwise
/// logging starts at `info` and the returned handle applies the configured
/// level once the configuration has been loaded.
fn init_tracing(verbose: bool) -> Option<FilterHandle> {
    if verbose {
        tracing_subscriber::fmt().with_env_filter("debug").init();
        return None;
    }

    if let Ok(filter) = EnvFilter::try_from_default_env() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return None;
    }

    let (filter, handle) = reload::Layer::new(EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
    Some(handle)
}

fn apply_log_level(handle: &FilterHandle, level: &str) {
    if let Err(e) = handle.reload(EnvFilter::new(level.to_lowercase())) {
        tracing::warn!("Failed to apply log level {}: {}", level, e);
    }
}

/// Load the configuration file, then apply environment and CLI overrides.
fn load_config(
    path: &Path,
    host: Option<String>,
    port: Option<u16>,
    root: Option<PathBuf>,
) -> anyhow::Result<Config> {
    let mut config = Config::load(path)?;
    config.apply_env_overrides();

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(root) = root {
        config.storage.root_dir = root;
    }

    config.validate()?;
    Ok(config)
}

/// Bind the server and run it until a shutdown signal arrives.
async fn run_server(config: Config) -> anyhow::Result<()> {
    let frontend_dir = config.server.frontend_dir.clone();
    let server = HttpServer::bind(config).await?;
    let addr = server.local_addr()?;

    tracing::info!("Filedir server running at http://{}", addr);
    tracing::info!("Files stored in: {}", server.state().browser().root().display());
    tracing::info!(
        "Frontend served from {} at http://{}",
        frontend_dir.display(),
        addr
    );

    server.serve(wait_for_shutdown_signal()).await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
        _ => {
            tracing::warn!("Failed to register signal handlers, waiting for Ctrl-C");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
            }
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT");
        }
    }
}
