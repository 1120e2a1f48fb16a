//! convoy orchestrator - main entry point
//!
//! Builds the immutable routing table and the keyword classifier from a
//! TOML config and serves the orchestration endpoint until interrupted.

use clap::{Parser, Subcommand};
use convoy::config::OrchestratorConfig;
use convoy::observability::init_default_logging;
use convoy::orchestrator::{service, Orchestrator};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

/// convoy orchestrator
#[derive(Parser)]
#[command(name = "convoy-orchestrator")]
#[command(about = "Run the convoy orchestration agent")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the orchestrator
    Run,
    /// Validate configuration
    Config {
        /// Show the parsed configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_default_logging();

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load configuration: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_orchestrator(config).await,
        Commands::Config { show } => handle_config_command(config, show),
    };

    if let Err(e) = result {
        error!("command failed: {e}");
        process::exit(1);
    }
}

fn load_configuration(
    config_path: &Option<PathBuf>,
) -> Result<OrchestratorConfig, Box<dyn std::error::Error>> {
    match config_path {
        Some(path) => {
            info!("loading configuration from: {}", path.display());
            Ok(OrchestratorConfig::load_from_file(path)?)
        }
        None => {
            for path_str in ["orchestrator.toml", "config/orchestrator.toml"] {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("loading configuration from: {}", path.display());
                    return Ok(OrchestratorConfig::load_from_file(&path)?);
                }
            }
            Err(
                "no configuration file found; pass one with -c/--config or create orchestrator.toml"
                    .into(),
            )
        }
    }
}

async fn run_orchestrator(config: OrchestratorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = Arc::new(Orchestrator::from_config(&config));
    info!(
        orchestrator_id = %orchestrator.id(),
        routed_agents = orchestrator.table().entries().len(),
        "routing table loaded"
    );

    let addr: SocketAddr = format!("{}:{}", config.http.bind, config.http.port).parse()?;
    let (bound, server) = service::bind_with_shutdown(orchestrator, addr, async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to listen for shutdown signal: {e}");
        }
        info!("shutdown signal received");
    });

    info!(address = %bound, "orchestrator listening");
    server.await;
    info!("orchestrator shutdown complete");
    Ok(())
}

fn handle_config_command(
    config: OrchestratorConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("configuration is valid");
    if show {
        println!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}
