//! convoy domain agent - main entry point
//!
//! Runs one domain agent from a TOML config: opens its task store, resolves
//! the provider chain from config and environment, and serves the protocol
//! over HTTP until interrupted.

use clap::{Parser, Subcommand};
use convoy::agent::{service, DomainAgent};
use convoy::config::AgentConfig;
use convoy::observability::init_default_logging;
use convoy::providers::ProviderChain;
use convoy::store::TaskStore;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

/// convoy domain agent
#[derive(Parser)]
#[command(name = "convoy-agent")]
#[command(about = "Run a convoy domain agent")]
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
    /// Run the agent
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
        Commands::Run => run_agent(config).await,
        Commands::Config { show } => handle_config_command(config, show),
    };

    if let Err(e) = result {
        error!("command failed: {e}");
        process::exit(1);
    }
}

fn load_configuration(config_path: &Option<PathBuf>) -> Result<AgentConfig, Box<dyn std::error::Error>> {
    match config_path {
        Some(path) => {
            info!("loading configuration from: {}", path.display());
            Ok(AgentConfig::load_from_file(path)?)
        }
        None => {
            for path_str in ["agent.toml", "config/agent.toml"] {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("loading configuration from: {}", path.display());
                    return Ok(AgentConfig::load_from_file(&path)?);
                }
            }
            Err("no configuration file found; pass one with -c/--config or create agent.toml".into())
        }
    }
}

async fn run_agent(config: AgentConfig) -> Result<(), Box<dyn std::error::Error>> {
    let settings = config.provider_settings()?;
    let chain = ProviderChain::new(&settings);
    info!(
        agent_id = %config.agent.id,
        plan = ?chain.plan_labels(),
        "provider plan resolved"
    );

    let store = match &config.store.path {
        Some(path) => TaskStore::open(path, config.agent.id.as_str())?,
        None => {
            info!("no store path configured, task records will not survive restart");
            TaskStore::temporary(config.agent.id.as_str())?
        }
    };

    let agent = Arc::new(DomainAgent::new(
        config.agent.id.clone(),
        config.agent.description.clone(),
        store,
        chain,
    ));

    let addr: SocketAddr = format!("{}:{}", config.http.bind, config.http.port).parse()?;
    let (bound, server) = service::bind_with_shutdown(agent, addr, async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to listen for shutdown signal: {e}");
        }
        info!("shutdown signal received");
    });

    info!(agent_id = %config.agent.id, address = %bound, "agent listening");
    server.await;
    info!("agent shutdown complete");
    Ok(())
}

fn handle_config_command(config: AgentConfig, show: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("configuration is valid");
    if show {
        println!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}
