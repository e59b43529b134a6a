use anyhow::Result;
use clap::Parser;
use rescale::config::Config;
use tracing::{debug, info, trace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod connection;
mod output;

use cli::{Cli, Commands};
use connection::ConnectionManager;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level
    init_tracing(cli.verbose);

    // Load configuration from specified path or default location
    let (config, config_path) = if let Some(config_file) = &cli.config_file {
        debug!("Loading config from explicit path: {:?}", config_file);
        (Config::load_from_path(config_file)?, Some(config_file.clone()))
    } else {
        debug!("Loading config from default location");
        (Config::load()?, None)
    };
    let conn_mgr = ConnectionManager::with_config_path(config, config_path);

    if let Err(e) = execute_command(&cli, &conn_mgr).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    // Check for RUST_LOG env var first, then fall back to verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "rescalectl=warn,rescale=warn",
            1 => "rescalectl=info,rescale=info",
            2 => "rescalectl=debug,rescale=debug",
            _ => "rescalectl=trace,rescale=trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

async fn execute_command(cli: &Cli, conn_mgr: &ConnectionManager) -> Result<()> {
    trace!("Executing command: {:?}", cli.command);

    let client = conn_mgr.create_client(cli.profile.as_deref(), cli.timeout)?;
    let start = std::time::Instant::now();

    let result = match &cli.command {
        Commands::Jobs(command) => commands::jobs::handle(&client, command).await,
        Commands::Files(command) => commands::files::handle(&client, command).await,
        Commands::Clusters(command) => commands::clusters::handle(&client, command).await,
        Commands::Storage(command) => commands::storage::handle(&client, command).await,
        Commands::Coretypes => commands::core_types(&client).await,
    };

    info!("Command finished in {:?}", start.elapsed());
    result
}
