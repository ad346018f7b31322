//! Chatroom relay server.

use std::net::SocketAddr;
use std::path::PathBuf;

use chatroom::config::{load_config, validate_config, ChatConfig};
use chatroom::lifecycle::{wait_for_stop_request, Shutdown};
use chatroom::observability::{logging, metrics};
use chatroom::ChatServer;
use clap::Parser;

#[derive(Parser)]
#[command(name = "chatroom")]
#[command(about = "Relay server for the text chatroom", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host or IP to bind (overrides server.bind_address).
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides server.port).
    #[arg(short, long)]
    port: Option<u16>,

    /// Pin the shift key instead of choosing one at random.
    #[arg(long)]
    shift: Option<u8>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ChatConfig::default(),
    };
    if let Some(host) = cli.host {
        config.server.bind_address = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if cli.shift.is_some() {
        config.server.shift = cli.shift;
    }
    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            eprintln!("config error: {}", error);
        }
        return Err("invalid configuration".into());
    }

    logging::init_logging(&logging::crate_directive(&config.observability.log_level));
    tracing::info!("chatroom v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.server.bind_address,
        port = config.server.port,
        max_connections = config.server.max_connections,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = match ChatServer::bind(&config.server.bind_address, config.server.port, &config).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Cannot start server");
            return Err(e.into());
        }
    };
    println!("Listening at {} (type 'q' to quit)", server.local_addr()?);

    let shutdown = Shutdown::new();
    let server_task = tokio::spawn(server.run(shutdown.subscribe()));

    let request = wait_for_stop_request().await;
    tracing::info!(request = ?request, "Closing all connections");
    shutdown.trigger();
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
