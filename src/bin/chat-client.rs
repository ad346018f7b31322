//! Terminal client for the chatroom.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use chatroom::client::{connect_with_retry, ChannelSink, SessionError, SinkEvent, Target};
use chatroom::config::{load_config, validate_config, ChatConfig};
use chatroom::lifecycle::console_lines;
use chatroom::observability::logging;
use clap::Parser;

const QUIT_COMMAND: &str = "/quit";

#[derive(Parser)]
#[command(name = "chat-client")]
#[command(about = "Join a chatroom relay server", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host (overrides client.host).
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides client.port).
    #[arg(short, long)]
    port: Option<u16>,

    /// Display name; asked for interactively when omitted.
    #[arg(short, long)]
    name: Option<String>,
}

/// Read one trimmed line from stdin, after printing `label`.
fn ask(label: &str) -> Option<String> {
    print!("{}", label);
    io::stdout().flush().ok()?;
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ChatConfig::default(),
    };
    if let Some(host) = cli.host {
        config.client.host = host;
    }
    if let Some(port) = cli.port {
        config.client.port = port;
    }
    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            eprintln!("config error: {}", error);
        }
        return Err("invalid configuration".into());
    }

    logging::init_logging_stderr(&logging::crate_directive("warn"));

    let name = match cli.name {
        Some(name) => name,
        None => ask("Enter your name: ").ok_or("no name given")?,
    };

    let (sink, mut events) = ChannelSink::new();
    let port = config.client.port;
    let mut prompt = |failure: &SessionError| {
        println!("{}\n", failure);
        tokio::task::block_in_place(|| ask("Enter the host IP address: "))
            .filter(|host| !host.is_empty())
            .map(|host| Target::new(host, port))
    };

    println!("Attempting connection to {}:{}...", config.client.host, port);
    let initial = Target::new(config.client.host.clone(), port);
    let session = connect_with_retry(initial, &name, &config, Arc::new(sink), &mut prompt).await?;
    println!(
        "Hello, {}! Connected to {}. Type {} to leave.",
        session.display_name(),
        session.server_addr(),
        QUIT_COMMAND
    );

    let mut input = console_lines();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SinkEvent::Message(line)) => println!("{}", line),
                Some(SinkEvent::Closed) | None => {
                    tracing::debug!(server = %session.server_addr(), "Server closed the session");
                    return Ok(());
                }
            },
            line = input.recv() => match line {
                Some(line) if line.trim() == QUIT_COMMAND => break,
                Some(line) if line.trim().is_empty() => {}
                Some(line) => match session.send(&line).await {
                    Ok(()) => println!("{}: {}", session.display_name(), line),
                    Err(e) => eprintln!("Not sent: {}", e),
                },
                None => break,
            }
        }
    }

    println!("Disconnecting from server...");
    if let Err(e) = session.quit().await {
        tracing::warn!(error = %e, "Leave announcement not delivered");
    }
    Ok(())
}
