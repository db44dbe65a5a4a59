//! OrbitChat CLI: the main entry point.
//!
//! Commands:
//! - `serve`   start the HTTP server and web frontend
//! - `chat`    terminal chat against a running server
//! - `doctor`  check configuration and credentials

use clap::{Parser, Subcommand};

mod commands;
mod terminal;

#[derive(Parser)]
#[command(
    name = "orbitchat",
    about = "OrbitChat: a chatbot that grounds space questions in live NASA data",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the bind address
        #[arg(long)]
        host: Option<String>,
    },

    /// Chat with a running server from the terminal
    Chat {
        /// Print the reply as it is generated
        #[arg(short, long)]
        stream: bool,

        /// Server base URL (defaults to terminal.backend_url)
        #[arg(short, long, env = "ORBITCHAT_BACKEND_URL")]
        backend: Option<String>,
    },

    /// Diagnose configuration
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { port, host } => commands::serve::run(port, host).await?,
        Commands::Chat { stream, backend } => commands::chat::run(stream, backend).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
