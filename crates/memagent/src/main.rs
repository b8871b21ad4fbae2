//! memagent - arithmetic chat agent with per-thread memory

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod client;
mod commands;

use commands::{
    engage_command, remote_command, serve_command, setup_command, smoke_command, status_command,
};

const DEFAULT_URL: &str = "http://localhost:8000";

/// memagent - arithmetic agent with conversation memory
#[derive(Parser)]
#[command(name = "memagent")]
#[command(about = "Arithmetic chat agent with per-thread memory behind a REST API")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP service
    Serve {
        /// Bind host (overrides HOST)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Chat with the agent directly
    Engage {
        /// Message to send; omit for interactive mode
        #[arg(short, long)]
        message: Option<String>,
        /// Conversation thread
        #[arg(short, long, default_value = "default")]
        thread: String,
    },
    /// Chat with a running server
    Remote {
        /// Server base URL
        #[arg(short, long, default_value = DEFAULT_URL)]
        url: String,
        /// Conversation thread
        #[arg(short, long, default_value = "default")]
        thread: String,
    },
    /// Run an end-to-end check against a running server
    Smoke {
        /// Server base URL
        #[arg(short, long, default_value = DEFAULT_URL)]
        url: String,
    },
    /// Write a .env file with the API key and server defaults
    Setup {
        /// Key to write; prompts when omitted
        #[arg(long)]
        api_key: Option<String>,
        /// Overwrite an existing .env
        #[arg(short, long)]
        force: bool,
    },
    /// Show resolved configuration
    Status,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
            EnvFilter::new(level)
        })
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Serve { host, port } => serve_command(host, port).await,
        Commands::Engage { message, thread } => engage_command(message, thread).await,
        Commands::Remote { url, thread } => remote_command(url, thread).await,
        Commands::Smoke { url } => smoke_command(url).await,
        Commands::Setup { api_key, force } => setup_command(api_key, force).await,
        Commands::Status => status_command().await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
