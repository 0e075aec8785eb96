//! GodMode wallet classifier - HTTP service and CLI
//!
//! # NOTE
//! - Without `PROVIDER_KEY` the public Alchemy `demo` key is used. It is
//!   rate limited and only suitable for local development.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

// Use the library crate
use godmode_classifier::cli::commands;
use godmode_classifier::config::Config;

/// GodMode wallet classifier
#[derive(Parser)]
#[command(name = "godmode")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "godmode.toml")]
    config: String,

    /// Emit logs as JSON
    #[arg(long, env = "GODMODE_JSON_LOGS")]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Listen address (overrides server.bind_addr)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Classify a single wallet and print the result
    Classify {
        /// Wallet address (0x-prefixed)
        address: String,
    },

    /// Show current configuration (secrets masked)
    Config,

    /// Show tracked tokens and their thresholds
    Tokens,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(
        "godmode_classifier=info"
            .parse()
            .expect("static log directive is valid"),
    );

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.json_logs);

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Serve { bind } => commands::serve(&config, bind).await,
        Commands::Classify { address } => commands::classify(&config, &address).await,
        Commands::Config => commands::show_config(&config),
        Commands::Tokens => commands::tokens(&config).await,
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
