// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Comanda - natural-language order extraction with catalog resolution.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod catalog;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use comanda_config::ComandaConfig;
use comanda_core::ComandaError;

/// Comanda - turn free-form order messages into structured orders.
#[derive(Parser, Debug)]
#[command(name = "comanda", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the default locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway.
    Serve,
    /// Run one extraction turn and print the outcome as JSON.
    Extract {
        /// The order message.
        text: String,
        /// Continue an existing conversation.
        #[arg(long)]
        conversation: Option<String>,
    },
    /// Manage the product catalog.
    Catalog {
        #[command(subcommand)]
        action: CatalogCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// Add a product.
    Add {
        name: String,
        #[arg(long, default_value = "")]
        flavor: String,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
    },
    /// List all products.
    List,
    /// Remove a product by id.
    Remove { id: i64 },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => comanda_config::load_and_validate_path(path),
        None => comanda_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            comanda_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.agent.log_level);

    if let Err(e) = run(cli.command, config).await {
        eprintln!("comanda: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: ComandaConfig) -> Result<(), ComandaError> {
    match command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Extract { text, conversation } => {
            serve::run_extract(config, &text, conversation.as_deref()).await
        }
        Commands::Catalog { action } => match action {
            CatalogCommand::Add {
                name,
                flavor,
                quantity,
            } => catalog::add(&config, name, flavor, quantity).await,
            CatalogCommand::List => catalog::list(&config).await,
            CatalogCommand::Remove { id } => catalog::remove(&config, id).await,
        },
    }
}

const CRATES: [&str; 8] = [
    "comanda",
    "comanda_agent",
    "comanda_config",
    "comanda_context",
    "comanda_extract",
    "comanda_gateway",
    "comanda_openai",
    "comanda_storage",
];

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<String> = CRATES
            .iter()
            .map(|krate| format!("{krate}={log_level}"))
            .collect();
        EnvFilter::new(format!("warn,{}", directives.join(",")))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn parses_extract_with_conversation() {
        let cli = Cli::try_parse_from([
            "comanda",
            "extract",
            "two juices tomorrow",
            "--conversation",
            "c-1",
        ])
        .unwrap();
        match cli.command {
            Commands::Extract { text, conversation } => {
                assert_eq!(text, "two juices tomorrow");
                assert_eq!(conversation.as_deref(), Some("c-1"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn catalog_add_defaults() {
        let cli = Cli::try_parse_from(["comanda", "catalog", "add", "vape"]).unwrap();
        match cli.command {
            Commands::Catalog {
                action:
                    CatalogCommand::Add {
                        name,
                        flavor,
                        quantity,
                    },
            } => {
                assert_eq!(name, "vape");
                assert_eq!(flavor, "");
                assert_eq!(quantity, 1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_config_flag() {
        let cli = Cli::try_parse_from(["comanda", "catalog", "list", "--config", "/tmp/c.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = comanda_config::load_and_validate_str("").expect("defaults are valid");
        assert_eq!(config.agent.name, "comanda");
    }
}
