// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tether - companion-side sync core.
//!
//! Pairs with a desktop client over a WebSocket relay, keeps unsent messages
//! in a durable outbox, and moves records between containers.

mod drain;
mod migrate;
mod outbox_cmd;
mod pair;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tether_config::TetherConfig;
use tether_core::TetherError;

/// Tether - companion-side sync core.
#[derive(Parser, Debug)]
#[command(name = "tether", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Pair with a desktop client and stay connected until interrupted.
    Pair {
        /// Six-digit pairing code shown by the desktop client.
        code: String,
    },
    /// Queue a message for the next time the link is up.
    Queue {
        /// Container (conversation) the message belongs to.
        container: String,
        /// Message text.
        content: String,
        /// Already-uploaded image to attach.
        #[arg(long)]
        image_url: Option<String>,
    },
    /// Inspect or empty the outbox.
    Outbox {
        #[command(subcommand)]
        action: OutboxCommands,
    },
    /// Move records from one container to another.
    Migrate {
        /// Source container id.
        #[arg(long)]
        from: String,
        /// Destination container id.
        #[arg(long)]
        to: String,
        /// Record ids to move.
        #[arg(required = true)]
        records: Vec<String>,
    },
    /// List stored containers.
    Containers,
}

#[derive(Subcommand, Debug)]
enum OutboxCommands {
    /// Show pending messages, oldest first.
    List {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Show pending counts and the last sync attempt.
    Status {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Delete every pending message and image.
    Clear,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => tether_config::load_and_validate_path(path),
        None => tether_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            tether_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config.log.level);

    let Some(command) = cli.command else {
        println!("tether: use --help for available commands");
        return;
    };
    if let Err(e) = run(command, &config).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &TetherConfig) -> Result<(), TetherError> {
    match command {
        Commands::Pair { code } => {
            let cancel = shutdown::install_signal_handler();
            pair::run_pair(config, &code, cancel).await
        }
        Commands::Queue {
            container,
            content,
            image_url,
        } => {
            let id = outbox_cmd::run_queue(&config.outbox, container, content, image_url).await?;
            println!("{id}");
            Ok(())
        }
        Commands::Outbox { action } => match action {
            OutboxCommands::List { json } => {
                let pending = outbox_cmd::run_list(&config.outbox).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&pending)?);
                } else {
                    outbox_cmd::print_list(&pending);
                }
                Ok(())
            }
            OutboxCommands::Status { json } => {
                let status = outbox_cmd::run_status(&config.outbox).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&status)?);
                } else {
                    outbox_cmd::print_status(&status);
                }
                Ok(())
            }
            OutboxCommands::Clear => {
                outbox_cmd::run_clear(&config.outbox).await?;
                println!("outbox cleared");
                Ok(())
            }
        },
        Commands::Migrate { from, to, records } => {
            let outcome = migrate::run_migrate(config, &records, &from, &to).await?;
            println!("{}", migrate::describe(&outcome, &from, &to));
            Ok(())
        }
        Commands::Containers => {
            let containers = migrate::run_containers(config).await?;
            migrate::print_containers(&containers);
            Ok(())
        }
    }
}

/// Initialize the tracing subscriber with an env filter.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tether={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
