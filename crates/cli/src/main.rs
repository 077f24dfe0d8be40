//! Washday CLI - Database migrations and setup checks.
//!
//! # Usage
//!
//! ```bash
//! # Apply the marketplace schema and session store table
//! washday-cli migrate
//!
//! # Report which marketplace relations exist
//! washday-cli schema check
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "washday-cli")]
#[command(author, version, about = "Washday CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Inspect the database schema
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },
}

#[derive(Subcommand)]
enum SchemaAction {
    /// Report missing marketplace relations
    Check,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::Schema { action } => match action {
            SchemaAction::Check => commands::schema::check().await,
        },
    }
}
