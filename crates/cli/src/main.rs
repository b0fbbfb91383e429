//! TechShop CLI - Database migrations, catalog seeding and order management.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! ts-cli migrate
//!
//! # Load categories, features and products from YAML
//! ts-cli seed catalog crates/cli/seed/catalog.yaml
//!
//! # List orders, optionally by status
//! ts-cli orders list --status new
//!
//! # Move an order along
//! ts-cli orders set-status 42 in_progress
//!
//! # Delete anonymous carts idle for more than 30 days
//! ts-cli carts prune --older-than-days 30
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use techshop_core::{OrderId, OrderStatus};
use techshop_storefront::middleware::session::SESSION_EXPIRY_DAYS;

mod commands;

#[derive(Parser)]
#[command(name = "ts-cli")]
#[command(author, version, about = "TechShop operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Load data into the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Maintain shopping carts
    Carts {
        #[command(subcommand)]
        action: CartsAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Upsert categories, features and products from a YAML file
    Catalog {
        /// Path to the catalog YAML file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List orders, newest first
    List {
        /// Only show orders with this status (`new`, `in_progress`, `is_ready`, `completed`)
        #[arg(short, long)]
        status: Option<OrderStatus>,
    },
    /// Change the status of an order
    SetStatus {
        /// Order ID
        id: OrderId,
        /// New status (`new`, `in_progress`, `is_ready`, `completed`)
        status: OrderStatus,
    },
}

#[derive(Subcommand)]
enum CartsAction {
    /// Delete anonymous carts that have not changed for a while
    Prune {
        /// Idle days before a cart is deleted (defaults to the session lifetime)
        #[arg(
            long,
            default_value_t = SESSION_EXPIRY_DAYS,
            value_parser = clap::value_parser!(i64).range(1..)
        )]
        older_than_days: i64,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { file } => commands::seed::catalog(&file).await?,
        },
        Commands::Orders { action } => match action {
            OrdersAction::List { status } => commands::orders::list(status).await?,
            OrdersAction::SetStatus { id, status } => {
                commands::orders::set_status(id, status).await?;
            }
        },
        Commands::Carts { action } => match action {
            CartsAction::Prune { older_than_days } => {
                commands::carts::prune(older_than_days).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_defaults_to_session_lifetime() {
        let cli = Cli::try_parse_from(["ts-cli", "carts", "prune"]).unwrap();
        let Commands::Carts {
            action: CartsAction::Prune { older_than_days },
        } = cli.command
        else {
            panic!("expected carts prune");
        };
        assert_eq!(older_than_days, SESSION_EXPIRY_DAYS);
    }

    #[test]
    fn test_prune_rejects_non_positive_days() {
        assert!(Cli::try_parse_from(["ts-cli", "carts", "prune", "--older-than-days", "0"]).is_err());
        assert!(Cli::try_parse_from(["ts-cli", "carts", "prune", "--older-than-days", "30"]).is_ok());
    }

    #[test]
    fn test_order_status_argument() {
        let cli = Cli::try_parse_from(["ts-cli", "orders", "set-status", "42", "is_ready"]).unwrap();
        let Commands::Orders {
            action: OrdersAction::SetStatus { id, status },
        } = cli.command
        else {
            panic!("expected orders set-status");
        };
        assert_eq!(id, OrderId::new(42));
        assert_eq!(status, OrderStatus::Ready);
    }
}
