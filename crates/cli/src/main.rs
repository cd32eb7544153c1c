//! Sweet Shop CLI - storefront and admin front end.
//!
//! # Usage
//!
//! ```bash
//! # Point at the API and log in
//! export SWEET_SHOP_API_URL=http://localhost:8050
//! sweet-shop login -e customer@example.com -p hunter22
//!
//! # Browse
//! sweet-shop list
//! sweet-shop search --category chocolate --max-price 5
//!
//! # Buy
//! sweet-shop purchase 42 --quantity 2
//!
//! # Admin
//! sweet-shop add --name Fudge --category chocolate --price 3.50 --quantity 20
//! sweet-shop restock 42 --quantity 10
//! ```
//!
//! Credentials persist in the platform config directory (override with
//! `SWEET_SHOP_CREDENTIALS`), so the session survives across invocations.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use sweet_shop_client::{ApiClient, ClientConfig, Inventory, JsonFileStore, SessionManager};
use sweet_shop_core::{Email, SweetId};

mod commands;

#[derive(Parser)]
#[command(name = "sweet-shop")]
#[command(author, version, about = "Sweet Shop storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and persist the session
    Login {
        /// Account email address
        #[arg(short, long)]
        email: Email,

        /// Account password
        #[arg(short, long)]
        password: String,
    },
    /// Register a new account (does not log in)
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Account email address
        #[arg(short, long)]
        email: Email,

        /// Account password (min 8 characters)
        #[arg(short, long)]
        password: String,
    },
    /// Discard the persisted session
    Logout,
    /// Show the current session
    Whoami,
    /// List all sweets
    List,
    /// Search sweets by name, category, and price range
    Search {
        /// Substring match on the name
        #[arg(long)]
        name: Option<String>,

        /// Exact category match
        #[arg(long)]
        category: Option<String>,

        /// Inclusive lower price bound
        #[arg(long)]
        min_price: Option<Decimal>,

        /// Inclusive upper price bound
        #[arg(long)]
        max_price: Option<Decimal>,
    },
    /// Add a new sweet (admin)
    Add {
        /// Display name
        #[arg(long)]
        name: String,

        /// Category label
        #[arg(long)]
        category: String,

        /// Unit price
        #[arg(long)]
        price: Decimal,

        /// Initial stock
        #[arg(long)]
        quantity: u32,

        /// Free-form description
        #[arg(long)]
        description: Option<String>,
    },
    /// Update a sweet in place (admin)
    Update {
        /// Sweet id
        id: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// Category label
        #[arg(long)]
        category: String,

        /// Unit price
        #[arg(long)]
        price: Decimal,

        /// Stock level
        #[arg(long)]
        quantity: u32,

        /// Free-form description
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a sweet (admin)
    Delete {
        /// Sweet id
        id: String,
    },
    /// Purchase units of a sweet
    Purchase {
        /// Sweet id
        id: String,

        /// Units to buy
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Restock units of a sweet (admin)
    Restock {
        /// Sweet id
        id: String,

        /// Units to add
        #[arg(short, long)]
        quantity: u32,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    let store = Arc::new(JsonFileStore::new(credentials_path()));
    let session = SessionManager::new(&config, store)?;
    session.set_expiry_hook(Box::new(|| {
        tracing::warn!("session expired, please log in again");
    }));
    let gateway = ApiClient::new(&config, session.clone())?;
    let inventory = Inventory::new(gateway);

    match cli.command {
        Commands::Login { email, password } => {
            commands::auth::login(&session, &email, &password).await?;
        }
        Commands::Register {
            name,
            email,
            password,
        } => commands::auth::register(&session, name, email, password).await?,
        Commands::Logout => commands::auth::logout(&session)?,
        Commands::Whoami => commands::auth::whoami(&session),
        Commands::List => commands::sweets::list(&inventory).await?,
        Commands::Search {
            name,
            category,
            min_price,
            max_price,
        } => commands::sweets::search(&inventory, name, category, min_price, max_price).await?,
        Commands::Add {
            name,
            category,
            price,
            quantity,
            description,
        } => {
            commands::sweets::add(&inventory, name, category, price, quantity, description)
                .await?;
        }
        Commands::Update {
            id,
            name,
            category,
            price,
            quantity,
            description,
        } => {
            commands::sweets::update(
                &inventory,
                &SweetId::new(id),
                name,
                category,
                price,
                quantity,
                description,
            )
            .await?;
        }
        Commands::Delete { id } => {
            commands::sweets::delete(&inventory, &SweetId::new(id)).await?;
        }
        Commands::Purchase { id, quantity } => {
            commands::sweets::purchase(&inventory, &SweetId::new(id), quantity).await?;
        }
        Commands::Restock { id, quantity } => {
            commands::sweets::restock(&inventory, &SweetId::new(id), quantity).await?;
        }
    }
    Ok(())
}

fn credentials_path() -> PathBuf {
    if let Ok(path) = std::env::var("SWEET_SHOP_CREDENTIALS") {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("sweet-shop")
        .join("credentials.json")
}
