//! Storefront Cart CLI - Inspect and edit a shopper's cart.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart for an owner
//! cart-cli --owner uid-123 show
//!
//! # Add two units of a product
//! cart-cli --owner uid-123 add p-1 --name "Kopi Susu" --price 10000 -q 2
//!
//! # Change quantities
//! cart-cli --owner uid-123 inc p-1
//! cart-cli --owner uid-123 dec p-1
//! cart-cli --owner uid-123 set p-1 5
//!
//! # Remove a line or empty the cart (asks for confirmation)
//! cart-cli --owner uid-123 remove p-1
//! cart-cli --owner uid-123 clear --yes
//! ```
//!
//! # Environment Variables
//!
//! - `CART_STORE_URL` - Base URL of the cart document store
//! - `CART_STORE_API_KEY` - Bearer token for the store
//! - `CART_STORE_TIMEOUT_SECS` - Request timeout (default 10)
//! - `CART_OWNER_ID` - Owner used when `--owner` is not given
//! - `SENTRY_DSN` / `SENTRY_ENVIRONMENT` - Optional error tracking

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use storefront_cart::CartConfig;
use storefront_cart_core::{OwnerId, ProductId, Quantity};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "cart-cli")]
#[command(author, version, about = "Storefront cart tools")]
struct Cli {
    /// Cart owner (user id)
    #[arg(short, long, global = true, env = "CART_OWNER_ID")]
    owner: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the cart
    Show,
    /// Add a product to the cart
    Add {
        /// Product id
        product_id: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Unit price in rupiah
        #[arg(short, long)]
        price: Decimal,

        /// Image URL
        #[arg(short, long, default_value = "")]
        image: String,

        /// Units to add
        #[arg(short, long, default_value = "1")]
        quantity: Quantity,
    },
    /// Add one unit to a line
    Inc {
        /// Product id
        product_id: String,
    },
    /// Remove one unit from a line
    Dec {
        /// Product id
        product_id: String,
    },
    /// Set a line's quantity
    Set {
        /// Product id
        product_id: String,

        /// New quantity (at least 1)
        quantity: Quantity,
    },
    /// Remove a line
    Remove {
        /// Product id
        product_id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Remove every line
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CartConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Sentry must be initialized before the tracing subscriber
    let config = CartConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Defaults to warnings only so command output stays readable
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn,storefront_cart=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(CliError::Config(e)),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        commands::report_failure(&e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: CartConfig) -> Result<(), CliError> {
    let owner = cli
        .owner
        .map(OwnerId::from)
        .or_else(|| config.default_owner.clone())
        .ok_or(CliError::MissingOwner)?;

    let mut session = commands::CartSession::connect(config.store, owner)?;

    match cli.command {
        Commands::Show => session.show().await,
        Commands::Add {
            product_id,
            name,
            price,
            image,
            quantity,
        } => {
            session
                .add(ProductId::from(product_id), name, price, image, quantity)
                .await
        }
        Commands::Inc { product_id } => session.increment(&ProductId::from(product_id)).await,
        Commands::Dec { product_id } => session.decrement(&ProductId::from(product_id)).await,
        Commands::Set {
            product_id,
            quantity,
        } => {
            session
                .set_quantity(&ProductId::from(product_id), quantity)
                .await
        }
        Commands::Remove { product_id, yes } => {
            session.remove(&ProductId::from(product_id), yes).await
        }
        Commands::Clear { yes } => session.clear(yes).await,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_set_rejects_zero() {
        let parsed = Cli::try_parse_from(["cart-cli", "--owner", "uid-1", "set", "p-1", "0"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_parse_add_defaults() {
        let cli = Cli::try_parse_from([
            "cart-cli", "-o", "uid-1", "add", "p-1", "--name", "Kopi", "--price", "10000",
        ])
        .map_err(|e| e.to_string());
        let Ok(Cli {
            owner,
            command: Commands::Add {
                quantity, image, ..
            },
        }) = cli
        else {
            panic!("expected add command");
        };

        assert_eq!(owner.as_deref(), Some("uid-1"));
        assert_eq!(quantity, Quantity::ONE);
        assert!(image.is_empty());
    }
}
