//! # Tote Shell
//!
//! Boots the store the same way the mobile app does and runs one command
//! against it.
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Load configuration (defaults → tote.toml → TOTE_* env vars)
//! 3. Open storage (SQLite file, or memory when configured)
//! 4. Open the store and rehydrate auth and cart
//! 5. Run the command
//! 6. Flush pending snapshot writes

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use tote_api::HttpCatalogClient;
use tote_core::{AppState, Credentials, ProductId, RequestError, ValidationError};
use tote_db::{Database, KeyValueStorage, MemoryStorage};
use tote_store::{Store, StoreError, StoreOptions, ToteConfig};

pub const USAGE: &str = "\
usage: tote <command>

commands:
  products                    list the catalog (default)
  product <id>                show one product
  login <username> <password> sign in
  logout                      sign out
  add <id>                    add a product to the cart
  remove <id>                 remove a product from the cart
  qty <id> <n>                set a line quantity (0 removes)
  cart                        show the cart
  checkout                    place a simulated order
  purge                       delete persisted session and cart
  config                      print the effective configuration";

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Commands
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Products,
    Product(ProductId),
    Login { username: String, password: String },
    Logout,
    Add(ProductId),
    Remove(ProductId),
    Quantity { id: ProductId, quantity: i64 },
    Cart,
    Checkout,
    Purge,
    Config,
}

impl Command {
    /// Parses the arguments after the program name.
    pub fn parse<I, S>(args: I) -> Result<Self, ShellError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
        let words: Vec<&str> = args.iter().map(String::as_str).collect();

        let command = match words.as_slice() {
            [] | ["products"] => Command::Products,
            ["product", id] => Command::Product(parse_id(id)?),
            ["login", username, password] => Command::Login {
                username: username.to_string(),
                password: password.to_string(),
            },
            ["logout"] => Command::Logout,
            ["add", id] => Command::Add(parse_id(id)?),
            ["remove", id] => Command::Remove(parse_id(id)?),
            ["qty", id, quantity] => Command::Quantity {
                id: parse_id(id)?,
                quantity: quantity
                    .parse()
                    .map_err(|_| ShellError::Usage(format!("Not a quantity: {quantity}")))?,
            },
            ["cart"] => Command::Cart,
            ["checkout"] => Command::Checkout,
            ["purge"] => Command::Purge,
            ["config"] => Command::Config,
            _ => return Err(ShellError::Usage(USAGE.to_string())),
        };
        Ok(command)
    }
}

fn parse_id(raw: &str) -> Result<ProductId, ShellError> {
    raw.parse::<u64>()
        .map(ProductId)
        .map_err(|_| ShellError::Usage(format!("Not a product id: {raw}")))
}

// =============================================================================
// Boot
// =============================================================================

/// Initializes the tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=tote_store=trace` - Trace the store only
/// - Default: `info`, `debug` for tote crates
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tote=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .with_writer(std::io::stderr)
        .init();
}

/// Where snapshots go for this run. The database handle is kept so it can be
/// closed after the last flush.
struct OpenedStorage {
    storage: Arc<dyn KeyValueStorage>,
    database: Option<Database>,
}

impl OpenedStorage {
    fn memory() -> Self {
        OpenedStorage {
            storage: Arc::new(MemoryStorage::new()),
            database: None,
        }
    }

    async fn close(self) {
        if let Some(db) = self.database {
            db.close().await;
        }
    }
}

/// A database that can't be opened degrades to memory storage for this run.
async fn open_storage(config: &ToteConfig) -> OpenedStorage {
    let Some(db_config) = config.db_config() else {
        info!("Using in-memory storage");
        return OpenedStorage::memory();
    };

    match Database::new(db_config).await {
        Ok(db) => OpenedStorage {
            storage: Arc::new(db.clone()),
            database: Some(db),
        },
        Err(e) => {
            warn!(error = %e, "Snapshot database unavailable; session and cart won't survive a restart");
            OpenedStorage::memory()
        }
    }
}

/// Loads configuration, opens the store, runs `command`.
pub async fn run(command: Command) -> Result<(), ShellError> {
    let config = ToteConfig::load_or_default(None);

    if command == Command::Config {
        let rendered = toml::to_string_pretty(&config).map_err(StoreError::from)?;
        println!("{rendered}");
        return Ok(());
    }

    let api = Arc::new(HttpCatalogClient::new(config.api_config()?).map_err(StoreError::from)?);
    let opened = open_storage(&config).await;
    let store = Store::open(api, Arc::clone(&opened.storage), StoreOptions::from(&config)).await?;

    let result = execute(&store, command).await;
    store.flush().await;
    opened.close().await;
    result
}

async fn execute(store: &Store, command: Command) -> Result<(), ShellError> {
    match command {
        Command::Products => {
            for product in store.fetch_all_products().await? {
                println!(
                    "{:>4}  {:>9}  {}",
                    product.id.to_string(),
                    product.price.to_string(),
                    product.short_title(60)
                );
            }
        }
        Command::Product(id) => {
            let product = store.fetch_product_by_id(id).await?;
            println!("{} ({})", product.title, product.category);
            println!("{}  rated {:.1} by {}", product.price, product.rating.rate, product.rating.count);
            println!("{}", product.description);
        }
        Command::Login { username, password } => {
            let credentials = Credentials::new(username, password)?;
            let user = store.login(&credentials).await?;
            println!("Signed in as {}", user.username);
        }
        Command::Logout => {
            store.logout();
            println!("Signed out");
        }
        Command::Add(id) => {
            let product = store.fetch_product_by_id(id).await?;
            store.add_to_cart(product);
            print_cart(&store.state());
        }
        Command::Remove(id) => {
            store.remove_from_cart(id);
            print_cart(&store.state());
        }
        Command::Quantity { id, quantity } => {
            store.set_quantity(id, quantity);
            print_cart(&store.state());
        }
        Command::Cart => print_cart(&store.state()),
        Command::Checkout => match store.checkout() {
            Some(receipt) => println!("{} (order {})", receipt.summary(), receipt.order_id),
            None => println!("Cart is empty"),
        },
        Command::Purge => {
            store.purge().await;
            println!("Persisted session and cart removed");
        }
        Command::Config => {}
    }
    Ok(())
}

fn print_cart(state: &AppState) {
    let cart = &state.cart;
    if cart.is_empty() {
        println!("Cart is empty");
        return;
    }
    for line in cart.line_items() {
        println!(
            "{:>4}  {:>3} x {:>9}  {:>10}  {}",
            line.product.id.to_string(),
            line.quantity,
            line.product.price.to_string(),
            line.line_total().to_string(),
            line.product.short_title(40)
        );
    }
    println!("{} items, total {}", cart.total_item_count(), cart.total_amount());
}
