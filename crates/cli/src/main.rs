//! `shopsync`: manage the product catalog and push products to connected stores.
//!
//! Every command prints JSON on stdout; logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use shopsync_catalog::{NewProduct, ProductFilter, ProductStatus};
use shopsync_core::{ProductId, StoreId};
use shopsync_infra::catalog_store::{CatalogStore, PostgresCatalogStore};
use shopsync_infra::config::SyncConfig;
use shopsync_infra::db;
use shopsync_infra::external::{HttpAdminTransport, ShopifyAdapter};
use shopsync_infra::ledger::PostgresSyncLedger;
use shopsync_infra::store_registry::{
    PostgresInstallStateStore, PostgresStoreRegistry, StoreRegistry, begin_install,
};
use shopsync_infra::sync::SyncOrchestrator;
use shopsync_observability::LogFormat;
use shopsync_stores::ShopDomain;

#[derive(Parser)]
#[command(name = "shopsync")]
#[command(about = "Sync catalog products to connected Shopify stores")]
struct Cli {
    /// Log format on stderr: json or pretty
    #[arg(long, env = "SHOPSYNC_LOG_FORMAT", default_value = "json", value_parser = parse_log_format)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a product from a JSON file
    Create { file: PathBuf },

    /// Show a product with its options and variants
    Get { product_id: ProductId },

    /// List products, newest first
    List {
        #[arg(long)]
        status: Option<ProductStatus>,
        #[arg(long)]
        vendor: Option<String>,
        /// Case-insensitive title search
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },

    /// List active stores
    Stores,

    /// Issue a single-use install nonce for a shop domain
    Install { shop: String },

    /// Push a product to the given stores, or to every active store
    Sync {
        product_id: ProductId,
        #[arg(long = "store")]
        stores: Vec<StoreId>,
    },

    /// Show per-store sync status of a product
    Status { product_id: ProductId },

    /// Delete a product and its sync records
    Delete { product_id: ProductId },
}

fn parse_log_format(raw: &str) -> Result<LogFormat, String> {
    LogFormat::from_name(raw).ok_or_else(|| format!("unknown log format {raw:?}"))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    shopsync_observability::tracing::init(cli.log_format);

    let config = SyncConfig::from_env()?;
    let pool = db::connect(config.require_database()?)
        .await
        .context("connecting to database")?;

    let catalog = Arc::new(PostgresCatalogStore::new(pool.clone()));
    let registry = Arc::new(PostgresStoreRegistry::new(pool.clone()));
    let install_states = PostgresInstallStateStore::new(pool.clone());
    let ledger = Arc::new(PostgresSyncLedger::new(pool));
    let transport = HttpAdminTransport::new(
        config.shopify.api_version.clone(),
        config.shopify.request_timeout,
    )?;
    let orchestrator = SyncOrchestrator::new(
        catalog.clone(),
        registry.clone(),
        ledger,
        ShopifyAdapter::new(transport),
    )
    .with_max_concurrent(config.max_concurrent_stores);

    match cli.command {
        Command::Create { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let draft: NewProduct = serde_json::from_str(&raw)
                .with_context(|| format!("parsing product definition {}", file.display()))?;
            let product = catalog.create_product(draft).await?;
            info!(product_id = %product.id(), "product created");
            print_json(&product)
        }
        Command::Get { product_id } => print_json(&catalog.get_product(product_id).await?),
        Command::List {
            status,
            vendor,
            search,
            page,
            limit,
        } => {
            let filter = ProductFilter {
                status,
                vendor,
                search,
                page,
                limit,
            };
            print_json(&catalog.list_products(&filter).await?)
        }
        Command::Stores => print_json(&registry.list_active_stores().await?),
        Command::Install { shop } => {
            let shop = ShopDomain::parse(&shop)?;
            let state = begin_install(&install_states, shop, config.install_state_ttl).await?;
            print_json(&state)
        }
        Command::Sync { product_id, stores } => {
            let targets = (!stores.is_empty()).then_some(stores);
            let report = orchestrator
                .sync_product_to_stores(product_id, targets)
                .await?;
            print_json(&report)
        }
        Command::Status { product_id } => {
            print_json(&orchestrator.sync_status(product_id).await?)
        }
        Command::Delete { product_id } => {
            orchestrator.delete_product(product_id).await?;
            print_json(&serde_json::json!({ "deleted": product_id }))
        }
    }
}
