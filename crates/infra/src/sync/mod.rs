//! Sync Orchestrator: fans a product out to target stores and records outcomes.

pub mod orchestrator;

use thiserror::Error;

use shopsync_core::ProductId;

use crate::catalog_store::CatalogStoreError;
use crate::ledger::LedgerError;
use crate::store_registry::RegistryError;

pub use orchestrator::{DEFAULT_MAX_CONCURRENT_STORES, SyncOrchestrator};

/// Failures that abort a whole sync run. Per-store failures are reported in the
/// run's results instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("no active stores found")]
    EmptyTargetSet,

    #[error(transparent)]
    Catalog(#[from] CatalogStoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl SyncError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::ProductNotFound(_))
    }
}
