//! Sync Ledger: per-(entity, store) sync outcomes.
//!
//! Writes are single-row upserts keyed by the entity/store pair, last write wins.
//! Callers serialize concurrent syncs of the same product to the same store.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use shopsync_core::{DomainError, ProductId, StoreId, VariantId};
use shopsync_ledger::{ProductSyncUpdate, SyncStatusEntry, VariantSyncRecord, VariantSyncUpdate};

pub use in_memory::InMemorySyncLedger;
pub use postgres::PostgresSyncLedger;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("sync ledger storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait SyncLedger: Send + Sync {
    async fn upsert_product_sync(
        &self,
        product_id: ProductId,
        store_id: StoreId,
        update: ProductSyncUpdate,
    ) -> Result<(), LedgerError>;

    async fn upsert_variant_sync(
        &self,
        variant_id: VariantId,
        product_id: ProductId,
        store_id: StoreId,
        update: VariantSyncUpdate,
    ) -> Result<(), LedgerError>;

    /// Product-level rows joined with the store domain, ordered by domain.
    async fn get_sync_status(&self, product_id: ProductId)
    -> Result<Vec<SyncStatusEntry>, LedgerError>;

    async fn variant_syncs(&self, product_id: ProductId)
    -> Result<Vec<VariantSyncRecord>, LedgerError>;

    /// Remove every product- and variant-level row of a product.
    async fn purge_product(&self, product_id: ProductId) -> Result<(), LedgerError>;
}

#[async_trait]
impl<L> SyncLedger for Arc<L>
where
    L: SyncLedger + ?Sized,
{
    async fn upsert_product_sync(
        &self,
        product_id: ProductId,
        store_id: StoreId,
        update: ProductSyncUpdate,
    ) -> Result<(), LedgerError> {
        (**self).upsert_product_sync(product_id, store_id, update).await
    }

    async fn upsert_variant_sync(
        &self,
        variant_id: VariantId,
        product_id: ProductId,
        store_id: StoreId,
        update: VariantSyncUpdate,
    ) -> Result<(), LedgerError> {
        (**self)
            .upsert_variant_sync(variant_id, product_id, store_id, update)
            .await
    }

    async fn get_sync_status(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<SyncStatusEntry>, LedgerError> {
        (**self).get_sync_status(product_id).await
    }

    async fn variant_syncs(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<VariantSyncRecord>, LedgerError> {
        (**self).variant_syncs(product_id).await
    }

    async fn purge_product(&self, product_id: ProductId) -> Result<(), LedgerError> {
        (**self).purge_product(product_id).await
    }
}
