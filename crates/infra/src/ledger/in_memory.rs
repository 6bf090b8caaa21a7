use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use shopsync_core::{ProductId, StoreId, VariantId};
use shopsync_ledger::{
    ProductSyncUpdate, SyncRecord, SyncStatusEntry, VariantSyncRecord, VariantSyncUpdate,
};

use super::{LedgerError, SyncLedger};
use crate::store_registry::{RegistryError, StoreRegistry};

#[derive(Debug, Default)]
struct LedgerState {
    products: HashMap<(ProductId, StoreId), SyncRecord>,
    variants: HashMap<(VariantId, StoreId), VariantSyncRecord>,
}

/// In-memory ledger for tests/dev.
///
/// Store domains for status reports come from the registry it was built with;
/// rows whose store is unknown to the registry are left out, like the SQL join.
#[derive(Debug)]
pub struct InMemorySyncLedger<R> {
    registry: R,
    inner: RwLock<LedgerState>,
}

impl<R> InMemorySyncLedger<R>
where
    R: StoreRegistry,
{
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            inner: RwLock::new(LedgerState::default()),
        }
    }

    fn poisoned() -> LedgerError {
        LedgerError::Storage("ledger lock poisoned".to_string())
    }
}

#[async_trait]
impl<R> SyncLedger for InMemorySyncLedger<R>
where
    R: StoreRegistry,
{
    async fn upsert_product_sync(
        &self,
        product_id: ProductId,
        store_id: StoreId,
        update: ProductSyncUpdate,
    ) -> Result<(), LedgerError> {
        let now = Utc::now();
        let mut state = self.inner.write().map_err(|_| Self::poisoned())?;
        match state.products.get_mut(&(product_id, store_id)) {
            Some(record) => record.apply(update, now),
            None => {
                state.products.insert(
                    (product_id, store_id),
                    SyncRecord::new(product_id, store_id, update, now),
                );
            }
        }
        Ok(())
    }

    async fn upsert_variant_sync(
        &self,
        variant_id: VariantId,
        product_id: ProductId,
        store_id: StoreId,
        update: VariantSyncUpdate,
    ) -> Result<(), LedgerError> {
        let now = Utc::now();
        let mut state = self.inner.write().map_err(|_| Self::poisoned())?;
        match state.variants.get_mut(&(variant_id, store_id)) {
            Some(record) => record.apply(update, now),
            None => {
                state.variants.insert(
                    (variant_id, store_id),
                    VariantSyncRecord::new(variant_id, product_id, store_id, update, now),
                );
            }
        }
        Ok(())
    }

    async fn get_sync_status(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<SyncStatusEntry>, LedgerError> {
        let records: Vec<SyncRecord> = {
            let state = self.inner.read().map_err(|_| Self::poisoned())?;
            state
                .products
                .values()
                .filter(|r| r.product_id == product_id)
                .cloned()
                .collect()
        };

        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            match self.registry.get_store(record.store_id).await {
                Ok(store) => {
                    let domain = store.domain.to_string();
                    entries.push(SyncStatusEntry::from_record(record, domain));
                }
                Err(e) if e.is_not_found() => continue,
                Err(RegistryError::Storage(msg)) => return Err(LedgerError::Storage(msg)),
                Err(e) => return Err(LedgerError::Storage(e.to_string())),
            }
        }
        entries.sort_by(|a, b| a.domain.cmp(&b.domain));
        Ok(entries)
    }

    async fn variant_syncs(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<VariantSyncRecord>, LedgerError> {
        let state = self.inner.read().map_err(|_| Self::poisoned())?;
        let mut records: Vec<_> = state
            .variants
            .values()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.store_id
                .cmp(&b.store_id)
                .then(a.variant_id.cmp(&b.variant_id))
        });
        Ok(records)
    }

    async fn purge_product(&self, product_id: ProductId) -> Result<(), LedgerError> {
        let mut state = self.inner.write().map_err(|_| Self::poisoned())?;
        state.products.retain(|(pid, _), _| *pid != product_id);
        state.variants.retain(|_, r| r.product_id != product_id);
        Ok(())
    }
}
