use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use shopsync_core::StoreId;
use shopsync_stores::{Store, StoreAuthorization};

use super::{RegistryError, StoreRegistry};

/// In-memory store registry for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryStoreRegistry {
    inner: RwLock<HashMap<StoreId, Store>>,
}

impl InMemoryStoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> RegistryError {
        RegistryError::Storage("store registry lock poisoned".to_string())
    }
}

#[async_trait]
impl StoreRegistry for InMemoryStoreRegistry {
    async fn list_active_stores(&self) -> Result<Vec<Store>, RegistryError> {
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        let mut stores: Vec<_> = map.values().filter(|s| s.active).cloned().collect();
        stores.sort_by(|a, b| a.installed_at.cmp(&b.installed_at).then(a.id.cmp(&b.id)));
        Ok(stores)
    }

    async fn get_store(&self, id: StoreId) -> Result<Store, RegistryError> {
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        map.get(&id)
            .cloned()
            .ok_or_else(|| RegistryError::store_not_found(id))
    }

    async fn upsert_authorized_store(
        &self,
        authorization: StoreAuthorization,
    ) -> Result<Store, RegistryError> {
        let now = Utc::now();
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;

        if let Some(existing) = map.values_mut().find(|s| s.domain == authorization.domain) {
            authorization.apply_to(existing, now);
            info!(store_id = %existing.id, domain = %existing.domain, "store re-authorized");
            return Ok(existing.clone());
        }

        let store = authorization.into_store(now);
        info!(store_id = %store.id, domain = %store.domain, "store installed");
        map.insert(store.id, store.clone());
        Ok(store)
    }

    async fn deactivate_store(&self, id: StoreId) -> Result<(), RegistryError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        let store = map
            .get_mut(&id)
            .ok_or_else(|| RegistryError::store_not_found(id))?;
        store.active = false;
        Ok(())
    }
}
