//! Store Registry: connected storefronts and their install-flow state.

pub mod in_memory;
pub mod install_state;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use shopsync_core::{DomainError, StoreId};
use shopsync_stores::{InstallStateError, Store, StoreAuthorization};

pub use in_memory::InMemoryStoreRegistry;
pub use install_state::{
    InMemoryInstallStateStore, InstallStateStore, PostgresInstallStateStore, begin_install,
};
pub use postgres::PostgresStoreRegistry;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    InstallState(#[from] InstallStateError),

    #[error("store registry storage error: {0}")]
    Storage(String),
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::Domain(e) if e.is_not_found())
    }

    pub(crate) fn store_not_found(id: StoreId) -> Self {
        RegistryError::Domain(DomainError::not_found(format!("store {id}")))
    }
}

#[async_trait]
pub trait StoreRegistry: Send + Sync {
    /// Active stores ordered by installation time, then id.
    async fn list_active_stores(&self) -> Result<Vec<Store>, RegistryError>;

    /// Any store, active or not.
    async fn get_store(&self, id: StoreId) -> Result<Store, RegistryError>;

    /// Insert a store or refresh the one with the same domain.
    async fn upsert_authorized_store(
        &self,
        authorization: StoreAuthorization,
    ) -> Result<Store, RegistryError>;

    async fn deactivate_store(&self, id: StoreId) -> Result<(), RegistryError>;
}

#[async_trait]
impl<R> StoreRegistry for Arc<R>
where
    R: StoreRegistry + ?Sized,
{
    async fn list_active_stores(&self) -> Result<Vec<Store>, RegistryError> {
        (**self).list_active_stores().await
    }

    async fn get_store(&self, id: StoreId) -> Result<Store, RegistryError> {
        (**self).get_store(id).await
    }

    async fn upsert_authorized_store(
        &self,
        authorization: StoreAuthorization,
    ) -> Result<Store, RegistryError> {
        (**self).upsert_authorized_store(authorization).await
    }

    async fn deactivate_store(&self, id: StoreId) -> Result<(), RegistryError> {
        (**self).deactivate_store(id).await
    }
}
