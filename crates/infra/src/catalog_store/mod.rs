//! Catalog Store: durable product aggregate storage.
//!
//! The store adds the only check the domain cannot make on its own (sku uniqueness
//! across the whole catalog) and persists validated aggregates atomically.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use shopsync_catalog::{NewProduct, Product, ProductFilter, ProductPage};
use shopsync_core::{DomainError, ProductId};

pub use in_memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;

#[derive(Debug, Error)]
pub enum CatalogStoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("catalog storage error: {0}")]
    Storage(String),
}

impl CatalogStoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogStoreError::Domain(e) if e.is_not_found())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CatalogStoreError::Domain(e) if e.is_validation())
    }

    pub(crate) fn product_not_found(id: ProductId) -> Self {
        CatalogStoreError::Domain(DomainError::not_found(format!("product {id}")))
    }

    pub(crate) fn sku_taken(sku: &str) -> Self {
        CatalogStoreError::Domain(DomainError::validation(format!(
            "sku {sku:?} is already used by another variant"
        )))
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Validate and persist a whole product aggregate; nothing is written on error.
    async fn create_product(&self, draft: NewProduct) -> Result<Product, CatalogStoreError>;

    /// Load an aggregate with options, values and variants in position order.
    async fn get_product(&self, id: ProductId) -> Result<Product, CatalogStoreError>;

    /// List product headers, newest first.
    async fn list_products(&self, filter: &ProductFilter)
    -> Result<ProductPage, CatalogStoreError>;

    /// Delete a product and everything it owns.
    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogStoreError>;
}

#[async_trait]
impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    async fn create_product(&self, draft: NewProduct) -> Result<Product, CatalogStoreError> {
        (**self).create_product(draft).await
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, CatalogStoreError> {
        (**self).get_product(id).await
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<ProductPage, CatalogStoreError> {
        (**self).list_products(filter).await
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogStoreError> {
        (**self).delete_product(id).await
    }
}
