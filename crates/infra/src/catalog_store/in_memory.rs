use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use shopsync_catalog::{NewProduct, Pagination, Product, ProductFilter, ProductPage};
use shopsync_core::ProductId;

use super::{CatalogStore, CatalogStoreError};

#[derive(Debug, Default)]
struct CatalogState {
    products: HashMap<ProductId, Product>,
    /// sku -> owning product.
    skus: HashMap<String, ProductId>,
}

/// In-memory catalog for tests/dev.
///
/// A single lock guards products and the sku index, so an aggregate becomes
/// visible all at once or not at all.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    inner: RwLock<CatalogState>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> CatalogStoreError {
        CatalogStoreError::Storage("catalog lock poisoned".to_string())
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn create_product(&self, draft: NewProduct) -> Result<Product, CatalogStoreError> {
        let product = draft.into_product(Utc::now())?;

        let mut state = self.inner.write().map_err(|_| Self::poisoned())?;
        if let Some(sku) = product.skus().find(|sku| state.skus.contains_key(*sku)) {
            return Err(CatalogStoreError::sku_taken(sku));
        }

        let id = product.id();
        for sku in product.skus() {
            state.skus.insert(sku.to_string(), id);
        }
        state.products.insert(id, product.clone());
        debug!(product_id = %id, variants = product.variants().len(), "product created");

        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, CatalogStoreError> {
        let state = self.inner.read().map_err(|_| Self::poisoned())?;
        state
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| CatalogStoreError::product_not_found(id))
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<ProductPage, CatalogStoreError> {
        let state = self.inner.read().map_err(|_| Self::poisoned())?;

        let mut matching: Vec<_> = state
            .products
            .values()
            .map(|p| p.summary())
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let products = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit() as usize)
            .collect();

        Ok(ProductPage {
            products,
            pagination: Pagination::new(filter.page(), filter.limit(), total),
        })
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogStoreError> {
        let mut state = self.inner.write().map_err(|_| Self::poisoned())?;
        let product = state
            .products
            .remove(&id)
            .ok_or_else(|| CatalogStoreError::product_not_found(id))?;
        for sku in product.skus() {
            state.skus.remove(sku);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopsync_catalog::{NewVariant, ProductStatus};

    fn variant(sku: &str, size: &str) -> NewVariant {
        NewVariant {
            sku: Some(sku.to_string()),
            price: "19.99".parse().unwrap(),
            option_values: [("Size".to_string(), size.to_string())].into(),
            ..Default::default()
        }
    }

    fn t_shirt(title: &str, prefix: &str) -> NewProduct {
        NewProduct::new(title)
            .with_option("Size", ["S", "M"])
            .with_variant(variant(&format!("{prefix}-S"), "S"))
            .with_variant(variant(&format!("{prefix}-M"), "M"))
    }

    #[tokio::test]
    async fn create_then_get_returns_same_selections_in_order() {
        let store = InMemoryCatalogStore::new();
        let created = store.create_product(t_shirt("T-Shirt", "TS")).await.unwrap();

        let loaded = store.get_product(created.id()).await.unwrap();

        assert_eq!(loaded, created);
        let selections: Vec<_> = loaded.variants().iter().map(|v| v.option_values()).collect();
        assert_eq!(selections, vec![vec![("Size", "S")], vec![("Size", "M")]]);
    }

    #[tokio::test]
    async fn sku_collision_with_existing_product_persists_nothing() {
        let store = InMemoryCatalogStore::new();
        store.create_product(t_shirt("First", "TS")).await.unwrap();

        let draft = NewProduct::new("Second")
            .with_option("Size", ["S", "M"])
            .with_variant(variant("NEW-S", "S"))
            .with_variant(variant("TS-M", "M"));
        let err = store.create_product(draft).await.unwrap_err();

        assert!(err.is_validation());
        let page = store.list_products(&ProductFilter::default()).await.unwrap();
        assert_eq!(page.pagination.total, 1);

        // NEW-S was not reserved by the failed attempt.
        let draft = NewProduct::new("Third").with_variant(NewVariant {
            sku: Some("NEW-S".to_string()),
            ..Default::default()
        });
        assert!(store.create_product(draft).await.is_ok());
    }

    #[tokio::test]
    async fn invalid_draft_persists_nothing() {
        let store = InMemoryCatalogStore::new();
        let draft = NewProduct::new("Mug")
            .with_option("Size", ["S"])
            .with_variant(variant("MUG-S", "XL"));

        assert!(store.create_product(draft).await.unwrap_err().is_validation());
        let page = store.list_products(&ProductFilter::default()).await.unwrap();
        assert!(page.products.is_empty());
    }

    #[tokio::test]
    async fn get_unknown_product_is_not_found() {
        let store = InMemoryCatalogStore::new();
        let err = store.get_product(ProductId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn lists_newest_first_with_filters_and_paging() {
        let store = InMemoryCatalogStore::new();
        for (i, title) in ["Red Shirt", "Blue shirt", "Mug"].iter().enumerate() {
            let mut draft = t_shirt(title, &format!("P{i}"));
            if *title == "Mug" {
                draft.status = Some(ProductStatus::Draft);
            }
            store.create_product(draft).await.unwrap();
        }

        let all = store.list_products(&ProductFilter::default()).await.unwrap();
        let titles: Vec<_> = all.products.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Mug", "Blue shirt", "Red Shirt"]);

        let shirts = store
            .list_products(&ProductFilter {
                search: Some("shirt".to_string()),
                limit: Some(1),
                page: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(shirts.pagination.total, 2);
        assert_eq!(shirts.pagination.pages, 2);
        assert_eq!(shirts.products[0].title, "Red Shirt");

        let drafts = store
            .list_products(&ProductFilter {
                status: Some(ProductStatus::Draft),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(drafts.products.len(), 1);
    }

    #[tokio::test]
    async fn delete_releases_skus() {
        let store = InMemoryCatalogStore::new();
        let product = store.create_product(t_shirt("T-Shirt", "TS")).await.unwrap();

        store.delete_product(product.id()).await.unwrap();

        assert!(store.get_product(product.id()).await.unwrap_err().is_not_found());
        assert!(store.create_product(t_shirt("Again", "TS")).await.is_ok());
        assert!(store.delete_product(product.id()).await.unwrap_err().is_not_found());
    }
}
