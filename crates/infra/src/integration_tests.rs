//! End-to-end tests for the sync pipeline.
//!
//! JSON product draft → CatalogStore → SyncOrchestrator → ShopifyAdapter
//! (over an in-process GraphQL transport) → SyncLedger → status report.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use shopsync_catalog::NewProduct;
    use shopsync_ledger::{SyncStatus, VariantSyncStatus};
    use shopsync_stores::{Credential, ShopDomain, Store, StoreAuthorization};

    use crate::catalog_store::{CatalogStore, InMemoryCatalogStore};
    use crate::external::{AdapterError, AdminTransport, ShopifyAdapter};
    use crate::ledger::{InMemorySyncLedger, SyncLedger};
    use crate::store_registry::{InMemoryStoreRegistry, StoreRegistry};
    use crate::sync::SyncOrchestrator;

    /// Answers Admin API documents by operation, so replies do not depend on
    /// the order concurrent store branches reach it.
    struct FakeAdminApi {
        failing_domain: Option<String>,
        next_id: AtomicUsize,
    }

    impl FakeAdminApi {
        fn new(failing_domain: Option<&str>) -> Self {
            Self {
                failing_domain: failing_domain.map(str::to_string),
                next_id: AtomicUsize::new(1),
            }
        }

        fn gid(&self, kind: &str) -> String {
            format!(
                "gid://shopify/{kind}/{}",
                self.next_id.fetch_add(1, Ordering::SeqCst)
            )
        }
    }

    #[async_trait]
    impl AdminTransport for FakeAdminApi {
        async fn execute(
            &self,
            store: &Store,
            document: &str,
            variables: Value,
        ) -> Result<Value, AdapterError> {
            if self.failing_domain.as_deref() == Some(store.domain.as_str()) {
                return Err(AdapterError::Transport("HTTP 503 Service Unavailable".into()));
            }

            if document.contains("productCreate(") {
                let options: Vec<Value> = variables["product"]["productOptions"]
                    .as_array()
                    .cloned()
                    .unwrap_or_default()
                    .iter()
                    .map(|o| json!({ "id": self.gid("ProductOption"), "name": o["name"] }))
                    .collect();
                Ok(json!({
                    "productCreate": {
                        "product": { "id": self.gid("Product"), "options": options },
                        "userErrors": []
                    }
                }))
            } else if document.contains("locations(") {
                Ok(json!({ "locations": { "edges": [{ "node": { "id": "gid://shopify/Location/1" } }] } }))
            } else if document.contains("productVariantsBulkCreate(") {
                let count = variables["variants"].as_array().map_or(0, Vec::len);
                let variants: Vec<Value> = (0..count)
                    .map(|_| json!({ "id": self.gid("ProductVariant") }))
                    .collect();
                Ok(json!({
                    "productVariantsBulkCreate": {
                        "productVariants": variants,
                        "userErrors": []
                    }
                }))
            } else {
                Err(AdapterError::UnexpectedResponse("unknown document".into()))
            }
        }
    }

    async fn authorize(registry: &InMemoryStoreRegistry, shop: &str) -> Store {
        registry
            .upsert_authorized_store(StoreAuthorization::new(
                ShopDomain::parse(shop).unwrap(),
                Credential::new("shpat_test"),
            ))
            .await
            .unwrap()
    }

    fn t_shirt_draft() -> NewProduct {
        serde_json::from_value(json!({
            "title": "T-Shirt",
            "vendor": "Acme",
            "options": [
                { "name": "Size", "values": ["S", "M"] },
                { "name": "Color", "values": ["Red", "Blue"] }
            ],
            "variants": [
                { "sku": "TS-S-R", "price": "19.99", "inventoryQuantity": 3,
                  "optionValues": { "Size": "S", "Color": "Red" } },
                { "sku": "TS-M-B", "price": "21.50", "compareAtPrice": "25.00",
                  "optionValues": { "Size": "M", "Color": "Blue" } }
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn product_syncs_end_to_end_with_partial_failure() {
        let catalog = Arc::new(InMemoryCatalogStore::new());
        let registry = Arc::new(InMemoryStoreRegistry::new());
        let ledger = Arc::new(InMemorySyncLedger::new(registry.clone()));

        let healthy = authorize(&registry, "alpha.myshopify.com").await;
        let flaky = authorize(&registry, "beta.myshopify.com").await;

        let adapter = ShopifyAdapter::new(FakeAdminApi::new(Some("beta.myshopify.com")));
        let orchestrator =
            SyncOrchestrator::new(catalog.clone(), registry.clone(), ledger.clone(), adapter);

        let product = catalog.create_product(t_shirt_draft()).await.unwrap();
        let report = orchestrator
            .sync_product_to_stores(product.id(), None)
            .await
            .unwrap();

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[0].store_id, healthy.id);
        assert!(report.results[0].success);
        assert_eq!(report.results[0].variants_created, Some(2));
        assert_eq!(report.results[1].store_id, flaky.id);
        assert!(!report.results[1].success);
        assert!(report.results[1].error.as_deref().unwrap().contains("503"));

        let status = orchestrator.sync_status(product.id()).await.unwrap();
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["product"]["title"], "T-Shirt");
        assert_eq!(json["syncs"][0]["domain"], "alpha.myshopify.com");
        assert_eq!(json["syncs"][0]["status"], "SYNCED");
        assert_eq!(json["syncs"][1]["status"], "FAILED");
        assert_eq!(json["syncs"][1]["externalProductId"], Value::Null);

        let variants = ledger.variant_syncs(product.id()).await.unwrap();
        assert_eq!(variants.len(), 4);
        let synced: Vec<_> = variants
            .iter()
            .filter(|v| v.store_id == healthy.id)
            .collect();
        assert!(synced.iter().all(|v| v.status == VariantSyncStatus::Synced));
        assert!(
            variants
                .iter()
                .filter(|v| v.store_id == flaky.id)
                .all(|v| v.status == VariantSyncStatus::Failed
                    && v.error_message.as_deref() == Some(report.results[1].error.as_deref().unwrap()))
        );
    }

    #[tokio::test]
    async fn retrying_only_the_failed_store_heals_the_ledger() {
        let catalog = Arc::new(InMemoryCatalogStore::new());
        let registry = Arc::new(InMemoryStoreRegistry::new());
        let ledger = Arc::new(InMemorySyncLedger::new(registry.clone()));
        authorize(&registry, "alpha.myshopify.com").await;
        let beta = authorize(&registry, "beta.myshopify.com").await;
        let product = catalog.create_product(t_shirt_draft()).await.unwrap();

        let failing = SyncOrchestrator::new(
            catalog.clone(),
            registry.clone(),
            ledger.clone(),
            ShopifyAdapter::new(FakeAdminApi::new(Some("beta.myshopify.com"))),
        );
        failing
            .sync_product_to_stores(product.id(), None)
            .await
            .unwrap();

        let healthy = SyncOrchestrator::new(
            catalog.clone(),
            registry.clone(),
            ledger.clone(),
            ShopifyAdapter::new(FakeAdminApi::new(None)),
        )
        .with_max_concurrent(1);
        let report = healthy
            .sync_product_to_stores(product.id(), Some(vec![beta.id]))
            .await
            .unwrap();
        assert_eq!(report.results.len(), 1);
        assert!(report.results[0].success);

        let status = ledger.get_sync_status(product.id()).await.unwrap();
        assert_eq!(status.len(), 2);
        assert!(status.iter().all(|s| s.status == SyncStatus::Synced));
        assert!(status.iter().all(|s| s.error_message.is_none()));
    }
}
