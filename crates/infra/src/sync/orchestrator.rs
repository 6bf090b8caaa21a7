use std::collections::HashSet;

use futures::StreamExt;
use futures::stream;
use tracing::{error, info, instrument, warn};

use shopsync_catalog::Product;
use shopsync_core::{ProductId, StoreId};
use shopsync_ledger::{
    ProductRef, ProductSyncUpdate, StoreSyncResult, SyncReport, SyncStatusReport,
    VariantSyncUpdate,
};
use shopsync_stores::Store;

use super::SyncError;
use crate::catalog_store::{CatalogStore, CatalogStoreError};
use crate::external::{AdapterError, ExternalProduct, ExternalStoreAdapter};
use crate::ledger::{LedgerError, SyncLedger};
use crate::store_registry::StoreRegistry;

pub const DEFAULT_MAX_CONCURRENT_STORES: usize = 4;

/// A resolved sync target: a store to push to, or a request that was turned
/// down before reaching the adapter.
enum Target {
    Store(Store),
    Rejected(StoreSyncResult),
}

/// Pushes catalog products to external stores and records per-store outcomes.
///
/// Each store branch runs independently: one store failing never stops the
/// others, and results come back in request order.
pub struct SyncOrchestrator<C, R, L, A> {
    catalog: C,
    registry: R,
    ledger: L,
    adapter: A,
    max_concurrent: usize,
}

impl<C, R, L, A> SyncOrchestrator<C, R, L, A>
where
    C: CatalogStore,
    R: StoreRegistry,
    L: SyncLedger,
    A: ExternalStoreAdapter,
{
    pub fn new(catalog: C, registry: R, ledger: L, adapter: A) -> Self {
        Self {
            catalog,
            registry,
            ledger,
            adapter,
            max_concurrent: DEFAULT_MAX_CONCURRENT_STORES,
        }
    }

    /// Cap on concurrent store branches; `1` syncs sequentially.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    async fn load_product(&self, product_id: ProductId) -> Result<Product, SyncError> {
        self.catalog
            .get_product(product_id)
            .await
            .map_err(|e| not_found_or(e, product_id))
    }

    async fn resolve_targets(
        &self,
        store_ids: Option<Vec<StoreId>>,
    ) -> Result<Vec<Target>, SyncError> {
        let requested = match store_ids {
            Some(ids) if !ids.is_empty() => ids,
            _ => {
                let stores = self.registry.list_active_stores().await?;
                return Ok(stores.into_iter().map(Target::Store).collect());
            }
        };

        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(requested.len());
        for store_id in requested.into_iter().filter(|id| seen.insert(*id)) {
            let target = match self.registry.get_store(store_id).await {
                Ok(store) if store.active => Target::Store(store),
                Ok(store) => Target::Rejected(StoreSyncResult::failed(
                    store.id,
                    Some(store.domain.to_string()),
                    "store is not active",
                )),
                Err(e) if e.is_not_found() => {
                    Target::Rejected(StoreSyncResult::failed(store_id, None, "store not found"))
                }
                Err(e) => return Err(e.into()),
            };
            targets.push(target);
        }
        Ok(targets)
    }

    /// Create `product_id` in each target store.
    ///
    /// Targets are `store_ids` (deduplicated, order kept) or, when none are
    /// given, every active store. Fails without touching the ledger when the
    /// product is unknown or there is nothing to sync to.
    #[instrument(skip(self, store_ids), fields(product_id = %product_id), err)]
    pub async fn sync_product_to_stores(
        &self,
        product_id: ProductId,
        store_ids: Option<Vec<StoreId>>,
    ) -> Result<SyncReport, SyncError> {
        let product = self.load_product(product_id).await?;
        let targets = self.resolve_targets(store_ids).await?;
        if targets.is_empty() {
            return Err(SyncError::EmptyTargetSet);
        }

        let product = &product;
        let results: Vec<StoreSyncResult> = stream::iter(targets)
            .map(|target| async move {
                match target {
                    Target::Store(store) => self.sync_to_store(product, &store).await,
                    Target::Rejected(result) => result,
                }
            })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let report = SyncReport {
            product_id,
            results,
        };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "product sync finished"
        );
        Ok(report)
    }

    async fn sync_to_store(&self, product: &Product, store: &Store) -> StoreSyncResult {
        if let Err(e) = self.mark_started(product, store.id).await {
            error!(store_id = %store.id, error = %e, "could not mark sync as started");
            return self.fail(product, store, e.to_string(), None).await;
        }

        let external = match self.adapter.create_product(store, product).await {
            Ok(external) => external,
            Err(e) => {
                warn!(store_id = %store.id, domain = %store.domain, error = %e, "store sync failed");
                return self.fail(product, store, e.to_string(), None).await;
            }
        };

        if external.variant_ids.len() != product.variants().len() {
            let e = AdapterError::VariantCountMismatch {
                sent: product.variants().len(),
                returned: external.variant_ids.len(),
            };
            warn!(
                store_id = %store.id,
                external_product_id = %external.product_id,
                error = %e,
                "store sync failed"
            );
            return self
                .fail(product, store, e.to_string(), Some(external.product_id))
                .await;
        }

        match self.record_success(product, store.id, &external).await {
            Ok(()) => StoreSyncResult::succeeded(
                store.id,
                store.domain.to_string(),
                external.product_id,
                external.variant_ids.len(),
            ),
            Err(e) => {
                error!(
                    store_id = %store.id,
                    external_product_id = %external.product_id,
                    error = %e,
                    "product created externally but ledger write failed"
                );
                self.fail(product, store, e.to_string(), Some(external.product_id))
                    .await
            }
        }
    }

    /// Record FAILED for the store as far as the ledger allows and build the
    /// failed result. A known external product id is kept on both.
    async fn fail(
        &self,
        product: &Product,
        store: &Store,
        message: String,
        external_product_id: Option<String>,
    ) -> StoreSyncResult {
        if let Err(e) = self
            .record_failure(product, store.id, &message, external_product_id.as_deref())
            .await
        {
            error!(store_id = %store.id, error = %e, "could not record sync failure");
        }
        StoreSyncResult {
            external_product_id,
            ..StoreSyncResult::failed(store.id, Some(store.domain.to_string()), message)
        }
    }

    async fn mark_started(&self, product: &Product, store_id: StoreId) -> Result<(), LedgerError> {
        let product_id = product.id();
        self.ledger
            .upsert_product_sync(product_id, store_id, ProductSyncUpdate::syncing())
            .await?;
        for variant in product.variants() {
            self.ledger
                .upsert_variant_sync(variant.id, product_id, store_id, VariantSyncUpdate::pending())
                .await?;
        }
        Ok(())
    }

    async fn record_success(
        &self,
        product: &Product,
        store_id: StoreId,
        external: &ExternalProduct,
    ) -> Result<(), LedgerError> {
        let product_id = product.id();
        for (variant, external_id) in product.variants().iter().zip(&external.variant_ids) {
            self.ledger
                .upsert_variant_sync(
                    variant.id,
                    product_id,
                    store_id,
                    VariantSyncUpdate::synced(external_id.as_str()),
                )
                .await?;
        }
        self.ledger
            .upsert_product_sync(
                product_id,
                store_id,
                ProductSyncUpdate::synced(external.product_id.as_str()),
            )
            .await
    }

    /// Every row is attempted even when an earlier write fails, so the
    /// product row still reaches FAILED. Returns the first error.
    async fn record_failure(
        &self,
        product: &Product,
        store_id: StoreId,
        message: &str,
        external_product_id: Option<&str>,
    ) -> Result<(), LedgerError> {
        let product_id = product.id();
        let mut first_error = None;
        for variant in product.variants() {
            let written = self
                .ledger
                .upsert_variant_sync(
                    variant.id,
                    product_id,
                    store_id,
                    VariantSyncUpdate::failed(message),
                )
                .await;
            if let Err(e) = written {
                first_error.get_or_insert(e);
            }
        }

        let mut update = ProductSyncUpdate::failed(message);
        if let Some(id) = external_product_id {
            update = update.with_external_id(id);
        }
        self.ledger
            .upsert_product_sync(product_id, store_id, update)
            .await?;
        first_error.map_or(Ok(()), Err)
    }

    /// Product header plus its per-store ledger rows, ordered by store domain.
    #[instrument(skip(self), fields(product_id = %product_id), err)]
    pub async fn sync_status(&self, product_id: ProductId) -> Result<SyncStatusReport, SyncError> {
        let product = self.load_product(product_id).await?;
        let syncs = self.ledger.get_sync_status(product_id).await?;
        Ok(SyncStatusReport {
            product: ProductRef {
                id: product_id,
                title: product.title().to_string(),
            },
            syncs,
        })
    }

    /// Remove a product from the catalog along with its ledger rows.
    #[instrument(skip(self), fields(product_id = %product_id), err)]
    pub async fn delete_product(&self, product_id: ProductId) -> Result<(), SyncError> {
        self.catalog
            .delete_product(product_id)
            .await
            .map_err(|e| not_found_or(e, product_id))?;
        self.ledger.purge_product(product_id).await?;
        info!("product deleted");
        Ok(())
    }
}

fn not_found_or(err: CatalogStoreError, product_id: ProductId) -> SyncError {
    if err.is_not_found() {
        SyncError::ProductNotFound(product_id)
    } else {
        SyncError::Catalog(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use shopsync_catalog::{NewProduct, NewVariant};
    use shopsync_core::VariantId;
    use shopsync_ledger::{SyncStatus, SyncStatusEntry, VariantSyncRecord, VariantSyncStatus};
    use shopsync_stores::{Credential, ShopDomain, StoreAuthorization};

    use crate::catalog_store::InMemoryCatalogStore;
    use crate::ledger::InMemorySyncLedger;
    use crate::store_registry::InMemoryStoreRegistry;

    enum Behavior {
        Fail(String),
        DropVariants,
    }

    /// Adapter fake keyed by shop domain; stores without a scripted behavior succeed.
    #[derive(Default)]
    struct FakeAdapter {
        behaviors: Mutex<HashMap<String, Behavior>>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    impl FakeAdapter {
        fn set(&self, domain: &str, behavior: Behavior) {
            self.behaviors
                .lock()
                .unwrap()
                .insert(domain.to_string(), behavior);
        }

        fn clear(&self, domain: &str) {
            self.behaviors.lock().unwrap().remove(domain);
        }
    }

    #[async_trait]
    impl ExternalStoreAdapter for FakeAdapter {
        async fn create_product(
            &self,
            store: &Store,
            product: &Product,
        ) -> Result<ExternalProduct, AdapterError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let domain = store.domain.as_str();
            let variant_ids: Vec<String> = (0..product.variants().len())
                .map(|i| format!("gid://{domain}/ProductVariant/{n}{i}"))
                .collect();
            match self.behaviors.lock().unwrap().get(domain) {
                Some(Behavior::Fail(message)) => Err(AdapterError::Transport(message.clone())),
                Some(Behavior::DropVariants) => Ok(ExternalProduct {
                    product_id: format!("gid://{domain}/Product/{n}"),
                    variant_ids: Vec::new(),
                }),
                None => Ok(ExternalProduct {
                    product_id: format!("gid://{domain}/Product/{n}"),
                    variant_ids,
                }),
            }
        }
    }

    type TestOrchestrator = SyncOrchestrator<
        Arc<InMemoryCatalogStore>,
        Arc<InMemoryStoreRegistry>,
        Arc<InMemorySyncLedger<Arc<InMemoryStoreRegistry>>>,
        Arc<FakeAdapter>,
    >;

    struct Harness {
        orchestrator: TestOrchestrator,
        adapter: Arc<FakeAdapter>,
        stores: Vec<Store>,
    }

    async fn harness(shops: &[&str]) -> Harness {
        let registry = Arc::new(InMemoryStoreRegistry::new());
        let mut stores = Vec::new();
        for shop in shops {
            let store = registry
                .upsert_authorized_store(StoreAuthorization::new(
                    ShopDomain::parse(&format!("{shop}.myshopify.com")).unwrap(),
                    Credential::new("token"),
                ))
                .await
                .unwrap();
            stores.push(store);
        }
        let ledger = Arc::new(InMemorySyncLedger::new(registry.clone()));
        let adapter = Arc::new(FakeAdapter::default());
        let orchestrator = SyncOrchestrator::new(
            Arc::new(InMemoryCatalogStore::new()),
            registry,
            ledger,
            adapter.clone(),
        );
        Harness {
            orchestrator,
            adapter,
            stores,
        }
    }

    fn t_shirt() -> NewProduct {
        let variant = |sku: &str, size: &str| NewVariant {
            sku: Some(sku.to_string()),
            price: "19.99".parse().unwrap(),
            inventory_quantity: Some(10),
            option_values: [("Size".to_string(), size.to_string())].into(),
            ..Default::default()
        };
        NewProduct::new("T-Shirt")
            .with_option("Size", ["S", "M"])
            .with_variant(variant("TS-S", "S"))
            .with_variant(variant("TS-M", "M"))
    }

    async fn create(h: &Harness) -> ProductId {
        h.orchestrator
            .catalog()
            .create_product(t_shirt())
            .await
            .unwrap()
            .id()
    }

    #[tokio::test]
    async fn syncs_to_all_active_stores_with_product_and_variant_rows() {
        let h = harness(&["shop-a", "shop-b"]).await;
        let product_id = create(&h).await;

        let report = h
            .orchestrator
            .sync_product_to_stores(product_id, None)
            .await
            .unwrap();

        assert_eq!(report.succeeded(), 2);
        assert!(report.results.iter().all(|r| r.variants_created == Some(2)));

        let status = h.orchestrator.sync_status(product_id).await.unwrap();
        assert_eq!(status.product.title, "T-Shirt");
        assert_eq!(status.syncs.len(), 2);
        assert!(status.syncs.iter().all(|s| s.status == SyncStatus::Synced));
        assert!(status.syncs.iter().all(|s| s.last_synced_at.is_some()));

        let variants = h.orchestrator.ledger().variant_syncs(product_id).await.unwrap();
        assert_eq!(variants.len(), 4);
        assert!(variants.iter().all(|v| v.status == VariantSyncStatus::Synced
            && v.external_variant_id.is_some()));
    }

    #[tokio::test]
    async fn one_failing_store_does_not_abort_the_others() {
        let h = harness(&["shop-a", "shop-b", "shop-c"]).await;
        h.adapter
            .set("shop-b.myshopify.com", Behavior::Fail("rate limited".into()));
        let product_id = create(&h).await;

        let report = h
            .orchestrator
            .sync_product_to_stores(product_id, None)
            .await
            .unwrap();

        let outcomes: Vec<_> = report
            .results
            .iter()
            .map(|r| (r.store_id, r.success))
            .collect();
        assert_eq!(
            outcomes,
            vec![
                (h.stores[0].id, true),
                (h.stores[1].id, false),
                (h.stores[2].id, true),
            ]
        );
        assert!(report.results[1].error.as_deref().unwrap().contains("rate limited"));

        let status = h.orchestrator.sync_status(product_id).await.unwrap();
        let statuses: Vec<_> = status.syncs.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![SyncStatus::Synced, SyncStatus::Failed, SyncStatus::Synced]
        );

        let variants = h.orchestrator.ledger().variant_syncs(product_id).await.unwrap();
        let failed = variants
            .iter()
            .filter(|v| v.status == VariantSyncStatus::Failed)
            .count();
        assert_eq!((variants.len(), failed), (6, 2));
    }

    #[tokio::test]
    async fn resync_overwrites_a_failed_row() {
        let h = harness(&["shop-a"]).await;
        let store = h.stores[0].id;
        h.adapter
            .set("shop-a.myshopify.com", Behavior::Fail("timeout".into()));
        let product_id = create(&h).await;

        h.orchestrator
            .sync_product_to_stores(product_id, Some(vec![store]))
            .await
            .unwrap();
        h.adapter.clear("shop-a.myshopify.com");
        let report = h
            .orchestrator
            .sync_product_to_stores(product_id, Some(vec![store]))
            .await
            .unwrap();

        assert!(report.results[0].success);
        let status = h.orchestrator.sync_status(product_id).await.unwrap();
        assert_eq!(status.syncs.len(), 1);
        assert_eq!(status.syncs[0].status, SyncStatus::Synced);
        assert_eq!(status.syncs[0].error_message, None);
        assert_eq!(
            status.syncs[0].external_product_id,
            report.results[0].external_product_id
        );
    }

    #[tokio::test]
    async fn no_active_stores_writes_nothing() {
        let h = harness(&[]).await;
        let product_id = create(&h).await;

        let err = h
            .orchestrator
            .sync_product_to_stores(product_id, None)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::EmptyTargetSet));
        assert!(h.orchestrator.sync_status(product_id).await.unwrap().syncs.is_empty());
        assert!(h.orchestrator.ledger().variant_syncs(product_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let h = harness(&["shop-a"]).await;

        let err = h
            .orchestrator
            .sync_product_to_stores(ProductId::new(), None)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(h.adapter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn explicit_targets_are_deduplicated_and_screened() {
        let h = harness(&["shop-a", "shop-b"]).await;
        let (a, b) = (h.stores[0].id, h.stores[1].id);
        h.orchestrator.registry().deactivate_store(b).await.unwrap();
        let unknown = StoreId::new();
        let product_id = create(&h).await;

        let report = h
            .orchestrator
            .sync_product_to_stores(product_id, Some(vec![b, a, unknown, a]))
            .await
            .unwrap();

        let summary: Vec<_> = report
            .results
            .iter()
            .map(|r| (r.store_id, r.success, r.domain.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (b, false, Some("shop-b.myshopify.com".to_string())),
                (a, true, Some("shop-a.myshopify.com".to_string())),
                (unknown, false, None),
            ]
        );
        assert_eq!(h.adapter.calls.load(Ordering::SeqCst), 1);

        let status = h.orchestrator.sync_status(product_id).await.unwrap();
        assert_eq!(status.syncs.len(), 1);
        assert_eq!(status.syncs[0].store_id, a);
    }

    #[tokio::test]
    async fn variant_count_mismatch_fails_the_store() {
        let h = harness(&["shop-a"]).await;
        h.adapter.set("shop-a.myshopify.com", Behavior::DropVariants);
        let product_id = create(&h).await;

        let report = h
            .orchestrator
            .sync_product_to_stores(product_id, None)
            .await
            .unwrap();

        assert!(!report.results[0].success);
        assert!(report.results[0].error.as_deref().unwrap().contains("0 variants for 2"));
        let status = h.orchestrator.sync_status(product_id).await.unwrap();
        assert_eq!(status.syncs[0].status, SyncStatus::Failed);
        assert!(status.syncs[0].external_product_id.is_some());
        assert_eq!(
            status.syncs[0].external_product_id,
            report.results[0].external_product_id
        );
    }

    #[tokio::test]
    async fn fan_out_respects_the_concurrency_cap() {
        let h = harness(&["s1", "s2", "s3", "s4", "s5"]).await;
        let product_id = create(&h).await;
        let orchestrator = h.orchestrator.with_max_concurrent(2);

        let report = orchestrator
            .sync_product_to_stores(product_id, None)
            .await
            .unwrap();

        assert_eq!(report.succeeded(), 5);
        let peak = h.adapter.peak_in_flight.load(Ordering::SeqCst);
        assert!((1..=2).contains(&peak), "peak in-flight was {peak}");
    }

    #[tokio::test]
    async fn delete_removes_product_and_ledger_rows() {
        let h = harness(&["shop-a"]).await;
        let product_id = create(&h).await;
        h.orchestrator
            .sync_product_to_stores(product_id, None)
            .await
            .unwrap();

        h.orchestrator.delete_product(product_id).await.unwrap();

        assert!(h.orchestrator.sync_status(product_id).await.unwrap_err().is_not_found());
        assert!(h.orchestrator.ledger().get_sync_status(product_id).await.unwrap().is_empty());
        assert!(h.orchestrator.delete_product(product_id).await.unwrap_err().is_not_found());
    }

    /// Ledger that refuses variant writes carrying one of the given statuses.
    struct FlakyLedger {
        inner: InMemorySyncLedger<Arc<InMemoryStoreRegistry>>,
        refused: Vec<VariantSyncStatus>,
    }

    #[async_trait]
    impl SyncLedger for FlakyLedger {
        async fn upsert_product_sync(
            &self,
            product_id: ProductId,
            store_id: StoreId,
            update: ProductSyncUpdate,
        ) -> Result<(), LedgerError> {
            self.inner.upsert_product_sync(product_id, store_id, update).await
        }

        async fn upsert_variant_sync(
            &self,
            variant_id: VariantId,
            product_id: ProductId,
            store_id: StoreId,
            update: VariantSyncUpdate,
        ) -> Result<(), LedgerError> {
            if self.refused.contains(&update.status) {
                return Err(LedgerError::Storage("connection reset".into()));
            }
            self.inner
                .upsert_variant_sync(variant_id, product_id, store_id, update)
                .await
        }

        async fn get_sync_status(
            &self,
            product_id: ProductId,
        ) -> Result<Vec<SyncStatusEntry>, LedgerError> {
            self.inner.get_sync_status(product_id).await
        }

        async fn variant_syncs(
            &self,
            product_id: ProductId,
        ) -> Result<Vec<VariantSyncRecord>, LedgerError> {
            self.inner.variant_syncs(product_id).await
        }

        async fn purge_product(&self, product_id: ProductId) -> Result<(), LedgerError> {
            self.inner.purge_product(product_id).await
        }
    }

    async fn sync_with_flaky_ledger(
        refused: Vec<VariantSyncStatus>,
    ) -> (StoreSyncResult, Vec<SyncStatusEntry>) {
        let registry = Arc::new(InMemoryStoreRegistry::new());
        registry
            .upsert_authorized_store(StoreAuthorization::new(
                ShopDomain::parse("shop-a.myshopify.com").unwrap(),
                Credential::new("token"),
            ))
            .await
            .unwrap();
        let ledger = Arc::new(FlakyLedger {
            inner: InMemorySyncLedger::new(registry.clone()),
            refused,
        });
        let catalog = Arc::new(InMemoryCatalogStore::new());
        let product_id = catalog.create_product(t_shirt()).await.unwrap().id();
        let orchestrator = SyncOrchestrator::new(
            catalog,
            registry,
            ledger.clone(),
            Arc::new(FakeAdapter::default()),
        );

        let mut report = orchestrator
            .sync_product_to_stores(product_id, None)
            .await
            .unwrap();
        let status = ledger.get_sync_status(product_id).await.unwrap();
        (report.results.remove(0), status)
    }

    #[tokio::test]
    async fn ledger_failure_while_starting_still_ends_failed() {
        let (result, status) = sync_with_flaky_ledger(vec![
            VariantSyncStatus::Pending,
            VariantSyncStatus::Synced,
            VariantSyncStatus::Failed,
        ])
        .await;

        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("connection reset"));
        assert_eq!(status[0].status, SyncStatus::Failed);
        assert_eq!(status[0].error_message, result.error);
    }

    #[tokio::test]
    async fn ledger_failure_after_external_create_keeps_external_id() {
        let (result, status) = sync_with_flaky_ledger(vec![VariantSyncStatus::Synced]).await;

        assert!(!result.success);
        assert!(result.external_product_id.is_some());
        assert_eq!(status[0].status, SyncStatus::Failed);
        assert_eq!(status[0].external_product_id, result.external_product_id);
        assert!(status[0].error_message.as_deref().unwrap().contains("connection reset"));
    }
}
