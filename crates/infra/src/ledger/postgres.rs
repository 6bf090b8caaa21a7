//! Postgres-backed sync ledger.
//!
//! Tables:
//!
//! - `product_syncs (product_id, store_id, external_product_id, status, last_synced_at,
//!   error_message, updated_at)`, unique `(product_id, store_id)`
//! - `product_variant_syncs (variant_id, product_id, store_id, external_variant_id, status,
//!   last_synced_at, error_message, updated_at)`, unique `(variant_id, store_id)`
//!
//! Both reference `products`/`product_variants` and `stores` with `ON DELETE CASCADE`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;

use shopsync_core::{ProductId, StoreId, VariantId};
use shopsync_ledger::{
    LedgerStatus, ProductSyncUpdate, SyncStatus, SyncStatusEntry, VariantSyncRecord,
    VariantSyncStatus, VariantSyncUpdate,
};

use super::{LedgerError, SyncLedger};
use crate::db::describe_sqlx_error;

fn storage(operation: &str, err: sqlx::Error) -> LedgerError {
    LedgerError::Storage(describe_sqlx_error(operation, &err))
}

#[derive(Debug, Clone)]
pub struct PostgresSyncLedger {
    pool: Arc<PgPool>,
}

impl PostgresSyncLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl SyncLedger for PostgresSyncLedger {
    #[instrument(skip(self, update), fields(product_id = %product_id, store_id = %store_id, status = %update.status), err)]
    async fn upsert_product_sync(
        &self,
        product_id: ProductId,
        store_id: StoreId,
        update: ProductSyncUpdate,
    ) -> Result<(), LedgerError> {
        let now = Utc::now();
        let stamped: Option<DateTime<Utc>> = update.status.is_terminal().then_some(now);

        sqlx::query(
            r#"
            INSERT INTO product_syncs (
                product_id, store_id, external_product_id, status, last_synced_at,
                error_message, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (product_id, store_id) DO UPDATE SET
                external_product_id = COALESCE(EXCLUDED.external_product_id, product_syncs.external_product_id),
                status = EXCLUDED.status,
                last_synced_at = COALESCE(EXCLUDED.last_synced_at, product_syncs.last_synced_at),
                error_message = EXCLUDED.error_message,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(store_id.as_uuid())
        .bind(&update.external_id)
        .bind(update.status.as_str())
        .bind(stamped)
        .bind(&update.error)
        .bind(now)
        .execute(&*self.pool)
        .await
        .map_err(|e| storage("upsert_product_sync", e))?;

        Ok(())
    }

    #[instrument(skip(self, update), fields(variant_id = %variant_id, store_id = %store_id, status = %update.status), err)]
    async fn upsert_variant_sync(
        &self,
        variant_id: VariantId,
        product_id: ProductId,
        store_id: StoreId,
        update: VariantSyncUpdate,
    ) -> Result<(), LedgerError> {
        let now = Utc::now();
        let stamped: Option<DateTime<Utc>> = update.status.is_terminal().then_some(now);

        sqlx::query(
            r#"
            INSERT INTO product_variant_syncs (
                variant_id, product_id, store_id, external_variant_id, status, last_synced_at,
                error_message, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (variant_id, store_id) DO UPDATE SET
                external_variant_id = COALESCE(EXCLUDED.external_variant_id, product_variant_syncs.external_variant_id),
                status = EXCLUDED.status,
                last_synced_at = COALESCE(EXCLUDED.last_synced_at, product_variant_syncs.last_synced_at),
                error_message = EXCLUDED.error_message,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(variant_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(store_id.as_uuid())
        .bind(&update.external_id)
        .bind(update.status.as_str())
        .bind(stamped)
        .bind(&update.error)
        .bind(now)
        .execute(&*self.pool)
        .await
        .map_err(|e| storage("upsert_variant_sync", e))?;

        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn get_sync_status(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<SyncStatusEntry>, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT ps.store_id, s.domain, ps.external_product_id, ps.status,
                   ps.last_synced_at, ps.error_message
            FROM product_syncs ps
            JOIN stores s ON s.id = ps.store_id
            WHERE ps.product_id = $1
            ORDER BY s.domain ASC
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| storage("get_sync_status", e))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let decode = |e| storage("decode_product_sync", e);
            let status: String = row.try_get("status").map_err(decode)?;
            entries.push(SyncStatusEntry {
                store_id: StoreId::from_uuid(row.try_get("store_id").map_err(decode)?),
                domain: row.try_get("domain").map_err(decode)?,
                external_product_id: row.try_get("external_product_id").map_err(decode)?,
                status: status.parse::<SyncStatus>()?,
                last_synced_at: row.try_get("last_synced_at").map_err(decode)?,
                error_message: row.try_get("error_message").map_err(decode)?,
            });
        }
        Ok(entries)
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn variant_syncs(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<VariantSyncRecord>, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT variant_id, product_id, store_id, external_variant_id, status,
                   last_synced_at, error_message, updated_at
            FROM product_variant_syncs
            WHERE product_id = $1
            ORDER BY store_id, variant_id
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| storage("variant_syncs", e))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let decode = |e| storage("decode_variant_sync", e);
            let status: String = row.try_get("status").map_err(decode)?;
            records.push(VariantSyncRecord {
                variant_id: VariantId::from_uuid(row.try_get("variant_id").map_err(decode)?),
                product_id: ProductId::from_uuid(row.try_get("product_id").map_err(decode)?),
                store_id: StoreId::from_uuid(row.try_get("store_id").map_err(decode)?),
                external_variant_id: row.try_get("external_variant_id").map_err(decode)?,
                status: status.parse::<VariantSyncStatus>()?,
                last_synced_at: row.try_get("last_synced_at").map_err(decode)?,
                error_message: row.try_get("error_message").map_err(decode)?,
                updated_at: row.try_get("updated_at").map_err(decode)?,
            });
        }
        Ok(records)
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn purge_product(&self, product_id: ProductId) -> Result<(), LedgerError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage("begin_transaction", e))?;

        sqlx::query("DELETE FROM product_variant_syncs WHERE product_id = $1")
            .bind(product_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| storage("purge_variant_syncs", e))?;
        sqlx::query("DELETE FROM product_syncs WHERE product_id = $1")
            .bind(product_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| storage("purge_product_syncs", e))?;

        tx.commit()
            .await
            .map_err(|e| storage("commit_transaction", e))?;
        Ok(())
    }
}
