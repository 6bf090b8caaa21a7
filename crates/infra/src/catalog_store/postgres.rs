//! Postgres-backed catalog store.
//!
//! Tables:
//!
//! - `products (id, title, description, vendor, product_type, status, created_at, updated_at)`
//! - `product_options (id, product_id, name, position)`, unique `(product_id, name)`
//! - `product_option_values (id, option_id, value, position)`, unique `(option_id, value)`
//! - `product_variants (id, product_id, sku UNIQUE, barcode, price, compare_at_price, cost,
//!   inventory_quantity, position)`
//! - `product_variant_option_values (variant_id, option_id, option_value_id)`,
//!   primary key `(variant_id, option_id)`
//!
//! Child tables reference their parent with `ON DELETE CASCADE`, including the sync
//! ledger tables, so deleting a product row removes the whole aggregate.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};
use uuid::Uuid;

use shopsync_catalog::{
    NewProduct, OptionValue, Pagination, Price, Product, ProductFilter, ProductOption,
    ProductPage, ProductSummary, Selection, Variant,
};
use shopsync_core::{DomainError, OptionId, OptionValueId, ProductId, VariantId};

use super::{CatalogStore, CatalogStoreError};
use crate::db::{describe_sqlx_error, is_unique_violation};

fn storage(operation: &str, err: sqlx::Error) -> CatalogStoreError {
    CatalogStoreError::Storage(describe_sqlx_error(operation, &err))
}

/// Postgres-backed catalog store.
///
/// Aggregate creation runs in one transaction and aggregate reads share one
/// repeatable-read snapshot, so readers never observe a partial aggregate.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Read-only transaction whose statements all see one snapshot.
    async fn begin_snapshot(&self) -> Result<Transaction<'_, Postgres>, CatalogStoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage("begin_transaction", e))?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| storage("set_snapshot", e))?;
        Ok(tx)
    }

    async fn insert_aggregate(
        tx: &mut Transaction<'_, Postgres>,
        product: &Product,
    ) -> Result<(), CatalogStoreError> {
        let summary = product.summary();
        sqlx::query(
            r#"
            INSERT INTO products (
                id, title, description, vendor, product_type, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(summary.id.as_uuid())
        .bind(&summary.title)
        .bind(&summary.description)
        .bind(&summary.vendor)
        .bind(&summary.product_type)
        .bind(summary.status.as_str())
        .bind(summary.created_at)
        .bind(summary.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| storage("insert_product", e))?;

        for option in product.options() {
            sqlx::query(
                "INSERT INTO product_options (id, product_id, name, position) VALUES ($1, $2, $3, $4)",
            )
            .bind(option.id.as_uuid())
            .bind(summary.id.as_uuid())
            .bind(&option.name)
            .bind(option.position as i32)
            .execute(&mut **tx)
            .await
            .map_err(|e| storage("insert_option", e))?;

            for value in &option.values {
                sqlx::query(
                    "INSERT INTO product_option_values (id, option_id, value, position) VALUES ($1, $2, $3, $4)",
                )
                .bind(value.id.as_uuid())
                .bind(option.id.as_uuid())
                .bind(&value.value)
                .bind(value.position as i32)
                .execute(&mut **tx)
                .await
                .map_err(|e| storage("insert_option_value", e))?;
            }
        }

        for variant in product.variants() {
            sqlx::query(
                r#"
                INSERT INTO product_variants (
                    id, product_id, sku, barcode, price, compare_at_price, cost,
                    inventory_quantity, position
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(variant.id.as_uuid())
            .bind(summary.id.as_uuid())
            .bind(&variant.sku)
            .bind(&variant.barcode)
            .bind(variant.price.amount())
            .bind(variant.compare_at_price.map(|p| p.amount()))
            .bind(variant.cost.map(|p| p.amount()))
            .bind(i64::from(variant.inventory_quantity))
            .bind(variant.position as i32)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    CatalogStoreError::sku_taken(variant.sku.as_deref().unwrap_or_default())
                } else {
                    storage("insert_variant", e)
                }
            })?;

            for selection in &variant.selections {
                sqlx::query(
                    r#"
                    INSERT INTO product_variant_option_values (variant_id, option_id, option_value_id)
                    VALUES ($1, $2, $3)
                    "#,
                )
                .bind(variant.id.as_uuid())
                .bind(selection.option_id.as_uuid())
                .bind(selection.value_id.as_uuid())
                .execute(&mut **tx)
                .await
                .map_err(|e| storage("insert_variant_option_value", e))?;
            }
        }

        Ok(())
    }
}

fn decode_summary(row: &PgRow) -> Result<ProductSummary, CatalogStoreError> {
    let decode = |e| storage("decode_product", e);
    let status: String = row.try_get("status").map_err(decode)?;
    Ok(ProductSummary {
        id: ProductId::from_uuid(row.try_get("id").map_err(decode)?),
        title: row.try_get("title").map_err(decode)?,
        description: row.try_get("description").map_err(decode)?,
        vendor: row.try_get("vendor").map_err(decode)?,
        product_type: row.try_get("product_type").map_err(decode)?,
        status: status.parse()?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(decode)?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(decode)?,
    })
}

fn decode_price(amount: Decimal) -> Result<Price, CatalogStoreError> {
    Price::new(amount)
        .map_err(|e| CatalogStoreError::Domain(DomainError::invariant(format!("stored {e}"))))
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    #[instrument(skip(self, draft), fields(title = %draft.title, product_id), err)]
    async fn create_product(&self, draft: NewProduct) -> Result<Product, CatalogStoreError> {
        let product = draft.into_product(Utc::now())?;
        Span::current().record("product_id", tracing::field::display(product.id()));

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage("begin_transaction", e))?;

        let skus: Vec<String> = product.skus().map(str::to_string).collect();
        if !skus.is_empty() {
            let taken: Option<String> =
                sqlx::query_scalar("SELECT sku FROM product_variants WHERE sku = ANY($1) LIMIT 1")
                    .bind(&skus)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| storage("check_skus", e))?;
            if let Some(sku) = taken {
                tx.rollback().await.map_err(|e| storage("rollback", e))?;
                return Err(CatalogStoreError::sku_taken(&sku));
            }
        }

        if let Err(e) = Self::insert_aggregate(&mut tx, &product).await {
            tx.rollback().await.map_err(|e| storage("rollback", e))?;
            return Err(e);
        }

        tx.commit()
            .await
            .map_err(|e| storage("commit_transaction", e))?;

        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product(&self, id: ProductId) -> Result<Product, CatalogStoreError> {
        let mut tx = self.begin_snapshot().await?;

        let row = sqlx::query(
            r#"
            SELECT id, title, description, vendor, product_type, status, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| storage("load_product", e))?
        .ok_or_else(|| CatalogStoreError::product_not_found(id))?;
        let summary = decode_summary(&row)?;

        let option_rows = sqlx::query(
            "SELECT id, name, position FROM product_options WHERE product_id = $1 ORDER BY position",
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| storage("load_options", e))?;

        let value_rows = sqlx::query(
            r#"
            SELECT v.id, v.option_id, v.value, v.position
            FROM product_option_values v
            JOIN product_options o ON o.id = v.option_id
            WHERE o.product_id = $1
            ORDER BY v.position
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| storage("load_option_values", e))?;

        let mut values_by_option: HashMap<Uuid, Vec<OptionValue>> = HashMap::new();
        for row in value_rows {
            let decode = |e| storage("decode_option_value", e);
            let option_id: Uuid = row.try_get("option_id").map_err(decode)?;
            values_by_option.entry(option_id).or_default().push(OptionValue {
                id: OptionValueId::from_uuid(row.try_get("id").map_err(decode)?),
                value: row.try_get("value").map_err(decode)?,
                position: row.try_get::<i32, _>("position").map_err(decode)? as u32,
            });
        }

        let mut options = Vec::with_capacity(option_rows.len());
        for row in option_rows {
            let decode = |e| storage("decode_option", e);
            let option_id: Uuid = row.try_get("id").map_err(decode)?;
            options.push(ProductOption {
                id: OptionId::from_uuid(option_id),
                name: row.try_get("name").map_err(decode)?,
                position: row.try_get::<i32, _>("position").map_err(decode)? as u32,
                values: values_by_option.remove(&option_id).unwrap_or_default(),
            });
        }

        let link_rows = sqlx::query(
            r#"
            SELECT l.variant_id, l.option_id, l.option_value_id
            FROM product_variant_option_values l
            JOIN product_variants v ON v.id = l.variant_id
            WHERE v.product_id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| storage("load_variant_links", e))?;

        let mut selections: HashMap<Uuid, Vec<Selection>> = HashMap::new();
        for row in link_rows {
            let decode = |e| storage("decode_variant_link", e);
            let variant_id: Uuid = row.try_get("variant_id").map_err(decode)?;
            // Names are re-resolved by `Product::restore`.
            selections.entry(variant_id).or_default().push(Selection {
                option_id: OptionId::from_uuid(row.try_get("option_id").map_err(decode)?),
                option_name: String::new(),
                value_id: OptionValueId::from_uuid(row.try_get("option_value_id").map_err(decode)?),
                value: String::new(),
            });
        }

        let variant_rows = sqlx::query(
            r#"
            SELECT id, sku, barcode, price, compare_at_price, cost, inventory_quantity, position
            FROM product_variants
            WHERE product_id = $1
            ORDER BY position
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| storage("load_variants", e))?;

        let mut variants = Vec::with_capacity(variant_rows.len());
        for row in variant_rows {
            let decode = |e| storage("decode_variant", e);
            let variant_id: Uuid = row.try_get("id").map_err(decode)?;
            let quantity: i64 = row.try_get("inventory_quantity").map_err(decode)?;
            variants.push(Variant {
                id: VariantId::from_uuid(variant_id),
                sku: row.try_get("sku").map_err(decode)?,
                barcode: row.try_get("barcode").map_err(decode)?,
                price: decode_price(row.try_get("price").map_err(decode)?)?,
                compare_at_price: row
                    .try_get::<Option<Decimal>, _>("compare_at_price")
                    .map_err(decode)?
                    .map(decode_price)
                    .transpose()?,
                cost: row
                    .try_get::<Option<Decimal>, _>("cost")
                    .map_err(decode)?
                    .map(decode_price)
                    .transpose()?,
                inventory_quantity: u32::try_from(quantity).map_err(|_| {
                    DomainError::invariant(format!("stored inventory quantity {quantity} out of range"))
                })?,
                position: row.try_get::<i32, _>("position").map_err(decode)? as u32,
                selections: selections.remove(&variant_id).unwrap_or_default(),
            });
        }

        tx.commit()
            .await
            .map_err(|e| storage("commit_transaction", e))?;

        Ok(Product::restore(summary, options, variants)?)
    }

    #[instrument(skip(self), err)]
    async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<ProductPage, CatalogStoreError> {
        let status = filter.status.map(|s| s.as_str());
        let pattern = filter.search_needle().map(|needle| {
            let escaped = needle
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{escaped}%")
        });

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM products
            WHERE ($1::text IS NULL OR status = $1)
                AND ($2::text IS NULL OR vendor = $2)
                AND ($3::text IS NULL OR title ILIKE $3)
            "#,
        )
        .bind(status)
        .bind(filter.vendor.as_deref())
        .bind(pattern.as_deref())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| storage("count_products", e))?;

        let rows = sqlx::query(
            r#"
            SELECT id, title, description, vendor, product_type, status, created_at, updated_at
            FROM products
            WHERE ($1::text IS NULL OR status = $1)
                AND ($2::text IS NULL OR vendor = $2)
                AND ($3::text IS NULL OR title ILIKE $3)
            ORDER BY created_at DESC, id DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(status)
        .bind(filter.vendor.as_deref())
        .bind(pattern.as_deref())
        .bind(i64::from(filter.limit()))
        .bind(filter.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| storage("list_products", e))?;

        let products = rows
            .iter()
            .map(decode_summary)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ProductPage {
            products,
            pagination: Pagination::new(filter.page(), filter.limit(), total.max(0) as u64),
        })
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogStoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| storage("delete_product", e))?;

        if result.rows_affected() == 0 {
            return Err(CatalogStoreError::product_not_found(id));
        }
        Ok(())
    }
}
