//! Postgres-backed store registry.
//!
//! Table: `stores (id UUID PRIMARY KEY, domain TEXT UNIQUE, access_token TEXT, scope TEXT,
//! active BOOLEAN, installed_at TIMESTAMPTZ)`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{info, instrument};

use shopsync_core::StoreId;
use shopsync_stores::{Credential, ShopDomain, Store, StoreAuthorization};

use super::{RegistryError, StoreRegistry};
use crate::db::describe_sqlx_error;

fn storage(operation: &str, err: sqlx::Error) -> RegistryError {
    RegistryError::Storage(describe_sqlx_error(operation, &err))
}

fn decode_store(row: &PgRow) -> Result<Store, RegistryError> {
    let decode = |e| storage("decode_store", e);
    let domain: String = row.try_get("domain").map_err(decode)?;
    let token: String = row.try_get("access_token").map_err(decode)?;
    Ok(Store {
        id: StoreId::from_uuid(row.try_get("id").map_err(decode)?),
        domain: ShopDomain::parse(&domain)?,
        credential: Credential::new(token),
        scope: row.try_get("scope").map_err(decode)?,
        active: row.try_get("active").map_err(decode)?,
        installed_at: row.try_get::<DateTime<Utc>, _>("installed_at").map_err(decode)?,
    })
}

#[derive(Debug, Clone)]
pub struct PostgresStoreRegistry {
    pool: Arc<PgPool>,
}

impl PostgresStoreRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl StoreRegistry for PostgresStoreRegistry {
    #[instrument(skip(self), err)]
    async fn list_active_stores(&self) -> Result<Vec<Store>, RegistryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, domain, access_token, scope, active, installed_at
            FROM stores
            WHERE active
            ORDER BY installed_at ASC, id ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| storage("list_active_stores", e))?;

        rows.iter().map(decode_store).collect()
    }

    #[instrument(skip(self), fields(store_id = %id), err)]
    async fn get_store(&self, id: StoreId) -> Result<Store, RegistryError> {
        let row = sqlx::query(
            r#"
            SELECT id, domain, access_token, scope, active, installed_at
            FROM stores
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| storage("get_store", e))?
        .ok_or_else(|| RegistryError::store_not_found(id))?;

        decode_store(&row)
    }

    #[instrument(skip(self, authorization), fields(domain = %authorization.domain), err)]
    async fn upsert_authorized_store(
        &self,
        authorization: StoreAuthorization,
    ) -> Result<Store, RegistryError> {
        let candidate = authorization.into_store(Utc::now());

        // A reactivated store restarts its install clock; an active one keeps it.
        let row = sqlx::query(
            r#"
            INSERT INTO stores (id, domain, access_token, scope, active, installed_at)
            VALUES ($1, $2, $3, $4, TRUE, $5)
            ON CONFLICT (domain) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                scope = EXCLUDED.scope,
                installed_at = CASE WHEN stores.active
                    THEN stores.installed_at
                    ELSE EXCLUDED.installed_at
                END,
                active = TRUE
            RETURNING id, domain, access_token, scope, active, installed_at
            "#,
        )
        .bind(candidate.id.as_uuid())
        .bind(candidate.domain.as_str())
        .bind(candidate.credential.expose())
        .bind(&candidate.scope)
        .bind(candidate.installed_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| storage("upsert_store", e))?;

        let store = decode_store(&row)?;
        info!(store_id = %store.id, "store authorized");
        Ok(store)
    }

    #[instrument(skip(self), fields(store_id = %id), err)]
    async fn deactivate_store(&self, id: StoreId) -> Result<(), RegistryError> {
        let result = sqlx::query("UPDATE stores SET active = FALSE WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| storage("deactivate_store", e))?;

        if result.rows_affected() == 0 {
            return Err(RegistryError::store_not_found(id));
        }
        Ok(())
    }
}
