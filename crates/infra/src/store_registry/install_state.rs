//! Install-flow nonce persistence.
//!
//! Postgres table: `store_install_states (nonce TEXT PRIMARY KEY, shop TEXT, expires_at
//! TIMESTAMPTZ, used BOOLEAN)`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, instrument};

use shopsync_stores::{InstallState, InstallStateError, ShopDomain};

use super::RegistryError;
use crate::db::describe_sqlx_error;

#[async_trait]
pub trait InstallStateStore: Send + Sync {
    /// Record a fresh single-use nonce for `shop`.
    async fn issue(&self, shop: ShopDomain, ttl: Duration) -> Result<InstallState, RegistryError>;

    /// Accept a callback's nonce exactly once, before expiry, for the shop it was issued to.
    async fn consume(
        &self,
        shop: &ShopDomain,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> Result<(), RegistryError>;

    /// Drop expired states; returns how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RegistryError>;
}

#[async_trait]
impl<S> InstallStateStore for Arc<S>
where
    S: InstallStateStore + ?Sized,
{
    async fn issue(&self, shop: ShopDomain, ttl: Duration) -> Result<InstallState, RegistryError> {
        (**self).issue(shop, ttl).await
    }

    async fn consume(
        &self,
        shop: &ShopDomain,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        (**self).consume(shop, nonce, now).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RegistryError> {
        (**self).purge_expired(now).await
    }
}

/// Start an install for `shop`: drop states that have already expired, then
/// issue a nonce valid for `ttl`.
#[instrument(skip(states), fields(shop = %shop), err)]
pub async fn begin_install<S>(
    states: &S,
    shop: ShopDomain,
    ttl: Duration,
) -> Result<InstallState, RegistryError>
where
    S: InstallStateStore + ?Sized,
{
    let purged = states.purge_expired(Utc::now()).await?;
    if purged > 0 {
        debug!(purged, "expired install states dropped");
    }
    states.issue(shop, ttl).await
}

#[derive(Debug, Default)]
pub struct InMemoryInstallStateStore {
    inner: RwLock<HashMap<String, InstallState>>,
}

impl InMemoryInstallStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> RegistryError {
        RegistryError::Storage("install state lock poisoned".to_string())
    }
}

#[async_trait]
impl InstallStateStore for InMemoryInstallStateStore {
    async fn issue(&self, shop: ShopDomain, ttl: Duration) -> Result<InstallState, RegistryError> {
        let state = InstallState::issue(shop, ttl, Utc::now());
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        map.insert(state.nonce.clone(), state.clone());
        Ok(state)
    }

    async fn consume(
        &self,
        shop: &ShopDomain,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        let state = map.get_mut(nonce).ok_or(InstallStateError::Unknown)?;
        state.consume(shop, now)?;
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RegistryError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        let before = map.len();
        map.retain(|_, state| !state.is_expired(now));
        Ok((before - map.len()) as u64)
    }
}

fn storage(operation: &str, err: sqlx::Error) -> RegistryError {
    RegistryError::Storage(describe_sqlx_error(operation, &err))
}

#[derive(Debug, Clone)]
pub struct PostgresInstallStateStore {
    pool: Arc<PgPool>,
}

impl PostgresInstallStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl InstallStateStore for PostgresInstallStateStore {
    #[instrument(skip(self), fields(shop = %shop), err)]
    async fn issue(&self, shop: ShopDomain, ttl: Duration) -> Result<InstallState, RegistryError> {
        let state = InstallState::issue(shop, ttl, Utc::now());
        sqlx::query(
            "INSERT INTO store_install_states (nonce, shop, expires_at, used) VALUES ($1, $2, $3, FALSE)",
        )
        .bind(&state.nonce)
        .bind(state.shop.as_str())
        .bind(state.expires_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| storage("issue_install_state", e))?;
        Ok(state)
    }

    #[instrument(skip(self, nonce), fields(shop = %shop), err)]
    async fn consume(
        &self,
        shop: &ShopDomain,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage("begin_transaction", e))?;

        let row = sqlx::query(
            "SELECT shop, expires_at, used FROM store_install_states WHERE nonce = $1 FOR UPDATE",
        )
        .bind(nonce)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| storage("load_install_state", e))?
        .ok_or(InstallStateError::Unknown)?;

        let decode = |e| storage("decode_install_state", e);
        let stored_shop: String = row.try_get("shop").map_err(decode)?;
        let mut state = InstallState {
            nonce: nonce.to_string(),
            shop: ShopDomain::parse(&stored_shop)?,
            expires_at: row.try_get("expires_at").map_err(decode)?,
            used: row.try_get("used").map_err(decode)?,
        };
        state.consume(shop, now)?;

        sqlx::query("UPDATE store_install_states SET used = TRUE WHERE nonce = $1")
            .bind(nonce)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage("consume_install_state", e))?;

        tx.commit()
            .await
            .map_err(|e| storage("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RegistryError> {
        let result = sqlx::query("DELETE FROM store_install_states WHERE expires_at < $1")
            .bind(now)
            .execute(&*self.pool)
            .await
            .map_err(|e| storage("purge_install_states", e))?;
        debug!(purged = result.rows_affected(), "expired install states purged");
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop(name: &str) -> ShopDomain {
        ShopDomain::parse(&format!("{name}.myshopify.com")).unwrap()
    }

    #[tokio::test]
    async fn nonce_is_accepted_once() {
        let store = InMemoryInstallStateStore::new();
        let state = store.issue(shop("a"), Duration::minutes(10)).await.unwrap();

        store.consume(&shop("a"), &state.nonce, Utc::now()).await.unwrap();
        let err = store
            .consume(&shop("a"), &state.nonce, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InstallState(InstallStateError::AlreadyUsed)
        ));
    }

    #[tokio::test]
    async fn unknown_and_expired_nonces_are_rejected() {
        let store = InMemoryInstallStateStore::new();
        let err = store.consume(&shop("a"), "nope", Utc::now()).await.unwrap_err();
        assert!(matches!(err, RegistryError::InstallState(InstallStateError::Unknown)));

        let state = store.issue(shop("a"), Duration::minutes(10)).await.unwrap();
        let later = Utc::now() + Duration::minutes(11);
        let err = store.consume(&shop("a"), &state.nonce, later).await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InstallState(InstallStateError::Expired(_))
        ));

        assert_eq!(store.purge_expired(later).await.unwrap(), 1);
        let err = store.consume(&shop("a"), &state.nonce, Utc::now()).await.unwrap_err();
        assert!(matches!(err, RegistryError::InstallState(InstallStateError::Unknown)));
    }

    #[tokio::test]
    async fn begin_install_purges_stale_states_and_applies_ttl() {
        let store = InMemoryInstallStateStore::new();
        let stale = store.issue(shop("a"), Duration::seconds(-1)).await.unwrap();

        let before = Utc::now();
        let state = begin_install(&store, shop("b"), Duration::minutes(5))
            .await
            .unwrap();

        assert!(state.expires_at >= before + Duration::minutes(5));
        assert!(state.expires_at <= Utc::now() + Duration::minutes(5));
        let err = store.consume(&shop("a"), &stale.nonce, Utc::now()).await.unwrap_err();
        assert!(matches!(err, RegistryError::InstallState(InstallStateError::Unknown)));
        store.consume(&shop("b"), &state.nonce, Utc::now()).await.unwrap();
    }
}
