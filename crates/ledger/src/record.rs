use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopsync_core::{DomainError, ProductId, StoreId, VariantId};

/// Status of a ledger row.
pub trait LedgerStatus: Copy + core::fmt::Debug {
    /// Terminal states stamp `last_synced_at`.
    fn is_terminal(&self) -> bool;
}

/// Product-level sync state, per store.
///
/// `Pending -> Syncing -> {Synced | Failed}`; a terminal state may restart at
/// `Syncing` when the product is synced again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Pending,
    Syncing,
    Synced,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "PENDING",
            SyncStatus::Syncing => "SYNCING",
            SyncStatus::Synced => "SYNCED",
            SyncStatus::Failed => "FAILED",
        }
    }
}

impl LedgerStatus for SyncStatus {
    fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Synced | SyncStatus::Failed)
    }
}

impl FromStr for SyncStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(SyncStatus::Pending),
            "SYNCING" => Ok(SyncStatus::Syncing),
            "SYNCED" => Ok(SyncStatus::Synced),
            "FAILED" => Ok(SyncStatus::Failed),
            other => Err(DomainError::invariant(format!("unknown sync status {other:?}"))),
        }
    }
}

impl core::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variant-level sync state, per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariantSyncStatus {
    Pending,
    Synced,
    Failed,
}

impl VariantSyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantSyncStatus::Pending => "PENDING",
            VariantSyncStatus::Synced => "SYNCED",
            VariantSyncStatus::Failed => "FAILED",
        }
    }
}

impl LedgerStatus for VariantSyncStatus {
    fn is_terminal(&self) -> bool {
        !matches!(self, VariantSyncStatus::Pending)
    }
}

impl FromStr for VariantSyncStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(VariantSyncStatus::Pending),
            "SYNCED" => Ok(VariantSyncStatus::Synced),
            "FAILED" => Ok(VariantSyncStatus::Failed),
            other => Err(DomainError::invariant(format!(
                "unknown variant sync status {other:?}"
            ))),
        }
    }
}

impl core::fmt::Display for VariantSyncStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ledger write.
///
/// Upsert semantics are last-write-wins: `external_id: None` keeps whatever id the
/// row already holds, while `error` always replaces the stored message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerUpdate<S> {
    pub status: S,
    pub external_id: Option<String>,
    pub error: Option<String>,
}

impl<S: LedgerStatus> LedgerUpdate<S> {
    pub fn new(status: S) -> Self {
        Self {
            status,
            external_id: None,
            error: None,
        }
    }

    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

pub type ProductSyncUpdate = LedgerUpdate<SyncStatus>;
pub type VariantSyncUpdate = LedgerUpdate<VariantSyncStatus>;

impl LedgerUpdate<SyncStatus> {
    pub fn syncing() -> Self {
        Self::new(SyncStatus::Syncing)
    }

    pub fn synced(external_id: impl Into<String>) -> Self {
        Self::new(SyncStatus::Synced).with_external_id(external_id)
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self::new(SyncStatus::Failed).with_error(error)
    }
}

impl LedgerUpdate<VariantSyncStatus> {
    pub fn pending() -> Self {
        Self::new(VariantSyncStatus::Pending)
    }

    pub fn synced(external_id: impl Into<String>) -> Self {
        Self::new(VariantSyncStatus::Synced).with_external_id(external_id)
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self::new(VariantSyncStatus::Failed).with_error(error)
    }
}

/// Product-level ledger row, unique per `(product_id, store_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub external_product_id: Option<String>,
    pub status: SyncStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl SyncRecord {
    pub fn new(
        product_id: ProductId,
        store_id: StoreId,
        update: LedgerUpdate<SyncStatus>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut record = Self {
            product_id,
            store_id,
            external_product_id: None,
            status: update.status,
            last_synced_at: None,
            error_message: None,
            updated_at: now,
        };
        record.apply(update, now);
        record
    }

    pub fn apply(&mut self, update: LedgerUpdate<SyncStatus>, now: DateTime<Utc>) {
        if update.status.is_terminal() {
            self.last_synced_at = Some(now);
        }
        if let Some(id) = update.external_id {
            self.external_product_id = Some(id);
        }
        self.status = update.status;
        self.error_message = update.error;
        self.updated_at = now;
    }
}

/// Variant-level ledger row, unique per `(variant_id, store_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSyncRecord {
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub external_variant_id: Option<String>,
    pub status: VariantSyncStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl VariantSyncRecord {
    pub fn new(
        variant_id: VariantId,
        product_id: ProductId,
        store_id: StoreId,
        update: LedgerUpdate<VariantSyncStatus>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut record = Self {
            variant_id,
            product_id,
            store_id,
            external_variant_id: None,
            status: update.status,
            last_synced_at: None,
            error_message: None,
            updated_at: now,
        };
        record.apply(update, now);
        record
    }

    pub fn apply(&mut self, update: LedgerUpdate<VariantSyncStatus>, now: DateTime<Utc>) {
        if update.status.is_terminal() {
            self.last_synced_at = Some(now);
        }
        if let Some(id) = update.external_id {
            self.external_variant_id = Some(id);
        }
        self.status = update.status;
        self.error_message = update.error;
        self.updated_at = now;
    }
}
