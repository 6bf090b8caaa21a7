//! Reporting shapes handed to collaborators (`sync` and `syncStatus`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopsync_core::{ProductId, StoreId};

use crate::record::{SyncRecord, SyncStatus};

/// Outcome of one store branch of a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSyncResult {
    pub store_id: StoreId,
    /// `None` when the requested store id is unknown.
    pub domain: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants_created: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StoreSyncResult {
    pub fn succeeded(
        store_id: StoreId,
        domain: impl Into<String>,
        external_product_id: impl Into<String>,
        variants_created: usize,
    ) -> Self {
        Self {
            store_id,
            domain: Some(domain.into()),
            success: true,
            external_product_id: Some(external_product_id.into()),
            variants_created: Some(variants_created),
            error: None,
        }
    }

    pub fn failed(store_id: StoreId, domain: Option<String>, error: impl Into<String>) -> Self {
        Self {
            store_id,
            domain,
            success: false,
            external_product_id: None,
            variants_created: None,
            error: Some(error.into()),
        }
    }
}

/// Result of `sync(productId, storeIds?)`: one entry per requested store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub product_id: ProductId,
    pub results: Vec<StoreSyncResult>,
}

impl SyncReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// A product-level ledger row joined with its store's domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusEntry {
    pub store_id: StoreId,
    pub domain: String,
    pub external_product_id: Option<String>,
    pub status: SyncStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl SyncStatusEntry {
    pub fn from_record(record: SyncRecord, domain: impl Into<String>) -> Self {
        Self {
            store_id: record.store_id,
            domain: domain.into(),
            external_product_id: record.external_product_id,
            status: record.status,
            last_synced_at: record.last_synced_at,
            error_message: record.error_message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: ProductId,
    pub title: String,
}

/// Result of `syncStatus(productId)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatusReport {
    pub product: ProductRef,
    pub syncs: Vec<SyncStatusEntry>,
}
