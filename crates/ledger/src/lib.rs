//! Sync ledger domain: per-(entity, store) synchronization outcomes.
//!
//! External identifiers live only here; catalog aggregates stay store-agnostic.

pub mod record;
pub mod report;

pub use record::{
    LedgerStatus, LedgerUpdate, ProductSyncUpdate, SyncRecord, SyncStatus, VariantSyncRecord,
    VariantSyncStatus, VariantSyncUpdate,
};
pub use report::{ProductRef, StoreSyncResult, SyncReport, SyncStatusEntry, SyncStatusReport};
