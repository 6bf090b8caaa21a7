//! `shopsync-core`: shared kernel for the catalog and sync crates.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{OptionId, OptionValueId, ProductId, StoreId, VariantId};
