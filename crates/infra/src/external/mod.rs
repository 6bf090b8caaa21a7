//! External Store Adapter: pushes catalog aggregates to third-party storefronts.

pub mod shopify;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shopsync_catalog::Product;
use shopsync_stores::Store;

pub use shopify::{AdminTransport, HttpAdminTransport, ShopifyAdapter};

/// A field-level rejection reported by the external API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub field: Vec<String>,
    pub message: String,
}

impl core::fmt::Display for FieldError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.field.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.field.join("."), self.message)
        }
    }
}

#[derive(Debug, Error)]
pub enum AdapterError {
    /// The external API rejected the payload. Not retried.
    #[error("external store rejected the request: {}", join_field_errors(.0))]
    Field(Vec<FieldError>),

    #[error("external store request failed: {0}")]
    Transport(String),

    #[error("external store has no inventory location")]
    MissingLocation,

    #[error("unexpected response from external store: {0}")]
    UnexpectedResponse(String),

    #[error("external store returned {returned} variants for {sent} submitted")]
    VariantCountMismatch { sent: usize, returned: usize },
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Ids assigned by the external store. `variant_ids` is aligned with the
/// product's variant order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProduct {
    pub product_id: String,
    pub variant_ids: Vec<String>,
}

#[async_trait]
pub trait ExternalStoreAdapter: Send + Sync {
    /// Create `product` with all its variants in `store`.
    async fn create_product(
        &self,
        store: &Store,
        product: &Product,
    ) -> Result<ExternalProduct, AdapterError>;
}

#[async_trait]
impl<A> ExternalStoreAdapter for Arc<A>
where
    A: ExternalStoreAdapter + ?Sized,
{
    async fn create_product(
        &self,
        store: &Store,
        product: &Product,
    ) -> Result<ExternalProduct, AdapterError> {
        (**self).create_product(store, product).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_render_with_paths() {
        let err = AdapterError::Field(vec![
            FieldError {
                field: vec!["variants".into(), "0".into(), "price".into()],
                message: "must be positive".into(),
            },
            FieldError {
                field: vec![],
                message: "title taken".into(),
            },
        ]);
        assert_eq!(
            err.to_string(),
            "external store rejected the request: variants.0.price: must be positive; title taken"
        );
    }
}
