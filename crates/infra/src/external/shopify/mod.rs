//! Shopify GraphQL Admin API adapter.

mod adapter;
mod payload;
mod transport;

pub use adapter::ShopifyAdapter;
pub use transport::{AdminTransport, HttpAdminTransport};

pub const DEFAULT_API_VERSION: &str = "2025-10";
