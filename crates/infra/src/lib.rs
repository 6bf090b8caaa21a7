//! Infrastructure layer: storage backends, the Shopify adapter, sync orchestration
//! and configuration.

pub mod catalog_store;
pub mod config;
pub mod db;
pub mod external;
pub mod ledger;
pub mod store_registry;
pub mod sync;

mod integration_tests;
