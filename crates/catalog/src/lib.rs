//! Catalog domain module.
//!
//! Products with their options, option values and variants, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). Storage backends live in
//! `shopsync-infra` and only ever persist aggregates built here.

pub mod draft;
pub mod filter;
pub mod price;
pub mod product;

pub use draft::{NewOption, NewProduct, NewVariant};
pub use filter::{Pagination, ProductFilter, ProductPage};
pub use price::Price;
pub use product::{
    OptionValue, Product, ProductOption, ProductStatus, ProductSummary, Selection, Variant,
};
