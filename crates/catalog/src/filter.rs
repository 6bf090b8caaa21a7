//! Catalog listing filters and pagination.

use serde::{Deserialize, Serialize};

use crate::product::{ProductStatus, ProductSummary};

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 250;

/// Filter for `list_products`.
///
/// All criteria are optional and combined with AND. `search` is a
/// case-insensitive substring match on the title.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    #[serde(default)]
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    /// 1-based page number.
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl ProductFilter {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.limit())
    }

    /// Lower-cased search needle, if any.
    pub fn search_needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, product: &ProductSummary) -> bool {
        if let Some(status) = self.status {
            if product.status != status {
                return false;
            }
        }
        if let Some(vendor) = &self.vendor {
            if product.vendor.as_deref() != Some(vendor.as_str()) {
                return false;
            }
        }
        if let Some(needle) = self.search_needle() {
            if !product.title.to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        Self {
            page,
            limit,
            total,
            pages: total.div_ceil(u64::from(limit.max(1))),
        }
    }
}

/// One page of catalog listing results, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<ProductSummary>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shopsync_core::ProductId;

    fn summary(title: &str, vendor: Option<&str>, status: ProductStatus) -> ProductSummary {
        let now = Utc::now();
        ProductSummary {
            id: ProductId::new(),
            title: title.to_string(),
            description: None,
            vendor: vendor.map(str::to_string),
            product_type: None,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn defaults_and_clamps_paging() {
        let filter = ProductFilter::default();
        assert_eq!((filter.page(), filter.limit(), filter.offset()), (1, 50, 0));

        let filter = ProductFilter {
            page: Some(3),
            limit: Some(10_000),
            ..Default::default()
        };
        assert_eq!(filter.limit(), MAX_PAGE_SIZE);
        assert_eq!(filter.offset(), 500);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let filter = ProductFilter {
            search: Some("SHIRT".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&summary("Blue t-shirt", None, ProductStatus::Active)));
        assert!(!filter.matches(&summary("Mug", None, ProductStatus::Active)));
    }

    #[test]
    fn status_and_vendor_are_equality_filters() {
        let filter = ProductFilter {
            status: Some(ProductStatus::Draft),
            vendor: Some("Acme".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&summary("A", Some("Acme"), ProductStatus::Draft)));
        assert!(!filter.matches(&summary("A", Some("acme"), ProductStatus::Draft)));
        assert!(!filter.matches(&summary("A", Some("Acme"), ProductStatus::Active)));
    }

    #[test]
    fn pagination_counts_partial_pages() {
        assert_eq!(Pagination::new(1, 50, 101).pages, 3);
        assert_eq!(Pagination::new(1, 50, 0).pages, 0);
    }
}
