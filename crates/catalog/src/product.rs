use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopsync_core::{
    DomainError, DomainResult, OptionId, OptionValueId, ProductId, VariantId,
};

use crate::price::Price;

/// Product status lifecycle (mirrors the storefront's publication states).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    #[default]
    Active,
    Draft,
    Archived,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "ACTIVE",
            ProductStatus::Draft => "DRAFT",
            ProductStatus::Archived => "ARCHIVED",
        }
    }
}

impl FromStr for ProductStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(ProductStatus::Active),
            "DRAFT" => Ok(ProductStatus::Draft),
            "ARCHIVED" => Ok(ProductStatus::Archived),
            other => Err(DomainError::validation(format!(
                "unknown product status {other:?}"
            ))),
        }
    }
}

impl core::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product header fields, without the owned options and variants.
///
/// This is also the row shape returned by catalog listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub title: String,
    pub description: Option<String>,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionValue {
    pub id: OptionValueId,
    pub value: String,
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    pub id: OptionId,
    pub name: String,
    pub position: u32,
    pub values: Vec<OptionValue>,
}

impl ProductOption {
    pub fn value(&self, value: &str) -> Option<&OptionValue> {
        self.values.iter().find(|v| v.value == value)
    }

    pub fn value_by_id(&self, id: OptionValueId) -> Option<&OptionValue> {
        self.values.iter().find(|v| v.id == id)
    }
}

/// One resolved (option, value) pair of a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub option_id: OptionId,
    pub option_name: String,
    pub value_id: OptionValueId,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: VariantId,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub price: Price,
    pub compare_at_price: Option<Price>,
    pub cost: Option<Price>,
    pub inventory_quantity: u32,
    pub position: u32,
    /// One entry per product option, in option position order.
    pub selections: Vec<Selection>,
}

impl Variant {
    /// `(option name, value)` pairs in option order.
    pub fn option_values(&self) -> Vec<(&str, &str)> {
        self.selections
            .iter()
            .map(|s| (s.option_name.as_str(), s.value.as_str()))
            .collect()
    }
}

/// Aggregate root: a product with its options, values and variants.
///
/// Instances are only built from a validated [`crate::NewProduct`] or restored from
/// storage through [`Product::restore`]; both paths enforce the selection invariant
/// (every variant selects exactly one declared value of every option).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(flatten)]
    summary: ProductSummary,
    options: Vec<ProductOption>,
    variants: Vec<Variant>,
}

impl Product {
    pub(crate) fn assemble(
        summary: ProductSummary,
        options: Vec<ProductOption>,
        variants: Vec<Variant>,
    ) -> Self {
        Self {
            summary,
            options,
            variants,
        }
    }

    /// Rebuild an aggregate from stored rows.
    ///
    /// Options, values and variants are ordered by position; each variant's selections
    /// are re-resolved against the options and put in option order.
    pub fn restore(
        summary: ProductSummary,
        mut options: Vec<ProductOption>,
        mut variants: Vec<Variant>,
    ) -> DomainResult<Self> {
        options.sort_by_key(|o| o.position);
        for option in &mut options {
            option.values.sort_by_key(|v| v.position);
        }
        variants.sort_by_key(|v| v.position);

        for variant in &mut variants {
            let mut ordered = Vec::with_capacity(options.len());
            for option in &options {
                let mut matching = variant.selections.iter().filter(|s| s.option_id == option.id);
                let selection = matching.next().ok_or_else(|| {
                    DomainError::invariant(format!(
                        "variant {} has no selection for option {:?}",
                        variant.id, option.name
                    ))
                })?;
                if matching.next().is_some() {
                    return Err(DomainError::invariant(format!(
                        "variant {} selects option {:?} more than once",
                        variant.id, option.name
                    )));
                }
                let value = option.value_by_id(selection.value_id).ok_or_else(|| {
                    DomainError::invariant(format!(
                        "variant {} references a value outside option {:?}",
                        variant.id, option.name
                    ))
                })?;
                ordered.push(Selection {
                    option_id: option.id,
                    option_name: option.name.clone(),
                    value_id: value.id,
                    value: value.value.clone(),
                });
            }
            if variant.selections.len() != ordered.len() {
                return Err(DomainError::invariant(format!(
                    "variant {} references options outside the product",
                    variant.id
                )));
            }
            variant.selections = ordered;
        }

        Ok(Self {
            summary,
            options,
            variants,
        })
    }

    pub fn summary(&self) -> &ProductSummary {
        &self.summary
    }

    pub fn id(&self) -> ProductId {
        self.summary.id
    }

    pub fn title(&self) -> &str {
        &self.summary.title
    }

    pub fn description(&self) -> Option<&str> {
        self.summary.description.as_deref()
    }

    pub fn vendor(&self) -> Option<&str> {
        self.summary.vendor.as_deref()
    }

    pub fn product_type(&self) -> Option<&str> {
        self.summary.product_type.as_deref()
    }

    pub fn status(&self) -> ProductStatus {
        self.summary.status
    }

    pub fn options(&self) -> &[ProductOption] {
        &self.options
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn skus(&self) -> impl Iterator<Item = &str> {
        self.variants.iter().filter_map(|v| v.sku.as_deref())
    }
}
