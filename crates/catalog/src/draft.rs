//! Catalog input: the product draft accepted by `create_product`.
//!
//! [`NewProduct::into_product`] performs every check that does not need storage.
//! Catalog-wide sku uniqueness is the store's responsibility.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopsync_core::{DomainError, DomainResult, OptionId, OptionValueId, ProductId, VariantId};

use crate::price::Price;
use crate::product::{
    OptionValue, Product, ProductOption, ProductStatus, ProductSummary, Selection, Variant,
};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOption {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVariant {
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub compare_at_price: Option<Decimal>,
    #[serde(default)]
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub inventory_quantity: Option<i64>,
    /// Option name -> value.
    #[serde(default)]
    pub option_values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub options: Vec<NewOption>,
    #[serde(default)]
    pub variants: Vec<NewVariant>,
}

impl NewProduct {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_option<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.push(NewOption {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn with_variant(mut self, variant: NewVariant) -> Self {
        self.variants.push(variant);
        self
    }

    /// Validate the draft and build the aggregate, assigning fresh ids and 1-based
    /// positions in input order.
    pub fn into_product(self, now: DateTime<Utc>) -> DomainResult<Product> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(DomainError::validation("title is required"));
        }

        let options = build_options(&self.options)?;

        let mut seen_skus = HashSet::new();
        let mut seen_combinations = HashSet::new();
        let mut variants = Vec::with_capacity(self.variants.len());

        for (index, input) in self.variants.iter().enumerate() {
            let position = index as u32 + 1;
            let variant = build_variant(position, input, &options)?;

            if let Some(sku) = &variant.sku {
                if !seen_skus.insert(sku.clone()) {
                    return Err(DomainError::validation(format!(
                        "sku {sku:?} is used by more than one variant"
                    )));
                }
            }

            let combination: Vec<OptionValueId> =
                variant.selections.iter().map(|s| s.value_id).collect();
            if !seen_combinations.insert(combination) {
                return Err(DomainError::validation(format!(
                    "variant {position} repeats the option combination of an earlier variant"
                )));
            }

            variants.push(variant);
        }

        let summary = ProductSummary {
            id: ProductId::new(),
            title: title.to_string(),
            description: non_blank(self.description),
            vendor: non_blank(self.vendor),
            product_type: non_blank(self.product_type),
            status: self.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        Ok(Product::assemble(summary, options, variants))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn build_options(inputs: &[NewOption]) -> DomainResult<Vec<ProductOption>> {
    let mut names = HashSet::new();
    let mut options = Vec::with_capacity(inputs.len());

    for (index, input) in inputs.iter().enumerate() {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation(format!(
                "option {} has an empty name",
                index + 1
            )));
        }
        if !names.insert(name.to_string()) {
            return Err(DomainError::validation(format!(
                "option name {name:?} is declared more than once"
            )));
        }
        if input.values.is_empty() {
            return Err(DomainError::validation(format!(
                "option {name:?} declares no values"
            )));
        }

        let mut seen = HashSet::new();
        let mut values = Vec::with_capacity(input.values.len());
        for (value_index, raw) in input.values.iter().enumerate() {
            let value = raw.trim();
            if value.is_empty() {
                return Err(DomainError::validation(format!(
                    "option {name:?} has an empty value"
                )));
            }
            if !seen.insert(value.to_string()) {
                return Err(DomainError::validation(format!(
                    "option {name:?} declares value {value:?} more than once"
                )));
            }
            values.push(OptionValue {
                id: OptionValueId::new(),
                value: value.to_string(),
                position: value_index as u32 + 1,
            });
        }

        options.push(ProductOption {
            id: OptionId::new(),
            name: name.to_string(),
            position: index as u32 + 1,
            values,
        });
    }

    Ok(options)
}

fn build_variant(
    position: u32,
    input: &NewVariant,
    options: &[ProductOption],
) -> DomainResult<Variant> {
    let field = |name: &str, amount: Decimal| {
        Price::new(amount).map_err(|_| {
            DomainError::validation(format!(
                "variant {position}: {name} must be non-negative, got {amount}"
            ))
        })
    };

    let sku = match &input.sku {
        Some(sku) if sku.trim().is_empty() => {
            return Err(DomainError::validation(format!(
                "variant {position}: sku must not be blank"
            )));
        }
        Some(sku) => Some(sku.trim().to_string()),
        None => None,
    };

    let price = field("price", input.price)?;
    let compare_at_price = input
        .compare_at_price
        .map(|p| field("compareAtPrice", p))
        .transpose()?;
    let cost = input.cost.map(|c| field("cost", c)).transpose()?;

    let inventory_quantity = match input.inventory_quantity.unwrap_or(0) {
        q if q < 0 => {
            return Err(DomainError::validation(format!(
                "variant {position}: inventoryQuantity must be non-negative, got {q}"
            )));
        }
        q => u32::try_from(q).map_err(|_| {
            DomainError::validation(format!(
                "variant {position}: inventoryQuantity {q} is out of range"
            ))
        })?,
    };

    let by_name: HashMap<&str, &ProductOption> =
        options.iter().map(|o| (o.name.as_str(), o)).collect();
    for (option_name, value) in &input.option_values {
        let option = by_name.get(option_name.trim()).ok_or_else(|| {
            DomainError::validation(format!(
                "variant {position} references undeclared option {option_name:?}"
            ))
        })?;
        if option.value(value.trim()).is_none() {
            return Err(DomainError::validation(format!(
                "variant {position} references undeclared value {value:?} of option {:?}",
                option.name
            )));
        }
    }

    let mut selections = Vec::with_capacity(options.len());
    for option in options {
        let value = input
            .option_values
            .iter()
            .find(|(name, _)| name.trim() == option.name)
            .map(|(_, value)| value.trim())
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "variant {position} does not select a value for option {:?}",
                    option.name
                ))
            })?;
        // Presence was checked above.
        let Some(resolved) = option.value(value) else {
            return Err(DomainError::validation(format!(
                "variant {position} references undeclared value {value:?} of option {:?}",
                option.name
            )));
        };
        selections.push(Selection {
            option_id: option.id,
            option_name: option.name.clone(),
            value_id: resolved.id,
            value: resolved.value.clone(),
        });
    }

    if input.option_values.len() != selections.len() {
        return Err(DomainError::validation(format!(
            "variant {position} selects the same option more than once"
        )));
    }

    Ok(Variant {
        id: VariantId::new(),
        sku,
        barcode: non_blank(input.barcode.clone()),
        price,
        compare_at_price,
        cost,
        inventory_quantity,
        position,
        selections,
    })
}
