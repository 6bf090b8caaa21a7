//! GraphQL documents and the wire shapes they exchange.
//!
//! Prices go out as decimal strings; absent optional fields are omitted rather
//! than sent as `null`.

use serde::{Deserialize, Serialize};

use shopsync_catalog::{Product, Variant};

use crate::external::FieldError;

pub(crate) const PRODUCT_CREATE: &str = r#"
mutation CreateProduct($product: ProductCreateInput!) {
  productCreate(product: $product) {
    product {
      id
      options {
        id
        name
      }
    }
    userErrors {
      field
      message
    }
  }
}
"#;

pub(crate) const DEFAULT_LOCATION: &str = r#"
query DefaultLocation {
  locations(first: 1) {
    edges {
      node {
        id
      }
    }
  }
}
"#;

pub(crate) const VARIANTS_BULK_CREATE: &str = r#"
mutation CreateVariants($productId: ID!, $variants: [ProductVariantsBulkInput!]!, $strategy: ProductVariantsBulkCreateStrategy) {
  productVariantsBulkCreate(productId: $productId, variants: $variants, strategy: $strategy) {
    productVariants {
      id
    }
    userErrors {
      field
      message
    }
  }
}
"#;

pub(crate) const REMOVE_STANDALONE_VARIANT: &str = "REMOVE_STANDALONE_VARIANT";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductCreateInput<'a> {
    pub title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_html: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<&'a str>,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub product_options: Vec<OptionCreateInput<'a>>,
}

impl<'a> ProductCreateInput<'a> {
    pub fn from_product(product: &'a Product) -> Self {
        Self {
            title: product.title(),
            description_html: product.description(),
            vendor: product.vendor(),
            product_type: product.product_type(),
            status: product.status().as_str(),
            product_options: product
                .options()
                .iter()
                .map(|option| OptionCreateInput {
                    name: &option.name,
                    values: option
                        .values
                        .iter()
                        .map(|v| NamedValue { name: &v.value })
                        .collect(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OptionCreateInput<'a> {
    pub name: &'a str,
    pub values: Vec<NamedValue<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NamedValue<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VariantInput<'a> {
    pub price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compare_at_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<&'a str>,
    pub option_values: Vec<VariantOptionValueInput<'a>>,
    pub inventory_item: InventoryItemInput<'a>,
    pub inventory_quantities: Vec<InventoryQuantityInput<'a>>,
}

impl<'a> VariantInput<'a> {
    pub fn new(
        variant: &'a Variant,
        option_values: Vec<VariantOptionValueInput<'a>>,
        location_id: &'a str,
    ) -> Self {
        Self {
            price: variant.price.to_string(),
            compare_at_price: variant.compare_at_price.map(|p| p.to_string()),
            barcode: variant.barcode.as_deref(),
            option_values,
            inventory_item: InventoryItemInput {
                sku: variant.sku.as_deref(),
                tracked: true,
            },
            inventory_quantities: vec![InventoryQuantityInput {
                available_quantity: variant.inventory_quantity,
                location_id,
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VariantOptionValueInput<'a> {
    pub option_id: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct InventoryItemInput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<&'a str>,
    pub tracked: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InventoryQuantityInput<'a> {
    pub available_quantity: u32,
    pub location_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

impl From<UserError> for FieldError {
    fn from(value: UserError) -> Self {
        FieldError {
            field: value.field.unwrap_or_default(),
            message: value.message,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductCreateData {
    pub product_create: ProductCreatePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductCreatePayload {
    pub product: Option<CreatedProduct>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedProduct {
    pub id: String,
    #[serde(default)]
    pub options: Vec<CreatedOption>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedOption {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocationsData {
    pub locations: Connection<Node>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Edge<T> {
    pub node: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Node {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VariantsBulkCreateData {
    pub product_variants_bulk_create: VariantsBulkCreatePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VariantsBulkCreatePayload {
    #[serde(default)]
    pub product_variants: Option<Vec<Node>>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}
