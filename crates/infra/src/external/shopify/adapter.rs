use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use shopsync_catalog::Product;
use shopsync_core::StoreId;
use shopsync_stores::Store;

use super::payload::{
    DEFAULT_LOCATION, LocationsData, PRODUCT_CREATE, ProductCreateData, ProductCreateInput,
    REMOVE_STANDALONE_VARIANT, VARIANTS_BULK_CREATE, VariantInput, VariantOptionValueInput,
    VariantsBulkCreateData,
};
use super::transport::AdminTransport;
use crate::external::{AdapterError, ExternalProduct, ExternalStoreAdapter, FieldError};

/// Creates products through the GraphQL Admin API.
///
/// Each store's default inventory location is looked up once and cached for
/// the adapter's lifetime.
#[derive(Debug)]
pub struct ShopifyAdapter<T> {
    transport: T,
    locations: RwLock<HashMap<StoreId, String>>,
}

impl<T> ShopifyAdapter<T>
where
    T: AdminTransport,
{
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            locations: RwLock::new(HashMap::new()),
        }
    }

    async fn request<D: DeserializeOwned>(
        &self,
        store: &Store,
        document: &str,
        variables: Value,
    ) -> Result<D, AdapterError> {
        let data = self.transport.execute(store, document, variables).await?;
        serde_json::from_value(data).map_err(|e| AdapterError::UnexpectedResponse(e.to_string()))
    }

    async fn default_location(&self, store: &Store) -> Result<String, AdapterError> {
        let cached = self
            .locations
            .read()
            .ok()
            .and_then(|map| map.get(&store.id).cloned());
        if let Some(location) = cached {
            return Ok(location);
        }

        let data: LocationsData = self.request(store, DEFAULT_LOCATION, json!({})).await?;
        let location = data
            .locations
            .edges
            .into_iter()
            .next()
            .map(|edge| edge.node.id)
            .ok_or(AdapterError::MissingLocation)?;

        if let Ok(mut map) = self.locations.write() {
            map.insert(store.id, location.clone());
        }
        debug!(store_id = %store.id, %location, "default location resolved");
        Ok(location)
    }
}

fn field_errors(errors: Vec<super::payload::UserError>) -> AdapterError {
    AdapterError::Field(errors.into_iter().map(FieldError::from).collect())
}

#[async_trait]
impl<T> ExternalStoreAdapter for ShopifyAdapter<T>
where
    T: AdminTransport,
{
    #[instrument(
        skip(self, store, product),
        fields(store_id = %store.id, domain = %store.domain, product_id = %product.id()),
        err
    )]
    async fn create_product(
        &self,
        store: &Store,
        product: &Product,
    ) -> Result<ExternalProduct, AdapterError> {
        let input = ProductCreateInput::from_product(product);
        let created: ProductCreateData = self
            .request(store, PRODUCT_CREATE, json!({ "product": input }))
            .await?;

        let payload = created.product_create;
        if !payload.user_errors.is_empty() {
            return Err(field_errors(payload.user_errors));
        }
        let shell = payload.product.ok_or_else(|| {
            AdapterError::UnexpectedResponse("productCreate returned no product".to_string())
        })?;

        if product.variants().is_empty() {
            info!(external_product_id = %shell.id, "product created without variants");
            return Ok(ExternalProduct {
                product_id: shell.id,
                variant_ids: Vec::new(),
            });
        }

        let option_ids: HashMap<&str, &str> = shell
            .options
            .iter()
            .map(|o| (o.name.as_str(), o.id.as_str()))
            .collect();

        let location = self.default_location(store).await?;

        let mut variants = Vec::with_capacity(product.variants().len());
        for variant in product.variants() {
            let mut option_values = Vec::with_capacity(variant.selections.len());
            for selection in &variant.selections {
                let option_id = option_ids
                    .get(selection.option_name.as_str())
                    .copied()
                    .ok_or_else(|| {
                        AdapterError::UnexpectedResponse(format!(
                            "productCreate response lacks option {:?}",
                            selection.option_name
                        ))
                    })?;
                option_values.push(VariantOptionValueInput {
                    option_id,
                    name: &selection.value,
                });
            }
            variants.push(VariantInput::new(variant, option_values, &location));
        }

        let created: VariantsBulkCreateData = self
            .request(
                store,
                VARIANTS_BULK_CREATE,
                json!({
                    "productId": shell.id,
                    "variants": variants,
                    "strategy": REMOVE_STANDALONE_VARIANT,
                }),
            )
            .await?;

        let payload = created.product_variants_bulk_create;
        if !payload.user_errors.is_empty() {
            return Err(field_errors(payload.user_errors));
        }
        let variant_ids: Vec<String> = payload
            .product_variants
            .unwrap_or_default()
            .into_iter()
            .map(|node| node.id)
            .collect();

        info!(
            external_product_id = %shell.id,
            variants = variant_ids.len(),
            "product created"
        );
        Ok(ExternalProduct {
            product_id: shell.id,
            variant_ids,
        })
    }
}
