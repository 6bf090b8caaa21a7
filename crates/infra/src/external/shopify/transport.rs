//! GraphQL Admin API transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use shopsync_stores::Store;

use crate::external::AdapterError;

/// Executes one GraphQL document against a store and yields its `data` object.
#[async_trait]
pub trait AdminTransport: Send + Sync {
    async fn execute(
        &self,
        store: &Store,
        document: &str,
        variables: Value,
    ) -> Result<Value, AdapterError>;
}

#[async_trait]
impl<T> AdminTransport for Arc<T>
where
    T: AdminTransport + ?Sized,
{
    async fn execute(
        &self,
        store: &Store,
        document: &str,
        variables: Value,
    ) -> Result<Value, AdapterError> {
        (**self).execute(store, document, variables).await
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// HTTPS transport for `https://{domain}/admin/api/{version}/graphql.json`.
#[derive(Debug, Clone)]
pub struct HttpAdminTransport {
    client: reqwest::Client,
    api_version: String,
}

impl HttpAdminTransport {
    pub fn new(api_version: impl Into<String>, timeout: Duration) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdapterError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            api_version: api_version.into(),
        })
    }

    fn endpoint(&self, store: &Store) -> String {
        format!(
            "https://{}/admin/api/{}/graphql.json",
            store.domain, self.api_version
        )
    }
}

#[async_trait]
impl AdminTransport for HttpAdminTransport {
    #[instrument(skip(self, store, document, variables), fields(domain = %store.domain), err)]
    async fn execute(
        &self,
        store: &Store,
        document: &str,
        variables: Value,
    ) -> Result<Value, AdapterError> {
        let response = self
            .client
            .post(self.endpoint(store))
            .header("X-Shopify-Access-Token", store.credential.expose())
            .json(&json!({ "query": document, "variables": variables }))
            .send()
            .await
            .map_err(|e| AdapterError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::Transport(format!("HTTP {status}: {body}")));
        }

        let payload: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::UnexpectedResponse(e.to_string()))?;

        if !payload.errors.is_empty() {
            let messages: Vec<_> = payload.errors.into_iter().map(|e| e.message).collect();
            return Err(AdapterError::Transport(messages.join("; ")));
        }

        debug!(%status, "graphql request completed");
        payload
            .data
            .ok_or_else(|| AdapterError::UnexpectedResponse("response has no data".to_string()))
    }
}
