use core::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use shopsync_core::{DomainError, StoreId};

static SHOP_DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9-]+\.myshopify\.com$").expect("shop domain pattern is valid")
});

/// A `*.myshopify.com` shop domain, lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShopDomain(String);

impl ShopDomain {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let candidate = raw.trim();
        if !SHOP_DOMAIN.is_match(candidate) {
            return Err(DomainError::validation(format!(
                "invalid shop domain {candidate:?}: expected <name>.myshopify.com"
            )));
        }
        Ok(Self(candidate.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ShopDomain {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ShopDomain {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ShopDomain> for String {
    fn from(value: ShopDomain) -> Self {
        value.0
    }
}

impl core::fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque store credential (admin access token).
///
/// Passed through to the transport unmodified. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for Credential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// A connected external storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: StoreId,
    pub domain: ShopDomain,
    #[serde(skip)]
    pub credential: Credential,
    pub scope: Option<String>,
    pub active: bool,
    pub installed_at: DateTime<Utc>,
}

/// Result of a completed authorization, handed to the registry for upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreAuthorization {
    pub domain: ShopDomain,
    pub credential: Credential,
    pub scope: Option<String>,
}

impl StoreAuthorization {
    pub fn new(domain: ShopDomain, credential: Credential) -> Self {
        Self {
            domain,
            credential,
            scope: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Build the store record for a first installation.
    pub fn into_store(self, now: DateTime<Utc>) -> Store {
        Store {
            id: StoreId::new(),
            domain: self.domain,
            credential: self.credential,
            scope: self.scope,
            active: true,
            installed_at: now,
        }
    }

    /// Refresh an existing record: new credential and scope, reactivated.
    pub fn apply_to(self, store: &mut Store, now: DateTime<Utc>) {
        store.credential = self.credential;
        store.scope = self.scope;
        if !store.active {
            store.installed_at = now;
        }
        store.active = true;
    }
}
