//! Install-flow nonce state.
//!
//! Each authorization attempt gets a single-use nonce bound to the shop that
//! requested it. States expire; callers persist them through the registry.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::ShopDomain;

pub const DEFAULT_INSTALL_STATE_TTL_SECS: i64 = 600;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstallStateError {
    #[error("unknown install state")]
    Unknown,
    #[error("install state was issued for a different shop")]
    ShopMismatch,
    #[error("install state expired at {0}")]
    Expired(DateTime<Utc>),
    #[error("install state was already used")]
    AlreadyUsed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallState {
    pub nonce: String,
    pub shop: ShopDomain,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

impl InstallState {
    pub fn issue(shop: ShopDomain, ttl: Duration, now: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            nonce: hex::encode(bytes),
            shop,
            expires_at: now + ttl,
            used: false,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Check the callback against this state and mark it used.
    ///
    /// A state can be consumed once; a failed check leaves it untouched.
    pub fn consume(&mut self, shop: &ShopDomain, now: DateTime<Utc>) -> Result<(), InstallStateError> {
        if &self.shop != shop {
            return Err(InstallStateError::ShopMismatch);
        }
        if self.is_expired(now) {
            return Err(InstallStateError::Expired(self.expires_at));
        }
        if self.used {
            return Err(InstallStateError::AlreadyUsed);
        }
        self.used = true;
        Ok(())
    }
}
