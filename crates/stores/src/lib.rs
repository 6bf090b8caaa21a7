//! Connected storefronts.
//!
//! Store records are created by the install/authorization collaborator; the sync
//! engine only reads them. The nonce bookkeeping used during installation lives here
//! too, as plain values with an explicit expiry.

pub mod install;
pub mod store;

pub use install::{InstallState, InstallStateError, DEFAULT_INSTALL_STATE_TTL_SECS};
pub use store::{Credential, ShopDomain, Store, StoreAuthorization};
