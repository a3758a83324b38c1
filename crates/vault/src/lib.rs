//! Credential Vault (C1): per-user encrypted credential storage.
//!
//! Layered as `crypto` (KDF + AEAD) -> `store` (atomic file persistence) ->
//! `vault` (the public [`CredentialVault`] API). Nothing outside this crate
//! ever sees a raw key or an undecrypted blob.

mod crypto;
mod error;
mod store;
mod vault;

pub use error::{CredentialError, Result};
pub use vault::{CredentialSummary, CredentialVault, PlainCredential};
