//! Credential Vault (C1): encrypt, persist, retrieve, validate per-user
//! credentials (spec.md §4.1).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto;
use crate::error::{CredentialError, Result};
use crate::store::{CredentialMetadata, CredentialStore};

/// The encrypted payload's plaintext shape. Both the username and the
/// password are sealed behind the same AEAD blob — spec.md §8 testable
/// property 2 ("a byte-scan never finds the plaintext username or password
/// substring") applies to both, not just the password, so neither field may
/// live in the plaintext metadata file on disk.
#[derive(Debug, Serialize, Deserialize)]
struct EncryptedFields {
	username: String,
	password: String,
}

/// Credentials stay valid for 30 days before [`CredentialVault::validate`]
/// starts returning `false` (spec.md §4.1). Retrieval still works past this
/// point — only the liveness check changes.
const MAX_CREDENTIAL_AGE: Duration = Duration::days(30);

#[derive(Debug, Clone)]
pub struct PlainCredential {
	pub username: String,
	pub password: String,
}

/// Masked credential summary safe to return from the API (spec.md §6 — `GET
/// /credentials/{service}` "never password").
#[derive(Debug, Clone, serde::Serialize)]
pub struct CredentialSummary {
	pub has_credentials: bool,
	pub username: Option<String>,
	pub created_at: Option<DateTime<Utc>>,
	pub updated_at: Option<DateTime<Utc>>,
}

pub struct CredentialVault {
	master_secret: String,
	store: CredentialStore,
}

impl CredentialVault {
	/// Reads `MASTER_KEY` from the environment. Its absence is a startup
	/// error (spec.md §4.1, §6) — callers should propagate this out of
	/// `main` rather than falling back to a default secret.
	pub async fn from_env(dir: impl Into<std::path::PathBuf>) -> Result<Self> {
		let master_secret =
			std::env::var("MASTER_KEY").map_err(|_| CredentialError::MissingMasterSecret)?;
		Self::new(master_secret, dir).await
	}

	pub async fn new(master_secret: String, dir: impl Into<std::path::PathBuf>) -> Result<Self> {
		Ok(Self {
			master_secret,
			store: CredentialStore::open(dir).await?,
		})
	}

	pub async fn store(&self, user_id: Uuid, credential: &PlainCredential) -> Result<()> {
		let fields = EncryptedFields {
			username: credential.username.clone(),
			password: credential.password.clone(),
		};
		let plaintext = serde_json::to_vec(&fields)?;
		let blob = crypto::encrypt(&self.master_secret, &user_id.to_string(), &plaintext)?;
		let meta = CredentialMetadata {
			created_at: Utc::now(),
			last_used_at: None,
			attempt_count: 0,
		};
		self.store.write(&user_id.to_string(), &meta, &blob).await
	}

	/// Decrypts and returns the stored credential, or `None` if none is
	/// stored. A decryption failure (e.g. `MASTER_KEY` rotated underneath a
	/// still-present blob) surfaces as [`CredentialError::DecryptionFailed`]
	/// rather than silently returning `None` (spec.md §4.1).
	pub async fn retrieve(&self, user_id: Uuid) -> Result<Option<PlainCredential>> {
		let key = user_id.to_string();
		if self.store.read_meta(&key).await?.is_none() {
			return Ok(None);
		};
		let Some(blob) = self.store.read_blob(&key).await? else {
			return Ok(None);
		};
		let fields = self.decrypt_fields(&key, &blob)?;
		Ok(Some(PlainCredential {
			username: fields.username,
			password: fields.password,
		}))
	}

	/// Decrypts the blob to recover the username for the masked summary —
	/// the metadata file carries no username, so this is the only source
	/// (spec.md §6 — `GET /credentials/{service}` "never password").
	pub async fn summary(&self, user_id: Uuid) -> Result<CredentialSummary> {
		let key = user_id.to_string();
		match self.store.read_meta(&key).await? {
			Some(meta) => {
				let username = match self.store.read_blob(&key).await? {
					Some(blob) => Some(self.decrypt_fields(&key, &blob)?.username),
					None => None,
				};
				Ok(CredentialSummary {
					has_credentials: true,
					username,
					created_at: Some(meta.created_at),
					updated_at: meta.last_used_at,
				})
			}
			None => Ok(CredentialSummary {
				has_credentials: false,
				username: None,
				created_at: None,
				updated_at: None,
			}),
		}
	}

	fn decrypt_fields(&self, key: &str, blob: &[u8]) -> Result<EncryptedFields> {
		let plaintext = crypto::decrypt(&self.master_secret, key, blob)?;
		serde_json::from_slice(&plaintext).map_err(|_| CredentialError::DecryptionFailed)
	}

	/// `true` if a credential is present, decryptable, and not older than
	/// 30 days (spec.md §4.1). Expired or missing credentials return
	/// `false` without error — this is a liveness predicate, not a fetch.
	pub async fn validate(&self, user_id: Uuid) -> bool {
		let key = user_id.to_string();
		let Ok(Some(meta)) = self.store.read_meta(&key).await else {
			return false;
		};
		if Utc::now() - meta.created_at > MAX_CREDENTIAL_AGE {
			return false;
		}
		let Ok(Some(blob)) = self.store.read_blob(&key).await else {
			return false;
		};
		crypto::decrypt(&self.master_secret, &key, &blob).is_ok()
	}

	pub async fn touch(&self, user_id: Uuid) -> Result<()> {
		let key = user_id.to_string();
		let Some(mut meta) = self.store.read_meta(&key).await? else {
			return Err(CredentialError::NotFound);
		};
		meta.last_used_at = Some(Utc::now());
		meta.attempt_count += 1;
		let Some(blob) = self.store.read_blob(&key).await? else {
			return Err(CredentialError::NotFound);
		};
		self.store.write(&key, &meta, &blob).await
	}

	pub async fn delete(&self, user_id: Uuid) -> Result<()> {
		self.store.delete(&user_id.to_string()).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	async fn vault() -> (CredentialVault, tempfile::TempDir) {
		let dir = tempfile::tempdir().unwrap();
		let vault = CredentialVault::new("master-secret".into(), dir.path()).await.unwrap();
		(vault, dir)
	}

	#[tokio::test]
	async fn retrieve_after_store_returns_exact_plaintext() {
		let (vault, _dir) = vault().await;
		let user_id = Uuid::new_v4();
		let cred = PlainCredential {
			username: "user@example.com".into(),
			password: "hunter2".into(),
		};
		vault.store(user_id, &cred).await.unwrap();

		let retrieved = vault.retrieve(user_id).await.unwrap().unwrap();
		assert_eq!(retrieved.username, "user@example.com");
		assert_eq!(retrieved.password, "hunter2");
	}

	#[tokio::test]
	async fn rotation_overwrites_with_exactly_one_file_on_disk() {
		let (vault, dir) = vault().await;
		let user_id = Uuid::new_v4();
		vault
			.store(
				user_id,
				&PlainCredential {
					username: "a@example.com".into(),
					password: "password-a".into(),
				},
			)
			.await
			.unwrap();
		vault
			.store(
				user_id,
				&PlainCredential {
					username: "b@example.com".into(),
					password: "password-b".into(),
				},
			)
			.await
			.unwrap();

		let retrieved = vault.retrieve(user_id).await.unwrap().unwrap();
		assert_eq!(retrieved.password, "password-b");

		let blob_files: Vec<_> = std::fs::read_dir(dir.path())
			.unwrap()
			.filter_map(|e| e.ok())
			.filter(|e| e.path().extension().is_some_and(|ext| ext == "bin"))
			.collect();
		assert_eq!(blob_files.len(), 1);
	}

	#[tokio::test]
	async fn validate_is_false_when_no_credential_is_stored() {
		let (vault, _dir) = vault().await;
		assert!(!vault.validate(Uuid::new_v4()).await);
	}

	#[tokio::test]
	async fn validate_is_true_for_a_freshly_stored_credential() {
		let (vault, _dir) = vault().await;
		let user_id = Uuid::new_v4();
		vault
			.store(
				user_id,
				&PlainCredential {
					username: "a@example.com".into(),
					password: "p".into(),
				},
			)
			.await
			.unwrap();
		assert!(vault.validate(user_id).await);
	}

	#[tokio::test]
	async fn no_plaintext_substring_survives_on_disk() {
		let (vault, dir) = vault().await;
		let user_id = Uuid::new_v4();
		let cred = PlainCredential {
			username: "user@example.com".into(),
			password: "extremely-unique-secret-phrase".into(),
		};
		vault.store(user_id, &cred).await.unwrap();

		for entry in std::fs::read_dir(dir.path()).unwrap() {
			let path = entry.unwrap().path();
			let bytes = std::fs::read(&path).unwrap();
			for secret in [cred.username.as_str(), cred.password.as_str()] {
				assert!(
					!bytes.windows(secret.len()).any(|w| w == secret.as_bytes()),
					"plaintext secret leaked into {path:?}"
				);
			}
		}
	}

	#[tokio::test]
	async fn summary_recovers_username_from_the_encrypted_blob() {
		let (vault, _dir) = vault().await;
		let user_id = Uuid::new_v4();
		vault
			.store(
				user_id,
				&PlainCredential {
					username: "summary@example.com".into(),
					password: "p".into(),
				},
			)
			.await
			.unwrap();

		let summary = vault.summary(user_id).await.unwrap();
		assert!(summary.has_credentials);
		assert_eq!(summary.username.as_deref(), Some("summary@example.com"));
	}
}
