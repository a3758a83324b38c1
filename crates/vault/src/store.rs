//! File-based persistence for encrypted credential blobs (spec.md §4.1, §6).
//!
//! Layout per user: `{dir}/{user_id}.meta.json` (bookkeeping only — no
//! username or password) and `{dir}/{user_id}.bin` (the encrypted blob from
//! [`crate::crypto`], which carries both secrets). The directory is created
//! `0700`; blob files are written `0600`. Grounded on the teacher's
//! schema-versioned, atomic-write-then-rename `ContextStoreFile` persistence
//! pattern.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialMetadata {
	pub created_at: DateTime<Utc>,
	pub last_used_at: Option<DateTime<Utc>>,
	pub attempt_count: u32,
}

pub struct CredentialStore {
	dir: PathBuf,
}

impl CredentialStore {
	pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
		let dir = dir.into();
		tokio::fs::create_dir_all(&dir).await?;
		set_mode(&dir, 0o700).await?;
		Ok(Self { dir })
	}

	fn meta_path(&self, user_id: &str) -> PathBuf {
		self.dir.join(format!("{user_id}.meta.json"))
	}

	fn blob_path(&self, user_id: &str) -> PathBuf {
		self.dir.join(format!("{user_id}.bin"))
	}

	pub async fn exists(&self, user_id: &str) -> bool {
		tokio::fs::try_exists(self.meta_path(user_id)).await.unwrap_or(false)
	}

	pub async fn write(&self, user_id: &str, meta: &CredentialMetadata, blob: &[u8]) -> Result<()> {
		write_atomic(&self.meta_path(user_id), serde_json::to_vec_pretty(meta)?.as_slice()).await?;
		write_atomic(&self.blob_path(user_id), blob).await?;
		set_mode(&self.blob_path(user_id), 0o600).await?;
		set_mode(&self.meta_path(user_id), 0o600).await?;
		Ok(())
	}

	pub async fn read_meta(&self, user_id: &str) -> Result<Option<CredentialMetadata>> {
		match tokio::fs::read(self.meta_path(user_id)).await {
			Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(e.into()),
		}
	}

	pub async fn read_blob(&self, user_id: &str) -> Result<Option<Vec<u8>>> {
		match tokio::fs::read(self.blob_path(user_id)).await {
			Ok(bytes) => Ok(Some(bytes)),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(e.into()),
		}
	}

	pub async fn delete(&self, user_id: &str) -> Result<()> {
		let _ = tokio::fs::remove_file(self.meta_path(user_id)).await;
		let _ = tokio::fs::remove_file(self.blob_path(user_id)).await;
		Ok(())
	}
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
	let tmp = path.with_extension("tmp");
	tokio::fs::write(&tmp, bytes).await?;
	tokio::fs::rename(&tmp, path).await?;
	Ok(())
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> Result<()> {
	use std::os::unix::fs::PermissionsExt;
	let perms = std::fs::Permissions::from_mode(mode);
	tokio::fs::set_permissions(path, perms).await?;
	Ok(())
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn write_then_read_round_trips_metadata_and_blob() {
		let dir = tempfile::tempdir().unwrap();
		let store = CredentialStore::open(dir.path()).await.unwrap();
		let meta = CredentialMetadata {
			created_at: Utc::now(),
			last_used_at: None,
			attempt_count: 0,
		};
		store.write("user-1", &meta, b"blob-bytes").await.unwrap();

		let read_meta = store.read_meta("user-1").await.unwrap().unwrap();
		assert_eq!(read_meta.attempt_count, 0);
		let read_blob = store.read_blob("user-1").await.unwrap().unwrap();
		assert_eq!(read_blob, b"blob-bytes");
	}

	#[tokio::test]
	async fn delete_removes_both_files() {
		let dir = tempfile::tempdir().unwrap();
		let store = CredentialStore::open(dir.path()).await.unwrap();
		let meta = CredentialMetadata {
			created_at: Utc::now(),
			last_used_at: None,
			attempt_count: 0,
		};
		store.write("user-1", &meta, b"blob").await.unwrap();
		store.delete("user-1").await.unwrap();
		assert!(!store.exists("user-1").await);
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn blob_file_is_mode_0600() {
		use std::os::unix::fs::PermissionsExt;
		let dir = tempfile::tempdir().unwrap();
		let store = CredentialStore::open(dir.path()).await.unwrap();
		let meta = CredentialMetadata {
			created_at: Utc::now(),
			last_used_at: None,
			attempt_count: 0,
		};
		store.write("user-1", &meta, b"blob").await.unwrap();
		let perms = tokio::fs::metadata(store.blob_path("user-1")).await.unwrap().permissions();
		assert_eq!(perms.mode() & 0o777, 0o600);
	}
}
