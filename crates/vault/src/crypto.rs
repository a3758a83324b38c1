//! Per-user key derivation and authenticated encryption for stored credentials
//! (spec.md §4.1).

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};
use argon2::Argon2;
use sha2::{Digest, Sha256};

use crate::error::{CredentialError, Result};

/// Current blob format version. Bumping this lets a future change to the
/// KDF or AEAD parameters decrypt old blobs via a version-dispatched path
/// without breaking existing vaults.
pub const BLOB_VERSION: u8 = 1;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Derives a deterministic, per-user 256-bit key from the process-wide
/// master secret and `user_id`. Deterministic salt (spec.md §4.1: "a
/// deterministic per-user salt derived from a hash of `user_id`") means the
/// same `(master_secret, user_id)` pair always yields the same key, which is
/// required since no separate salt is persisted alongside the blob.
fn derive_key(master_secret: &str, user_id: &str) -> Result<[u8; KEY_LEN]> {
	let salt = Sha256::digest(user_id.as_bytes());
	let mut key = [0u8; KEY_LEN];
	Argon2::default()
		.hash_password_into(master_secret.as_bytes(), &salt[..16], &mut key)
		.map_err(|_| CredentialError::EncryptionFailed)?;
	Ok(key)
}

/// Encrypts `plaintext` for `user_id`, returning `[version][nonce][ciphertext]`.
pub fn encrypt(master_secret: &str, user_id: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
	let key_bytes = derive_key(master_secret, user_id)?;
	let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
	let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
	let ciphertext = cipher
		.encrypt(&nonce, plaintext)
		.map_err(|_| CredentialError::EncryptionFailed)?;

	let mut blob = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
	blob.push(BLOB_VERSION);
	blob.extend_from_slice(&nonce);
	blob.extend_from_slice(&ciphertext);
	Ok(blob)
}

/// Decrypts a blob produced by [`encrypt`]. Any failure — bad version, wrong
/// key (changed `MASTER_KEY`), truncated blob, or a failed GCM tag check —
/// surfaces uniformly as [`CredentialError::DecryptionFailed`]; callers must
/// never distinguish these cases to the end user (spec.md §7).
pub fn decrypt(master_secret: &str, user_id: &str, blob: &[u8]) -> Result<Vec<u8>> {
	let (&version, rest) = blob.split_first().ok_or(CredentialError::DecryptionFailed)?;
	if version != BLOB_VERSION {
		return Err(CredentialError::UnsupportedVersion(version));
	}
	if rest.len() < NONCE_LEN {
		return Err(CredentialError::DecryptionFailed);
	}
	let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);
	let nonce = Nonce::from_slice(nonce_bytes);

	let key_bytes = derive_key(master_secret, user_id)?;
	let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes));
	cipher
		.decrypt(nonce, ciphertext)
		.map_err(|_| CredentialError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_with_the_same_master_secret() {
		let blob = encrypt("master-secret", "user-1", b"hunter2").unwrap();
		let plaintext = decrypt("master-secret", "user-1", &blob).unwrap();
		assert_eq!(plaintext, b"hunter2");
	}

	#[test]
	fn decryption_fails_when_master_secret_changes() {
		let blob = encrypt("master-secret", "user-1", b"hunter2").unwrap();
		assert!(decrypt("different-secret", "user-1", &blob).is_err());
	}

	#[test]
	fn ciphertext_never_contains_the_plaintext_bytes() {
		let blob = encrypt("master-secret", "user-1", b"super-secret-password").unwrap();
		let found = blob
			.windows(b"super-secret-password".len())
			.any(|w| w == b"super-secret-password");
		assert!(!found);
	}

	#[test]
	fn decryption_fails_for_a_different_user_id_even_with_same_secret() {
		let blob = encrypt("master-secret", "user-1", b"hunter2").unwrap();
		assert!(decrypt("master-secret", "user-2", &blob).is_err());
	}
}
