use thiserror::Error;

pub type Result<T> = std::result::Result<T, CredentialError>;

/// Internal error detail. `Display` never leaks decryption/KDF internals to
/// callers outside this crate (spec.md §4.1, §7) — the API layer maps every
/// variant to the single generic `credential_error` response.
#[derive(Debug, Error)]
pub enum CredentialError {
	#[error("MASTER_KEY environment variable is not set")]
	MissingMasterSecret,

	#[error("no credential stored for this user")]
	NotFound,

	#[error("failed to decrypt stored credential")]
	DecryptionFailed,

	#[error("failed to encrypt credential")]
	EncryptionFailed,

	#[error("unsupported credential blob version: {0}")]
	UnsupportedVersion(u8),

	#[error("credential store I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("credential metadata corrupt: {0}")]
	Corrupt(#[from] serde_json::Error),
}
