pub mod keystore;

use std::path::{Path, PathBuf};

use alloy::primitives::{Address, Signature};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use thiserror::Error;

use crate::address::checksummed;
use crate::tx_builder::UnsignedTransaction;

pub use keystore::FileKeyStore;

#[derive(Debug, Error)]
pub enum KeystoreError {
	#[error("keystore I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("wrong secret for {0}")]
	WrongSecret(String),

	#[error("keystore crypto error: {0}")]
	Crypto(String),

	#[error("keystore holds an invalid private key")]
	InvalidKey,

	#[error("decrypted key belongs to {found}, expected {expected}")]
	AddressMismatch { expected: String, found: String },

	#[error("signing failed: {0}")]
	Signing(String),
}

/// An account known to the key store.
///
/// `locator` is whatever the backend needs to find the key again; for
/// [`FileKeyStore`] it is the path of the keystore file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
	address: Address,
	locator: PathBuf,
}

impl Identity {
	pub fn new(address: Address, locator: PathBuf) -> Self {
		Self { address, locator }
	}

	pub fn address(&self) -> Address {
		self.address
	}

	pub fn locator(&self) -> &Path {
		&self.locator
	}

	/// EIP-55 form of the address.
	pub fn address_string(&self) -> String {
		checksummed(&self.address)
	}
}

/// Encrypted key storage. Keys never leave the store except inside an
/// [`UnlockedIdentity`], which is consumed by the signature it produces.
pub trait KeyStore: Send + Sync {
	/// All identities in a stable order; positions are the account indexes
	/// users pass on the command line.
	fn list_identities(&self) -> Result<Vec<Identity>, KeystoreError>;

	/// Generate a fresh key and store it encrypted under `secret`.
	fn create_identity(&self, secret: &str) -> Result<Identity, KeystoreError>;

	/// Decrypt the key of `identity`. Fails with
	/// [`KeystoreError::WrongSecret`] if `secret` does not match.
	fn unlock(&self, identity: &Identity, secret: &str) -> Result<UnlockedIdentity, KeystoreError>;
}

/// A decrypted key, good for exactly one signature.
pub struct UnlockedIdentity {
	identity: Identity,
	signer: PrivateKeySigner,
}

impl std::fmt::Debug for UnlockedIdentity {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("UnlockedIdentity")
			.field("address", &self.identity.address)
			.finish_non_exhaustive()
	}
}

impl UnlockedIdentity {
	/// Pair a decrypted key with its identity, checking the key really
	/// derives that address.
	pub fn new(identity: Identity, signer: PrivateKeySigner) -> Result<Self, KeystoreError> {
		if signer.address() != identity.address {
			return Err(KeystoreError::AddressMismatch {
				expected: identity.address_string(),
				found: checksummed(&signer.address()),
			});
		}
		Ok(Self { identity, signer })
	}

	pub fn identity(&self) -> &Identity {
		&self.identity
	}

	/// Sign `tx` for `chain_id`. Takes `self` by value so the key is
	/// dropped (and zeroized) as soon as the signature exists.
	pub fn sign_transaction(
		self,
		tx: &UnsignedTransaction,
		chain_id: u64,
	) -> Result<Signature, KeystoreError> {
		if tx.from != self.identity.address {
			return Err(KeystoreError::Signing(format!(
				"transaction sender {} is not the unlocked account {}",
				checksummed(&tx.from),
				self.identity.address_string()
			)));
		}

		self.signer
			.sign_hash_sync(&tx.signature_hash(chain_id))
			.map_err(|e| KeystoreError::Signing(e.to_string()))
	}
}
