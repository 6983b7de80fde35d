use thiserror::Error;

use crate::abi::AbiError;
use crate::address::AddressError;
use crate::rpc::NodeError;
use crate::signer::KeystoreError;
use crate::units::AmountError;

/// Every failure the wallet operations can report. The CLI prints these
/// and exits non-zero; nothing below it retries or swallows them.
#[derive(Debug, Error)]
pub enum WalletError {
	#[error("invalid amount {value:?}: {source}")]
	InvalidAmount {
		value: String,
		#[source]
		source: AmountError,
	},

	#[error("invalid recipient {value:?}: {source}")]
	InvalidRecipient {
		value: String,
		#[source]
		source: AddressError,
	},

	#[error("failed to load contract interface: {0}")]
	InterfaceLoadFailed(String),

	#[error(transparent)]
	Abi(#[from] AbiError),

	#[error("failed to unlock account: {0}")]
	Authentication(#[source] KeystoreError),

	#[error("failed to sign transaction: {0}")]
	Signing(#[source] KeystoreError),

	#[error("node request failed: {0}")]
	Rpc(#[source] NodeError),

	#[error("failed to send transaction: {0}")]
	Broadcast(#[source] NodeError),

	#[error("invalid account index {index}: {count} account(s) available")]
	IndexOutOfRange { index: i64, count: usize },

	#[error(transparent)]
	Keystore(KeystoreError),
}

impl WalletError {
	pub fn invalid_amount(value: &str, source: AmountError) -> Self {
		Self::InvalidAmount {
			value: value.to_owned(),
			source,
		}
	}

	pub fn invalid_recipient(value: &str, source: AddressError) -> Self {
		Self::InvalidRecipient {
			value: value.to_owned(),
			source,
		}
	}
}

pub type Result<T> = std::result::Result<T, WalletError>;
