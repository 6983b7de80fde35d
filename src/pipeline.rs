//! Unlock, sign and broadcast.
//!
//! A transaction moves `Built -> Unlocked -> Signed -> Broadcast`, and any
//! step may fail with its own [`WalletError`] kind. The steps are plain
//! functions over move-only values: [`sign`] consumes the
//! [`UnlockedIdentity`], so a decrypted key never outlives the one
//! signature it was unlocked for. A returned hash only means the node
//! accepted the transaction into its pending pool.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use alloy::primitives::{Address, B256};
use tokio::sync::OwnedMutexGuard;

use crate::error::{Result, WalletError};
use crate::rpc::NodeRpc;
use crate::signer::{Identity, KeyStore, UnlockedIdentity};
use crate::tx_builder::{SignedTransaction, UnsignedTransaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
	Built,
	Unlocked,
	Signed,
	Broadcast,
}

impl std::fmt::Display for Stage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			Self::Built => "built",
			Self::Unlocked => "unlocked",
			Self::Signed => "signed",
			Self::Broadcast => "broadcast",
		})
	}
}

/// Decrypt the key for `identity`.
pub fn unlock(store: &dyn KeyStore, identity: &Identity, secret: &str) -> Result<UnlockedIdentity> {
	let unlocked = store
		.unlock(identity, secret)
		.map_err(WalletError::Authentication)?;
	tracing::debug!(stage = %Stage::Unlocked, address = %identity.address(), "account unlocked");
	Ok(unlocked)
}

/// Sign `tx` for `chain_id`, consuming the unlocked key.
pub fn sign(
	unlocked: UnlockedIdentity,
	tx: UnsignedTransaction,
	chain_id: u64,
) -> Result<SignedTransaction> {
	let signature = unlocked
		.sign_transaction(&tx, chain_id)
		.map_err(WalletError::Signing)?;
	let signed = tx.into_signed(chain_id, signature);
	tracing::debug!(stage = %Stage::Signed, hash = %signed.hash(), chain_id, "transaction signed");
	Ok(signed)
}

/// Submit a signed transaction. Never retried; the node's rejection
/// reason is passed through unchanged.
pub async fn broadcast(node: &dyn NodeRpc, signed: &SignedTransaction) -> Result<B256> {
	let hash = node
		.send_raw_transaction(signed.raw().clone())
		.await
		.map_err(WalletError::Broadcast)?;

	if hash != signed.hash() {
		tracing::warn!(local = %signed.hash(), node = %hash, "node reported a different transaction hash");
	}
	tracing::info!(stage = %Stage::Broadcast, hash = %hash, nonce = signed.tx().nonce, "transaction sent");
	Ok(hash)
}

/// One async mutex per sender address.
///
/// Holding a sender's guard from nonce lookup through broadcast keeps two
/// submissions in this process from reading the same pending nonce.
/// Separate processes are not coordinated and can still collide; the node
/// then rejects one of them with a nonce error.
#[derive(Debug, Default)]
pub struct SenderLocks {
	locks: Mutex<HashMap<Address, Arc<tokio::sync::Mutex<()>>>>,
}

impl SenderLocks {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn acquire(&self, sender: Address) -> OwnedMutexGuard<()> {
		let lock = {
			let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
			Arc::clone(locks.entry(sender).or_default())
		};
		lock.lock_owned().await
	}
}
