use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{Address, Bytes, Signature, TxKind, B256, U256};
use serde::{Deserialize, Serialize};

/// Fixed gas limits per transaction kind.
///
/// No estimation is performed. A token whose `transfer` needs more than
/// `contract_call` gas runs out of gas and the node rejects or reverts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPolicy {
	pub native_transfer: u64,
	pub contract_call: u64,
}

impl Default for GasPolicy {
	fn default() -> Self {
		Self {
			native_transfer: 21_000,
			contract_call: 60_000,
		}
	}
}

/// A legacy transaction before signing.
///
/// `from` is not part of the signed payload; it identifies whose key and
/// nonce sequence the transaction belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
	pub from: Address,
	pub nonce: u64,
	pub to: Address,
	pub value: U256,
	pub gas_limit: u64,
	pub gas_price: u128,
	pub data: Bytes,
}

/// Build a plain native-coin transfer.
pub fn build_value_transfer(
	sender: Address,
	recipient: Address,
	value: U256,
	nonce: u64,
	gas_limit: u64,
	gas_price: u128,
) -> UnsignedTransaction {
	UnsignedTransaction {
		from: sender,
		nonce,
		to: recipient,
		value,
		gas_limit,
		gas_price,
		data: Bytes::new(),
	}
}

/// Build a contract call carrying `call_data` and no value.
pub fn build_contract_call(
	sender: Address,
	contract: Address,
	call_data: Bytes,
	nonce: u64,
	gas_limit: u64,
	gas_price: u128,
) -> UnsignedTransaction {
	UnsignedTransaction {
		from: sender,
		nonce,
		to: contract,
		value: U256::ZERO,
		gas_limit,
		gas_price,
		data: call_data,
	}
}

impl UnsignedTransaction {
	/// The EIP-155 form of this transaction for `chain_id`.
	pub fn to_legacy(&self, chain_id: u64) -> TxLegacy {
		TxLegacy {
			chain_id: Some(chain_id),
			nonce: self.nonce,
			gas_price: self.gas_price,
			gas_limit: self.gas_limit,
			to: TxKind::Call(self.to),
			value: self.value,
			input: self.data.clone(),
		}
	}

	/// Hash the key signs over. Binding `chain_id` in here is what stops
	/// the signed transaction from being replayed on another network.
	pub fn signature_hash(&self, chain_id: u64) -> B256 {
		self.to_legacy(chain_id).signature_hash()
	}

	/// Attach a signature, producing the broadcastable form.
	pub fn into_signed(self, chain_id: u64, signature: Signature) -> SignedTransaction {
		let signed = self.to_legacy(chain_id).into_signed(signature);
		let hash = *signed.hash();
		let raw = Bytes::from(TxEnvelope::from(signed).encoded_2718());

		SignedTransaction {
			tx: self,
			chain_id,
			signature,
			hash,
			raw,
		}
	}
}

/// A signed transaction together with its hash and RLP encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
	tx: UnsignedTransaction,
	chain_id: u64,
	signature: Signature,
	hash: B256,
	raw: Bytes,
}

impl SignedTransaction {
	pub fn tx(&self) -> &UnsignedTransaction {
		&self.tx
	}

	pub fn chain_id(&self) -> u64 {
		self.chain_id
	}

	pub fn signature(&self) -> &Signature {
		&self.signature
	}

	/// Transaction hash, the identifier reported to the user.
	pub fn hash(&self) -> B256 {
		self.hash
	}

	/// Bytes handed to `eth_sendRawTransaction`.
	pub fn raw(&self) -> &Bytes {
		&self.raw
	}
}
