use std::sync::Arc;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, Bytes, U256};

use crate::abi::{AbiError, ContractInterface, InterfaceSource};
use crate::address::parse_address;
use crate::error::{Result, WalletError};
use crate::rpc::NodeRpc;
use crate::units;

/// An ERC-20 style token contract reached through a node.
pub struct TokenClient {
	address: Address,
	decimals: u8,
	interface: Arc<ContractInterface>,
	node: Arc<dyn NodeRpc>,
}

impl std::fmt::Debug for TokenClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TokenClient")
			.field("address", &self.address)
			.field("decimals", &self.decimals)
			.finish_non_exhaustive()
	}
}

impl TokenClient {
	/// Load the contract interface from `source` and bind it to the token
	/// at `address`. Decimals are taken as given, never queried.
	pub fn new(
		address: Address,
		decimals: u8,
		node: Arc<dyn NodeRpc>,
		source: &InterfaceSource,
	) -> Result<Self> {
		let raw = source
			.read()
			.map_err(|e| WalletError::InterfaceLoadFailed(e.to_string()))?;
		let interface = ContractInterface::load(&raw)
			.map_err(|e| WalletError::InterfaceLoadFailed(e.to_string()))?;

		Ok(Self::with_interface(address, decimals, node, Arc::new(interface)))
	}

	/// Bind an already loaded interface.
	pub fn with_interface(
		address: Address,
		decimals: u8,
		node: Arc<dyn NodeRpc>,
		interface: Arc<ContractInterface>,
	) -> Self {
		Self {
			address,
			decimals,
			interface,
			node,
		}
	}

	pub fn address(&self) -> Address {
		self.address
	}

	pub fn decimals(&self) -> u8 {
		self.decimals
	}

	pub fn interface(&self) -> &ContractInterface {
		&self.interface
	}

	/// Token balance of `owner` in base units, via a read-only `eth_call`.
	pub async fn balance_of(&self, owner: Address) -> Result<U256> {
		let data = self
			.interface
			.encode_call("balanceOf", &[DynSolValue::Address(owner)])?;

		let reply = self
			.node
			.call(self.address, data)
			.await
			.map_err(WalletError::Rpc)?;

		let values = self.interface.decode_result("balanceOf", &reply)?;
		match values.as_slice() {
			[DynSolValue::Uint(balance, _)] => Ok(*balance),
			other => Err(AbiError::Decode {
				name: "balanceOf".into(),
				reason: format!("expected a single uint, got {other:?}"),
			}
			.into()),
		}
	}

	/// Call-data for `transfer(recipient, amount)`. No I/O.
	pub fn build_transfer_data(&self, recipient: &str, amount: U256) -> Result<Bytes> {
		let to = parse_address(recipient).map_err(|e| WalletError::invalid_recipient(recipient, e))?;
		let data = self.interface.encode_call(
			"transfer",
			&[DynSolValue::Address(to), DynSolValue::Uint(amount, 256)],
		)?;
		Ok(data)
	}

	/// Parse a human amount at this token's precision.
	pub fn parse_amount(&self, human: &str) -> Result<U256> {
		units::to_base_units(human, self.decimals).map_err(|e| WalletError::invalid_amount(human, e))
	}

	/// Format a base-unit amount at this token's precision.
	pub fn format_amount(&self, amount: U256) -> String {
		units::from_base_units(amount, self.decimals)
	}
}
