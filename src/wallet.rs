use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};

use crate::abi::InterfaceSource;
use crate::address::parse_address;
use crate::error::{Result, WalletError};
use crate::pipeline::{self, SenderLocks};
use crate::rpc::NodeRpc;
use crate::signer::{Identity, KeyStore};
use crate::token::TokenClient;
use crate::tx_builder::{build_contract_call, build_value_transfer, GasPolicy, UnsignedTransaction};
use crate::units::{self, NATIVE_DECIMALS};

/// Account management and transfers over a key store and a node.
///
/// Every operation validates its inputs (account index, addresses,
/// amounts) before the first node call.
pub struct Wallet {
	store: Arc<dyn KeyStore>,
	node: Arc<dyn NodeRpc>,
	chain_id: u64,
	gas: GasPolicy,
	interface: InterfaceSource,
	locks: SenderLocks,
}

/// Balances of one account, in base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceReport {
	pub address: Address,
	pub native: U256,
	pub token: U256,
	pub token_decimals: u8,
}

impl BalanceReport {
	pub fn native_formatted(&self) -> String {
		units::from_base_units(self.native, NATIVE_DECIMALS)
	}

	pub fn token_formatted(&self) -> String {
		units::from_base_units(self.token, self.token_decimals)
	}
}

impl Wallet {
	pub fn new(store: Arc<dyn KeyStore>, node: Arc<dyn NodeRpc>, chain_id: u64) -> Self {
		Self {
			store,
			node,
			chain_id,
			gas: GasPolicy::default(),
			interface: InterfaceSource::default(),
			locks: SenderLocks::new(),
		}
	}

	pub fn with_gas_policy(mut self, gas: GasPolicy) -> Self {
		self.gas = gas;
		self
	}

	pub fn with_interface(mut self, interface: InterfaceSource) -> Self {
		self.interface = interface;
		self
	}

	pub fn chain_id(&self) -> u64 {
		self.chain_id
	}

	// -- Accounts --

	pub fn create_identity(&self, secret: &str) -> Result<Identity> {
		self.store.create_identity(secret).map_err(WalletError::Keystore)
	}

	pub fn list_identities(&self) -> Result<Vec<Identity>> {
		self.store.list_identities().map_err(WalletError::Keystore)
	}

	/// The identity at `index` in listing order.
	pub fn identity_at(&self, index: i64) -> Result<Identity> {
		let identities = self.list_identities()?;
		select(&identities, index).cloned()
	}

	// -- Queries --

	/// Native and token balance of the account at `index`.
	pub async fn check_balance(&self, index: i64, token: &str, decimals: u8) -> Result<BalanceReport> {
		let identity = self.identity_at(index)?;
		let token = self.token(token, decimals)?;

		let native = self
			.node
			.get_balance(identity.address())
			.await
			.map_err(WalletError::Rpc)?;
		let balance = token.balance_of(identity.address()).await?;

		Ok(BalanceReport {
			address: identity.address(),
			native,
			token: balance,
			token_decimals: token.decimals(),
		})
	}

	// -- Transfers --

	/// Send `amount` ether from the account at `from` to `to`.
	pub async fn transfer_native(&self, from: i64, to: &str, amount: &str, secret: &str) -> Result<B256> {
		let identity = self.identity_at(from)?;
		let recipient = parse_address(to).map_err(|e| WalletError::invalid_recipient(to, e))?;
		let value = units::to_base_units(amount, NATIVE_DECIMALS)
			.map_err(|e| WalletError::invalid_amount(amount, e))?;

		let sender = identity.address();
		let _guard = self.locks.acquire(sender).await;
		let (nonce, gas_price) = self.nonce_and_gas_price(sender).await?;

		let tx = build_value_transfer(
			sender,
			recipient,
			value,
			nonce,
			self.gas.native_transfer,
			gas_price,
		);
		tracing::debug!(stage = %pipeline::Stage::Built, from = %sender, to = %recipient, %value, nonce, "native transfer built");

		self.submit(&identity, tx, secret).await
	}

	/// Send `amount` of the token at `token` (with `decimals` precision)
	/// from the account at `from` to `to`.
	pub async fn transfer_token(
		&self,
		from: i64,
		to: &str,
		amount: &str,
		token: &str,
		decimals: u8,
		secret: &str,
	) -> Result<B256> {
		let identity = self.identity_at(from)?;
		let token = self.token(token, decimals)?;
		let value = token.parse_amount(amount)?;
		let data = token.build_transfer_data(to, value)?;

		let sender = identity.address();
		let _guard = self.locks.acquire(sender).await;
		let (nonce, gas_price) = self.nonce_and_gas_price(sender).await?;

		let tx = build_contract_call(
			sender,
			token.address(),
			data,
			nonce,
			self.gas.contract_call,
			gas_price,
		);
		tracing::debug!(stage = %pipeline::Stage::Built, from = %sender, token = %token.address(), %value, nonce, "token transfer built");

		self.submit(&identity, tx, secret).await
	}

	// -- Helpers --

	fn token(&self, address: &str, decimals: u8) -> Result<TokenClient> {
		let address = parse_address(address).map_err(|e| WalletError::invalid_recipient(address, e))?;
		TokenClient::new(address, decimals, Arc::clone(&self.node), &self.interface)
	}

	async fn nonce_and_gas_price(&self, sender: Address) -> Result<(u64, u128)> {
		let nonce = self
			.node
			.get_pending_nonce(sender)
			.await
			.map_err(WalletError::Rpc)?;
		let gas_price = self.node.suggest_gas_price().await.map_err(WalletError::Rpc)?;
		Ok((nonce, gas_price))
	}

	async fn submit(
		&self,
		identity: &Identity,
		tx: UnsignedTransaction,
		secret: &str,
	) -> Result<B256> {
		let unlocked = pipeline::unlock(self.store.as_ref(), identity, secret)?;
		let signed = pipeline::sign(unlocked, tx, self.chain_id)?;
		pipeline::broadcast(self.node.as_ref(), &signed).await
	}
}

/// Pick the identity at `index`, failing for negative or past-the-end
/// indexes.
pub fn select(identities: &[Identity], index: i64) -> Result<&Identity> {
	usize::try_from(index)
		.ok()
		.and_then(|i| identities.get(i))
		.ok_or(WalletError::IndexOutOfRange {
			index,
			count: identities.len(),
		})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::path::PathBuf;

	fn identities(n: u8) -> Vec<Identity> {
		(1..=n)
			.map(|i| Identity::new(Address::repeat_byte(i), PathBuf::from(format!("k{i}"))))
			.collect()
	}

	#[test]
	fn select_in_range() {
		let ids = identities(3);
		assert_eq!(select(&ids, 0).unwrap().address(), Address::repeat_byte(1));
		assert_eq!(select(&ids, 2).unwrap().address(), Address::repeat_byte(3));
	}

	#[test]
	fn select_out_of_range() {
		let ids = identities(2);
		for index in [-1, 2, i64::MAX, i64::MIN] {
			assert!(matches!(
				select(&ids, index),
				Err(WalletError::IndexOutOfRange { count: 2, .. })
			));
		}
		assert!(select(&[], 0).is_err());
	}

	#[test]
	fn report_formats_both_precisions() {
		let report = BalanceReport {
			address: Address::ZERO,
			native: U256::from(2_000_000_000_000_000_000u128),
			token: U256::from(5_000_000u64),
			token_decimals: 6,
		};
		assert_eq!(report.native_formatted(), "2.000000000000000000");
		assert_eq!(report.token_formatted(), "5.000000");
	}
}
