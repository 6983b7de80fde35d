pub mod account;
pub mod balance;
pub mod transfer;

use std::sync::Arc;

use anyhow::Result;

use crate::abi::InterfaceSource;
use crate::cli::Cli;
use crate::config::{self, Config};
use crate::rpc::{HttpNode, TimedNode};
use crate::signer::FileKeyStore;
use crate::wallet::Wallet;

/// Load `.env`, the config file and environment, then apply CLI flags on
/// top.
pub fn load_config(cli: &Cli) -> Result<Config> {
	config::load_dotenv(None)?;
	let mut config = Config::load(cli.config.as_deref())?;
	if let Some(network) = &cli.network {
		config.network.name = network.clone();
	}
	if let Some(url) = &cli.rpc_url {
		config.network.rpc_url = Some(url.clone());
	}
	Ok(config)
}

pub fn keystore(config: &Config) -> FileKeyStore {
	FileKeyStore::new(&config.keystore.dir)
}

/// Wire a wallet to the configured keystore directory and node.
pub fn wallet(config: &Config) -> Result<Wallet> {
	let url = config.rpc_url()?;
	let node = TimedNode::new(HttpNode::new(&url)?, config.rpc_timeout());
	tracing::debug!(network = %config.network.name, "using node");

	let wallet = Wallet::new(Arc::new(keystore(config)), Arc::new(node), config.chain_id()?)
		.with_gas_policy(config.gas)
		.with_interface(InterfaceSource::from_path(config.token.abi_path.as_deref()));
	Ok(wallet)
}
