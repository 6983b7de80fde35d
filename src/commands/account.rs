use anyhow::Result;

use crate::config::Config;
use crate::signer::KeyStore;

pub fn create(config: &Config) -> Result<()> {
	let store = super::keystore(config);
	let identity = store.create_identity(config.password()?)?;
	println!("Account created: {}", identity.address_string());
	Ok(())
}

pub fn list(config: &Config) -> Result<()> {
	let identities = super::keystore(config).list_identities()?;
	if identities.is_empty() {
		println!("No accounts found in {}.", config.keystore.dir.display());
		return Ok(());
	}

	for (i, identity) in identities.iter().enumerate() {
		println!("Index: {i}, Address: {}", identity.address_string());
	}
	Ok(())
}
