use anyhow::Result;

use crate::config::Config;

pub async fn eth(config: &Config, from: i64, to: &str, amount: &str) -> Result<()> {
	let wallet = super::wallet(config)?;
	let hash = wallet.transfer_native(from, to, amount, config.password()?).await?;
	println!("Transaction sent: {hash:#x}");
	Ok(())
}

pub async fn token(
	config: &Config,
	from: i64,
	to: &str,
	amount: &str,
	token_address: &str,
	decimals: u8,
) -> Result<()> {
	let wallet = super::wallet(config)?;
	let hash = wallet
		.transfer_token(from, to, amount, token_address, decimals, config.password()?)
		.await?;
	println!("Token transfer transaction sent: {hash:#x}");
	Ok(())
}
