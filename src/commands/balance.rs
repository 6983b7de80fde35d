use anyhow::Result;

use crate::address::checksummed;
use crate::config::Config;
use crate::wallet::BalanceReport;

pub async fn run(config: &Config, index: i64, token_address: &str, decimals: u8) -> Result<()> {
	let wallet = super::wallet(config)?;
	let report = wallet.check_balance(index, token_address, decimals).await?;
	println!("{}", render(&report));
	Ok(())
}

/// The two output lines of `check-balance`.
pub fn render(report: &BalanceReport) -> String {
	let owner = checksummed(&report.address);
	format!(
		"ETH Balance of {owner}: {}\nToken Balance of {owner}: {}",
		report.native_formatted(),
		report.token_formatted()
	)
}
