use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
	name = "eth-manage",
	about = "Manage Ethereum keystore accounts and send ETH and ERC-20 transfers.",
	version
)]
pub struct Cli {
	/// Config file (default: ~/.eth-manage/config.toml).
	#[arg(long, global = true)]
	pub config: Option<PathBuf>,

	/// Network name, e.g. mainnet or sepolia.
	#[arg(long, global = true)]
	pub network: Option<String>,

	/// Override RPC endpoint URL.
	#[arg(long, global = true)]
	pub rpc_url: Option<String>,

	/// Log debug output to stderr.
	#[arg(long, short, global = true)]
	pub verbose: bool,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
	/// Create a new encrypted keystore account.
	CreateAccount,

	/// List keystore accounts with their indexes.
	ListAccounts,

	/// Show the ETH and token balance of an account.
	#[command(allow_negative_numbers = true)]
	CheckBalance {
		/// Account index, as shown by list-accounts.
		#[arg(long)]
		index: i64,

		/// Token contract address.
		#[arg(long)]
		token_address: String,

		/// Token decimals.
		#[arg(long, default_value = "6")]
		decimal: u8,
	},

	/// Send ETH from an account.
	#[command(allow_negative_numbers = true)]
	TransferEth {
		/// Sender account index.
		#[arg(long)]
		from: i64,

		/// Recipient address.
		#[arg(long)]
		to: String,

		/// Amount in ETH, e.g. 0.1.
		#[arg(long)]
		amount: String,
	},

	/// Send ERC-20 tokens from an account.
	#[command(allow_negative_numbers = true)]
	TransferToken {
		/// Sender account index.
		#[arg(long)]
		from: i64,

		/// Recipient address.
		#[arg(long)]
		to: String,

		/// Amount in whole tokens, e.g. 12.5.
		#[arg(long)]
		amount: String,

		/// Token contract address.
		#[arg(long)]
		token_address: String,

		/// Token decimals.
		#[arg(long, default_value = "6")]
		decimal: u8,
	},
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_check_balance_with_default_decimals() {
		let cli = Cli::try_parse_from([
			"eth-manage",
			"check-balance",
			"--index",
			"0",
			"--token-address",
			"0x7070707070707070707070707070707070707070",
		])
		.unwrap();
		match cli.command {
			Command::CheckBalance { index, decimal, .. } => {
				assert_eq!(index, 0);
				assert_eq!(decimal, 6);
			}
			_ => panic!("wrong command"),
		}
	}

	#[test]
	fn negative_index_reaches_the_wallet() {
		let cli = Cli::try_parse_from([
			"eth-manage", "transfer-eth", "--from", "-1", "--to", "0x00", "--amount", "1",
		])
		.unwrap();
		assert!(matches!(cli.command, Command::TransferEth { from: -1, .. }));
	}

	#[test]
	fn global_flags_after_subcommand() {
		let cli = Cli::try_parse_from([
			"eth-manage",
			"list-accounts",
			"--network",
			"sepolia",
			"--verbose",
		])
		.unwrap();
		assert_eq!(cli.network.as_deref(), Some("sepolia"));
		assert!(cli.verbose);
	}

	#[test]
	fn amount_is_kept_as_text() {
		let cli = Cli::try_parse_from([
			"eth-manage",
			"transfer-token",
			"--from",
			"1",
			"--to",
			"0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045",
			"--amount",
			"0.1000000000000000000001",
			"--token-address",
			"0x7070707070707070707070707070707070707070",
			"--decimal",
			"18",
		])
		.unwrap();
		match cli.command {
			Command::TransferToken { amount, decimal, .. } => {
				assert_eq!(amount, "0.1000000000000000000001");
				assert_eq!(decimal, 18);
			}
			_ => panic!("wrong command"),
		}
	}
}
