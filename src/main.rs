use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use eth_manage::cli::{Cli, Command};
use eth_manage::commands;

fn init_tracing(verbose: bool) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("eth_manage=debug")
		} else {
			EnvFilter::new("eth_manage=warn")
		}
	});

	tracing_subscriber::registry()
		.with(fmt::layer().with_target(false).with_writer(std::io::stderr))
		.with(filter)
		.init();
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	init_tracing(cli.verbose);

	let config = commands::load_config(&cli)?;

	match &cli.command {
		Command::CreateAccount => commands::account::create(&config),
		Command::ListAccounts => commands::account::list(&config),
		Command::CheckBalance {
			index,
			token_address,
			decimal,
		} => commands::balance::run(&config, *index, token_address, *decimal).await,
		Command::TransferEth { from, to, amount } => {
			commands::transfer::eth(&config, *from, to, amount).await
		}
		Command::TransferToken {
			from,
			to,
			amount,
			token_address,
			decimal,
		} => commands::transfer::token(&config, *from, to, amount, token_address, *decimal).await,
	}
}
