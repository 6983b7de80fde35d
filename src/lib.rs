pub mod abi;
pub mod address;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod rpc;
pub mod signer;
pub mod token;
pub mod tx_builder;
pub mod units;
pub mod wallet;

pub use error::{Result, WalletError};
pub use wallet::{BalanceReport, Wallet};
