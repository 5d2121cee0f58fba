//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use swap_types::ChainId;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "gasless-swap")]
#[command(about = "Gasless cross-chain swaps with EIP-2612 permits", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
	#[command(subcommand)]
	pub command: Command,

	/// Path to configuration file
	#[arg(short, long, value_name = "FILE", default_value = "config/gasless-swap.toml")]
	pub config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(long, env = "SWAP_LOG_LEVEL", default_value = "info")]
	pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Sign a permit and drive a swap to completion
	Swap(SwapArgs),

	/// Continue an archived swap that did not complete
	Resume {
		/// Intent id
		id: Uuid,
	},

	/// Show balance and permit nonce of an account
	Inspect {
		/// Chain id of the token
		#[arg(long, default_value = "1")]
		chain: ChainId,

		/// Token contract address
		#[arg(long)]
		token: String,

		/// Account to inspect; defaults to the configured wallet
		#[arg(long)]
		account: Option<String>,
	},

	/// List registered tokens
	Tokens {
		/// Only list tokens of this chain
		#[arg(long)]
		chain: Option<ChainId>,
	},

	/// Validate the configuration file
	Validate,

	/// Print an archived swap, or list archived ids
	History {
		/// Intent id; omit to list everything archived
		id: Option<Uuid>,
	},
}

#[derive(clap::Args, Debug)]
pub struct SwapArgs {
	/// Source chain id
	#[arg(long, default_value = "1")]
	pub from_chain: ChainId,

	/// Source token contract address
	#[arg(long)]
	pub token: String,

	/// Human-readable amount, e.g. 10.5
	#[arg(long)]
	pub amount: String,

	/// Destination chain id
	#[arg(long, default_value = "501")]
	pub to_chain: ChainId,

	/// Destination token identifier
	#[arg(long)]
	pub dest_token: String,

	/// Recipient on the destination chain; defaults to the signer
	#[arg(long)]
	pub recipient: Option<String>,

	/// Slippage tolerance in percent
	#[arg(long)]
	pub slippage: Option<Decimal>,
}
