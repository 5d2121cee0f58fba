//! Chain identifiers and network metadata.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chain identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl ChainId {
	pub const ETHEREUM: Self = Self(1);
	pub const BASE: Self = Self(8453);
	pub const AVALANCHE: Self = Self(43114);
	pub const SOLANA: Self = Self(501);
}

impl fmt::Display for ChainId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for ChainId {
	type Err = std::num::ParseIntError;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		let s = s.trim();
		// Wallets report chain ids as 0x-prefixed quantities.
		if let Some(hex) = s.strip_prefix("0x") {
			return Ok(ChainId(u64::from_str_radix(hex, 16)?));
		}
		Ok(ChainId(s.parse()?))
	}
}

impl From<u64> for ChainId {
	fn from(id: u64) -> Self {
		ChainId(id)
	}
}

/// Network metadata for a configured chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
	/// Human readable chain name.
	pub name: String,
	/// JSON-RPC endpoint. Display-only chains (e.g. Solana) have none.
	#[serde(default)]
	pub rpc_url: Option<String>,
	/// Block explorer base URL.
	pub explorer_url: String,
}

/// Formats a chain id the way it is shown to users: `8453 (Base)`.
pub fn describe_chain(chain_id: ChainId, network: Option<&NetworkInfo>) -> String {
	match network {
		Some(network) => format!("{} ({})", chain_id, network.name),
		None => format!("{} (Unknown)", chain_id),
	}
}
