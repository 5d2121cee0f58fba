//! Typed configuration sections.

use crate::serde_helpers::{deserialize_chain_id_map, serialize_chain_id_map};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use swap_types::{Address, ChainId, NetworkInfo, PermitDomain, TokenInfo};

/// A credential that is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	pub fn expose(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for Secret {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Secret(***)")
	}
}

/// Root configuration of the swap client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	pub swap: SwapSettings,
	#[serde(default)]
	pub domain: DomainConfig,
	#[serde(
		default,
		deserialize_with = "deserialize_chain_id_map",
		serialize_with = "serialize_chain_id_map"
	)]
	pub networks: HashMap<ChainId, NetworkInfo>,
	/// Token registry: chain -> token address -> metadata.
	#[serde(
		default,
		deserialize_with = "deserialize_chain_id_map",
		serialize_with = "serialize_chain_id_map"
	)]
	pub tokens: HashMap<ChainId, HashMap<String, TokenInfo>>,
	pub relay: RelayConfig,
	pub executor: ExecutorConfig,
	#[serde(default)]
	pub wallet: WalletConfig,
	#[serde(default)]
	pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SwapSettings {
	/// Permit spender.
	pub router_address: Address,
	/// Seconds a signed permit stays valid.
	#[serde(default = "default_permit_validity")]
	pub permit_validity_secs: u64,
	/// Slippage tolerance in percent used when a request does not set one.
	#[serde(default = "default_slippage")]
	pub default_slippage: Decimal,
	/// Extra time past the permit deadline to wait for execution.
	#[serde(default = "default_confirmation_grace")]
	pub confirmation_grace_secs: u64,
}

/// EIP-712 signing domain, minus the chain id which follows the source chain.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DomainConfig {
	#[serde(default = "default_domain_name")]
	pub name: String,
	#[serde(default = "default_domain_version")]
	pub version: String,
	#[serde(default = "default_verifying_contract")]
	pub verifying_contract: Address,
}

impl Default for DomainConfig {
	fn default() -> Self {
		Self {
			name: default_domain_name(),
			version: default_domain_version(),
			verifying_contract: default_verifying_contract(),
		}
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
	pub base_url: String,
	#[serde(default)]
	pub api_key: Option<Secret>,
	#[serde(default = "default_request_timeout")]
	pub request_timeout_secs: u64,
	#[serde(default = "default_poll_interval")]
	pub poll_interval_ms: u64,
	/// Upper bound for the intake validation call.
	#[serde(default = "default_verify_timeout")]
	pub verify_timeout_secs: u64,
	/// Upper bound for on-chain relay confirmation.
	#[serde(default = "default_relay_timeout")]
	pub relay_timeout_secs: u64,
	/// Automatic retries of intake validation on network failure.
	#[serde(default = "default_verify_retries")]
	pub verify_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutorConfig {
	pub base_url: String,
	#[serde(default)]
	pub api_key: Option<Secret>,
	#[serde(default = "default_request_timeout")]
	pub request_timeout_secs: u64,
	#[serde(default = "default_poll_interval")]
	pub poll_interval_ms: u64,
}

/// Local signer used by the command line client.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WalletConfig {
	#[serde(default)]
	pub private_key: Option<Secret>,
	/// Chain the wallet starts on. Defaults to the swap source chain.
	#[serde(default)]
	pub chain_id: Option<ChainId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
	#[default]
	Memory,
	File,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
	#[serde(default)]
	pub backend: StorageBackend,
	/// Directory for the file backend.
	#[serde(default)]
	pub path: Option<PathBuf>,
}

impl Config {
	pub fn network(&self, chain_id: ChainId) -> Option<&NetworkInfo> {
		self.networks.get(&chain_id)
	}

	/// `8453 (Base)` style label for a chain.
	pub fn describe_chain(&self, chain_id: ChainId) -> String {
		swap_types::describe_chain(chain_id, self.network(chain_id))
	}

	/// Looks up a registered token by address, ignoring hex case.
	pub fn find_token(&self, chain_id: ChainId, address: &str) -> Option<(Address, &TokenInfo)> {
		let wanted: Address = address.trim().parse().ok()?;
		self.tokens
			.get(&chain_id)?
			.iter()
			.find_map(|(key, info)| match key.parse::<Address>() {
				Ok(parsed) if parsed == wanted => Some((parsed, info)),
				_ => None,
			})
	}

	/// Registered tokens of a chain, sorted by symbol.
	pub fn tokens_on(&self, chain_id: ChainId) -> Vec<(&str, &TokenInfo)> {
		let mut tokens: Vec<_> = self
			.tokens
			.get(&chain_id)
			.map(|tokens| tokens.iter().map(|(k, v)| (k.as_str(), v)).collect())
			.unwrap_or_default();
		tokens.sort_by(|a, b| a.1.symbol.cmp(&b.1.symbol));
		tokens
	}

	/// Signing domain bound to `chain_id`.
	pub fn permit_domain(&self, chain_id: ChainId) -> PermitDomain {
		PermitDomain {
			name: self.domain.name.clone(),
			version: self.domain.version.clone(),
			chain_id,
			verifying_contract: self.domain.verifying_contract,
		}
	}
}

fn default_permit_validity() -> u64 {
	3600
}

fn default_slippage() -> Decimal {
	Decimal::new(5, 1)
}

fn default_confirmation_grace() -> u64 {
	600
}

fn default_domain_name() -> String {
	"GaslessSwap".to_string()
}

fn default_domain_version() -> String {
	"1".to_string()
}

fn default_verifying_contract() -> Address {
	Address::with_last_byte(1)
}

fn default_request_timeout() -> u64 {
	30
}

fn default_poll_interval() -> u64 {
	2000
}

fn default_verify_timeout() -> u64 {
	30
}

fn default_relay_timeout() -> u64 {
	300
}

fn default_verify_retries() -> u32 {
	1
}
