//! Configuration loading for the swap client.
//!
//! Files are read as TOML (or JSON/YAML by extension), `${VAR}` references
//! are substituted from the environment, prefixed environment variables
//! override credentials and RPC endpoints, and the result is validated.

use regex::Regex;
use rust_decimal::Decimal;
use std::env;
use std::path::{Path, PathBuf};
use swap_types::{Address, ChainId};
use thiserror::Error;
use tracing::debug;

pub mod serde_helpers;
pub mod types;

pub use types::*;

/// Largest decimals value whose `10^decimals` still fits a U256.
const MAX_TOKEN_DECIMALS: u8 = 77;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
	Toml,
	Json,
	Yaml,
}

impl ConfigFormat {
	pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
		match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => Ok(Self::Toml),
			Some("json") => Ok(Self::Json),
			Some("yaml") | Some("yml") => Ok(Self::Yaml),
			_ => Err(ConfigError::ParseError(format!(
				"Unsupported config format: {}",
				path.display()
			))),
		}
	}
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<PathBuf>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "SWAP_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_path_buf());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<Config, ConfigError> {
		let Some(file_path) = &self.file_path else {
			return Err(ConfigError::FileNotFound(
				"No configuration file specified".to_string(),
			));
		};

		if !tokio::fs::try_exists(file_path).await? {
			return Err(ConfigError::FileNotFound(file_path.display().to_string()));
		}

		debug!(path = %file_path.display(), "Loading configuration");
		let format = ConfigFormat::from_path(file_path)?;
		let content = tokio::fs::read_to_string(file_path).await?;

		self.load_str(&content, format)
	}

	/// Parses, overrides and validates configuration text.
	pub fn load_str(&self, content: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
		let substituted = self.substitute_env_vars(content)?;

		let mut config: Config = match format {
			ConfigFormat::Toml => {
				toml::from_str(&substituted).map_err(|e| ConfigError::ParseError(e.to_string()))?
			}
			ConfigFormat::Json => serde_json::from_str(&substituted)
				.map_err(|e| ConfigError::ParseError(e.to_string()))?,
			ConfigFormat::Yaml => serde_yaml::from_str(&substituted)
				.map_err(|e| ConfigError::ParseError(e.to_string()))?,
		};

		self.apply_env_overrides(&mut config)?;
		validate_config(&config)?;

		Ok(config)
	}

	fn substitute_env_vars(&self, content: &str) -> Result<String, ConfigError> {
		let mut result = content.to_string();

		let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::ParseError(e.to_string()))?;

		for cap in re.captures_iter(content) {
			let full_match = &cap[0];
			let var_name = &cap[1];

			let env_value = env::var(var_name)
				.map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

			result = result.replace(full_match, &env_value);
		}

		Ok(result)
	}

	fn apply_env_overrides(&self, config: &mut Config) -> Result<(), ConfigError> {
		if let Ok(key) = env::var(format!("{}PRIVATE_KEY", self.env_prefix)) {
			debug!("Overriding wallet private key from environment");
			config.wallet.private_key = Some(Secret::new(key));
		}

		if let Ok(key) = env::var(format!("{}RELAY_API_KEY", self.env_prefix)) {
			debug!("Overriding relay API key from environment");
			config.relay.api_key = Some(Secret::new(key));
		}

		if let Ok(key) = env::var(format!("{}EXECUTOR_API_KEY", self.env_prefix)) {
			debug!("Overriding executor API key from environment");
			config.executor.api_key = Some(Secret::new(key));
		}

		let rpc_prefix = format!("{}RPC_URL_", self.env_prefix);
		for (name, url) in env::vars() {
			let Some(chain) = name.strip_prefix(&rpc_prefix) else {
				continue;
			};
			let chain_id: ChainId = chain.parse().map_err(|_| {
				ConfigError::ValidationError(format!("Invalid chain ID in {}: {}", name, chain))
			})?;
			if let Some(network) = config.networks.get_mut(&chain_id) {
				debug!(chain_id = %chain_id, "Overriding RPC URL from environment");
				network.rpc_url = Some(url);
			}
		}

		Ok(())
	}
}

/// Checks cross-field constraints the types alone cannot express.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
	if config.swap.router_address == Address::ZERO {
		return Err(ConfigError::ValidationError(
			"swap.router_address must not be the zero address".to_string(),
		));
	}

	if config.swap.permit_validity_secs == 0 {
		return Err(ConfigError::ValidationError(
			"swap.permit_validity_secs must be greater than zero".to_string(),
		));
	}

	validate_slippage(config.swap.default_slippage)?;

	for (chain_id, tokens) in &config.tokens {
		if !config.networks.contains_key(chain_id) {
			return Err(ConfigError::ValidationError(format!(
				"Tokens configured for chain {} but no network entry exists",
				chain_id
			)));
		}
		for (address, token) in tokens {
			address.parse::<Address>().map_err(|_| {
				ConfigError::ValidationError(format!(
					"Invalid token address on chain {}: {}",
					chain_id, address
				))
			})?;
			if token.decimals > MAX_TOKEN_DECIMALS {
				return Err(ConfigError::ValidationError(format!(
					"Token {} on chain {} has {} decimals (max {})",
					token.symbol, chain_id, token.decimals, MAX_TOKEN_DECIMALS
				)));
			}
		}
	}

	validate_url("relay.base_url", &config.relay.base_url)?;
	validate_url("executor.base_url", &config.executor.base_url)?;

	if config.storage.backend == StorageBackend::File && config.storage.path.is_none() {
		return Err(ConfigError::ValidationError(
			"storage.path is required for the file backend".to_string(),
		));
	}

	Ok(())
}

/// Slippage tolerance must be a percentage.
pub fn validate_slippage(slippage: Decimal) -> Result<(), ConfigError> {
	if slippage < Decimal::ZERO || slippage > Decimal::ONE_HUNDRED {
		return Err(ConfigError::ValidationError(format!(
			"Slippage must be between 0 and 100, got {}",
			slippage
		)));
	}
	Ok(())
}

fn validate_url(field: &str, url: &str) -> Result<(), ConfigError> {
	if url.starts_with("http://") || url.starts_with("https://") {
		Ok(())
	} else {
		Err(ConfigError::ValidationError(format!(
			"{} must be an http(s) URL, got {}",
			field, url
		)))
	}
}
