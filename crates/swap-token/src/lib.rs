//! Read access to ERC-20 tokens with EIP-2612 permit nonces.

use async_trait::async_trait;
use std::sync::Arc;
use swap_types::{Address, ChainId, PermitSupport, U256};
use thiserror::Error;
use tracing::{debug, warn};

pub mod implementations {
	pub mod alloy;
}

#[derive(Debug, Error)]
pub enum TokenError {
	#[error("No RPC endpoint configured for chain {0}")]
	NoProvider(ChainId),
	#[error("Invalid RPC URL for chain {chain_id}: {reason}")]
	InvalidRpcUrl { chain_id: ChainId, reason: String },
	#[error("Contract call failed: {0}")]
	Call(String),
}

#[async_trait]
pub trait TokenInterface: Send + Sync {
	async fn balance_of(
		&self,
		chain_id: ChainId,
		token: Address,
		owner: Address,
	) -> Result<U256, TokenError>;

	/// Current permit nonce of `owner`. Fails for tokens without permits.
	async fn nonces(
		&self,
		chain_id: ChainId,
		token: Address,
		owner: Address,
	) -> Result<U256, TokenError>;
}

pub struct TokenService {
	reader: Arc<dyn TokenInterface>,
}

impl TokenService {
	pub fn new(reader: Arc<dyn TokenInterface>) -> Self {
		Self { reader }
	}

	pub async fn balance(
		&self,
		chain_id: ChainId,
		token: Address,
		owner: Address,
	) -> Result<U256, TokenError> {
		self.reader.balance_of(chain_id, token, owner).await
	}

	pub async fn nonce(
		&self,
		chain_id: ChainId,
		token: Address,
		owner: Address,
	) -> Result<U256, TokenError> {
		self.reader.nonces(chain_id, token, owner).await
	}

	/// Probes `nonces(owner)`; a failing call means the token lacks permits.
	pub async fn permit_support(
		&self,
		chain_id: ChainId,
		token: Address,
		owner: Address,
	) -> PermitSupport {
		match self.reader.nonces(chain_id, token, owner).await {
			Ok(nonce) => {
				debug!(chain_id = %chain_id, token = %token, nonce = %nonce, "Permit nonce read");
				PermitSupport::Supported { nonce }
			}
			Err(e) => {
				warn!(chain_id = %chain_id, token = %token, error = %e, "Token does not answer nonces()");
				PermitSupport::Unsupported {
					reason: e.to_string(),
				}
			}
		}
	}
}
