//! Token reads over JSON-RPC using alloy contract bindings.

use crate::{TokenError, TokenInterface};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol;
use async_trait::async_trait;
use std::collections::HashMap;
use swap_types::{Address, ChainId, NetworkInfo, U256};
use tracing::debug;

sol! {
	#[sol(rpc)]
	interface IERC20Permit {
		function balanceOf(address account) external view returns (uint256);
		function nonces(address owner) external view returns (uint256);
	}
}

/// Reads balances and permit nonces from every network with an RPC endpoint.
pub struct AlloyTokenReader {
	providers: HashMap<ChainId, DynProvider>,
}

impl AlloyTokenReader {
	pub fn new(networks: &HashMap<ChainId, NetworkInfo>) -> Result<Self, TokenError> {
		let mut providers = HashMap::new();
		for (chain_id, network) in networks {
			let Some(rpc_url) = &network.rpc_url else {
				continue;
			};
			let url = rpc_url.parse().map_err(|e| TokenError::InvalidRpcUrl {
				chain_id: *chain_id,
				reason: format!("{}", e),
			})?;
			let provider = ProviderBuilder::new()
				.disable_recommended_fillers()
				.connect_http(url)
				.erased();
			debug!(chain_id = %chain_id, network = %network.name, "Token reader connected");
			providers.insert(*chain_id, provider);
		}

		Ok(Self { providers })
	}

	fn contract(
		&self,
		chain_id: ChainId,
		token: Address,
	) -> Result<IERC20Permit::IERC20PermitInstance<DynProvider>, TokenError> {
		let provider = self
			.providers
			.get(&chain_id)
			.ok_or(TokenError::NoProvider(chain_id))?;
		Ok(IERC20Permit::new(token, provider.clone()))
	}
}

#[async_trait]
impl TokenInterface for AlloyTokenReader {
	async fn balance_of(
		&self,
		chain_id: ChainId,
		token: Address,
		owner: Address,
	) -> Result<U256, TokenError> {
		self.contract(chain_id, token)?
			.balanceOf(owner)
			.call()
			.await
			.map_err(|e| TokenError::Call(format!("balanceOf: {}", e)))
	}

	async fn nonces(
		&self,
		chain_id: ChainId,
		token: Address,
		owner: Address,
	) -> Result<U256, TokenError> {
		self.contract(chain_id, token)?
			.nonces(owner)
			.call()
			.await
			.map_err(|e| TokenError::Call(format!("nonces: {}", e)))
	}
}
