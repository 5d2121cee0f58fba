use std::sync::Arc;
use swap_account::implementations::local::create_wallet;
use swap_account::WalletInterface;
use swap_config::WalletConfig;
use swap_types::ChainId;

/// Builds the local wallet from `SWAP_PRIVATE_KEY` / `[wallet]`.
///
/// Returns `None` when no key is configured; swaps then stop at `connect`.
pub fn create(
	config: &WalletConfig,
	default_chain: ChainId,
) -> Option<Result<Arc<dyn WalletInterface>, String>> {
	let key = config.private_key.as_ref()?;
	let chain_id = config.chain_id.unwrap_or(default_chain);
	Some(
		create_wallet(key.expose(), chain_id)
			.map(Arc::from)
			.map_err(|e| format!("Failed to create wallet: {}", e)),
	)
}
