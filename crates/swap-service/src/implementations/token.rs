use std::collections::HashMap;
use std::sync::Arc;
use swap_token::implementations::alloy::AlloyTokenReader;
use swap_token::TokenInterface;
use swap_types::{ChainId, NetworkInfo};

pub fn create(networks: &HashMap<ChainId, NetworkInfo>) -> Result<Arc<dyn TokenInterface>, String> {
	let reader = AlloyTokenReader::new(networks)
		.map_err(|e| format!("Failed to create token reader: {}", e))?;
	Ok(Arc::new(reader))
}
