use std::sync::Arc;
use std::time::Duration;
use swap_config::RelayConfig;
use swap_relay::implementations::http::create_relay;
use swap_relay::RelayInterface;

pub fn create(config: &RelayConfig) -> Result<Arc<dyn RelayInterface>, String> {
	create_relay(
		&config.base_url,
		config.api_key.as_ref().map(|key| key.expose().to_string()),
		Duration::from_secs(config.request_timeout_secs),
	)
	.map(Arc::from)
	.map_err(|e| format!("Failed to create relay client: {}", e))
}
