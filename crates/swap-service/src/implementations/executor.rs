use std::sync::Arc;
use std::time::Duration;
use swap_config::ExecutorConfig;
use swap_executor::implementations::http::create_executor;
use swap_executor::ExecutorInterface;

pub fn create(config: &ExecutorConfig) -> Result<Arc<dyn ExecutorInterface>, String> {
	create_executor(
		&config.base_url,
		config.api_key.as_ref().map(|key| key.expose().to_string()),
		Duration::from_secs(config.request_timeout_secs),
	)
	.map(Arc::from)
	.map_err(|e| format!("Failed to create executor client: {}", e))
}
