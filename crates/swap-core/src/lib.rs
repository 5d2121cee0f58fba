//! Gasless swap orchestration.
//!
//! [`PermitOrchestrator`] drives a single swap intent through the permit
//! pipeline. It is assembled by [`OrchestratorBuilder`] from factories for
//! each external seam: wallet, token reader, relay, executor and storage.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use swap_account::{WalletInterface, WalletService};
use swap_config::{Config, ExecutorConfig, RelayConfig, StorageConfig, WalletConfig};
use swap_executor::{ExecutorInterface, ExecutorService};
use swap_relay::{RelayInterface, RelayService};
use swap_storage::{StorageInterface, StorageService};
use swap_token::{TokenInterface, TokenService};
use swap_types::{now_secs, ChainId, NetworkInfo};
use tokio::sync::{watch, Mutex};
use tracing::warn;

pub mod error;
pub mod event_bus;
pub mod orchestrator;
pub mod session;

#[cfg(test)]
mod tests;

pub use error::OrchestratorError;
pub use event_bus::EventBus;
pub use orchestrator::{Clock, PermitOrchestrator, HISTORY_NAMESPACE};
pub use session::SessionContext;

type FactoryResult<T> = Result<T, String>;
type WalletFactory = Box<dyn Fn(&WalletConfig) -> FactoryResult<Arc<dyn WalletInterface>> + Send>;
type TokenFactory =
	Box<dyn Fn(&HashMap<ChainId, NetworkInfo>) -> FactoryResult<Arc<dyn TokenInterface>> + Send>;
type RelayFactory = Box<dyn Fn(&RelayConfig) -> FactoryResult<Arc<dyn RelayInterface>> + Send>;
type ExecutorFactory =
	Box<dyn Fn(&ExecutorConfig) -> FactoryResult<Arc<dyn ExecutorInterface>> + Send>;
type StorageFactory =
	Box<dyn Fn(&StorageConfig) -> FactoryResult<Box<dyn StorageInterface>> + Send>;

/// Capacity of the progress event channel.
const EVENT_CAPACITY: usize = 256;

// Factory pattern for creating services from config
pub struct OrchestratorBuilder {
	config: Config,
	wallet_factory: Option<WalletFactory>,
	token_factory: Option<TokenFactory>,
	relay_factory: Option<RelayFactory>,
	executor_factory: Option<ExecutorFactory>,
	storage_factory: Option<StorageFactory>,
	clock: Option<Clock>,
}

impl OrchestratorBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			wallet_factory: None,
			token_factory: None,
			relay_factory: None,
			executor_factory: None,
			storage_factory: None,
			clock: None,
		}
	}

	/// Without a wallet factory every swap fails at `connect` with `NoWallet`.
	pub fn with_wallet_factory<F>(mut self, factory: F) -> Self
	where
		F: Fn(&WalletConfig) -> FactoryResult<Arc<dyn WalletInterface>> + Send + 'static,
	{
		self.wallet_factory = Some(Box::new(factory));
		self
	}

	pub fn with_token_factory<F>(mut self, factory: F) -> Self
	where
		F: Fn(&HashMap<ChainId, NetworkInfo>) -> FactoryResult<Arc<dyn TokenInterface>>
			+ Send
			+ 'static,
	{
		self.token_factory = Some(Box::new(factory));
		self
	}

	pub fn with_relay_factory<F>(mut self, factory: F) -> Self
	where
		F: Fn(&RelayConfig) -> FactoryResult<Arc<dyn RelayInterface>> + Send + 'static,
	{
		self.relay_factory = Some(Box::new(factory));
		self
	}

	pub fn with_executor_factory<F>(mut self, factory: F) -> Self
	where
		F: Fn(&ExecutorConfig) -> FactoryResult<Arc<dyn ExecutorInterface>> + Send + 'static,
	{
		self.executor_factory = Some(Box::new(factory));
		self
	}

	pub fn with_storage_factory<F>(mut self, factory: F) -> Self
	where
		F: Fn(&StorageConfig) -> FactoryResult<Box<dyn StorageInterface>> + Send + 'static,
	{
		self.storage_factory = Some(Box::new(factory));
		self
	}

	/// Replaces the wall clock used for permit deadlines.
	pub fn with_clock(mut self, clock: Clock) -> Self {
		self.clock = Some(clock);
		self
	}

	pub fn build(self) -> Result<PermitOrchestrator, OrchestratorError> {
		let wallet = match &self.wallet_factory {
			Some(factory) => Some(WalletService::new(
				factory(&self.config.wallet).map_err(OrchestratorError::Config)?,
			)),
			None => {
				warn!("No wallet configured; swaps will stop at connect");
				None
			}
		};

		let token_reader = self
			.token_factory
			.as_ref()
			.ok_or_else(|| OrchestratorError::Config("Token factory not provided".into()))?(
			&self.config.networks,
		)
		.map_err(OrchestratorError::Config)?;
		let tokens = TokenService::new(token_reader);

		let relay_client = self
			.relay_factory
			.as_ref()
			.ok_or_else(|| OrchestratorError::Config("Relay factory not provided".into()))?(
			&self.config.relay,
		)
		.map_err(OrchestratorError::Config)?;
		let relay = RelayService::new(
			relay_client,
			Duration::from_millis(self.config.relay.poll_interval_ms),
		)
		.with_verify_retries(self.config.relay.verify_retries);

		let executor_client = self
			.executor_factory
			.as_ref()
			.ok_or_else(|| OrchestratorError::Config("Executor factory not provided".into()))?(
			&self.config.executor,
		)
		.map_err(OrchestratorError::Config)?;
		let executor = ExecutorService::new(
			executor_client,
			Duration::from_millis(self.config.executor.poll_interval_ms),
		);

		let storage_backend = self
			.storage_factory
			.as_ref()
			.ok_or_else(|| OrchestratorError::Config("Storage factory not provided".into()))?(
			&self.config.storage,
		)
		.map_err(OrchestratorError::Config)?;
		let storage = Arc::new(StorageService::new(storage_backend));

		let (cancel, _) = watch::channel(false);
		let clock = self.clock.unwrap_or_else(|| Arc::new(now_secs));

		Ok(PermitOrchestrator {
			config: self.config,
			wallet,
			tokens,
			relay,
			executor,
			storage,
			session: Mutex::new(SessionContext::default()),
			in_flight: AtomicBool::new(false),
			cancel,
			event_bus: EventBus::new(EVENT_CAPACITY),
			clock,
		})
	}
}
