//! Command handlers and their terminal output.

use crate::cli::SwapArgs;
use crate::implementations;
use anyhow::{anyhow, bail, Context, Result};
use std::future::Future;
use std::path::Path;
use swap_account::implementations::local::LocalWallet;
use swap_config::{Config, ConfigLoader, StorageBackend};
use swap_core::{OrchestratorBuilder, OrchestratorError, PermitOrchestrator, HISTORY_NAMESPACE};
use swap_storage::StorageService;
use swap_token::TokenService;
use swap_types::{
	format_amount, Address, ChainId, IntentStatus, PermitSupport, StepState, SwapEvent, SwapIntent,
	SwapRequest,
};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

pub async fn load_config(path: &Path) -> Result<Config> {
	info!("Loading configuration from: {:?}", path);
	ConfigLoader::new()
		.with_file(path)
		.load()
		.await
		.context("Failed to load configuration")
}

/// Drives one swap, cancelling it on Ctrl+C.
pub async fn swap(config: Config, args: SwapArgs) -> Result<()> {
	let orchestrator = build_orchestrator(&config, args.from_chain)?;
	let request = SwapRequest {
		source_chain: args.from_chain,
		source_token: args.token,
		dest_chain: args.to_chain,
		dest_token: args.dest_token,
		amount: args.amount,
		recipient: args.recipient,
		slippage: args.slippage,
	};

	let intent = run_to_end(&orchestrator, orchestrator.start(request))
		.await
		.context("Swap could not start")?;
	report(&intent)
}

/// Picks an archived swap back up, reusing its relay task when it has one.
pub async fn resume(config: Config, id: Uuid) -> Result<()> {
	let archived = load_history(&config, id).await?;
	let orchestrator = build_orchestrator(&config, archived.source_chain)?;

	let run = async {
		let restored = orchestrator.restore(id).await?;
		println!("Resuming swap {}: {}", id, describe_status(&restored.status));
		orchestrator.resume().await
	};
	let intent = run_to_end(&orchestrator, run)
		.await
		.context("Swap could not be resumed")?;
	report(&intent)
}

fn build_orchestrator(config: &Config, source_chain: ChainId) -> Result<PermitOrchestrator> {
	let mut builder = OrchestratorBuilder::new(config.clone())
		.with_token_factory(implementations::token::create)
		.with_relay_factory(implementations::relay::create)
		.with_executor_factory(implementations::executor::create)
		.with_storage_factory(implementations::storage::create);
	if let Some(wallet) = implementations::account::create(&config.wallet, source_chain) {
		let wallet = wallet.map_err(|e| anyhow!(e))?;
		builder = builder.with_wallet_factory(move |_| Ok(wallet.clone()));
	}
	builder.build().context("Failed to build orchestrator")
}

/// Prints pipeline progress while `run` is driven, cancelling on Ctrl+C.
async fn run_to_end<F>(orchestrator: &PermitOrchestrator, run: F) -> Result<SwapIntent, OrchestratorError>
where
	F: Future<Output = Result<SwapIntent, OrchestratorError>>,
{
	let mut events = orchestrator.subscribe();
	tokio::pin!(run);
	let result = loop {
		tokio::select! {
			result = &mut run => break result,
			event = events.recv() => {
				if let Ok(event) = event {
					print_event(&event);
				}
			}
			_ = tokio::signal::ctrl_c() => {
				warn!("Interrupt received, cancelling swap");
				orchestrator.cancel();
			}
		}
	};
	for line in drain_events(&mut events) {
		println!("{}", line);
	}
	result
}

fn print_event(event: &SwapEvent) {
	if let Some(line) = describe_event(event) {
		println!("{}", line);
	}
}

/// Lines for events published but not yet printed.
fn drain_events(events: &mut broadcast::Receiver<SwapEvent>) -> Vec<String> {
	let mut lines = Vec::new();
	loop {
		match events.try_recv() {
			Ok(event) => lines.extend(describe_event(&event)),
			Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
			Err(_) => break,
		}
	}
	lines
}

fn report(intent: &SwapIntent) -> Result<()> {
	println!("Swap {}: {}", intent.id, describe_status(&intent.status));
	match intent.status {
		IntentStatus::Completed { .. } => Ok(()),
		_ => bail!("swap {} did not complete", intent.id),
	}
}

/// Prints balance and permit nonce of an account for a registered token.
pub async fn inspect(
	config: &Config,
	chain_id: ChainId,
	token: &str,
	account: Option<String>,
) -> Result<()> {
	let (token_address, token_info) = config
		.find_token(chain_id, token)
		.ok_or_else(|| anyhow!("Token {} is not registered on chain {}", token, chain_id))?;

	let account: Address = match account {
		Some(account) => account.parse().context("Invalid account address")?,
		None => {
			let key = config
				.wallet
				.private_key
				.as_ref()
				.ok_or_else(|| anyhow!("No account given and no wallet configured"))?;
			LocalWallet::new(key.expose(), chain_id)
				.context("Failed to load wallet")?
				.address()
		}
	};

	let tokens = TokenService::new(
		implementations::token::create(&config.networks).map_err(|e| anyhow!(e))?,
	);
	let balance = tokens
		.balance(chain_id, token_address, account)
		.await
		.context("Failed to read token balance")?;
	let support = tokens.permit_support(chain_id, token_address, account).await;

	println!("Account: {}", account);
	println!("Network: {}", config.describe_chain(chain_id));
	println!("Token:   {}", token_info.label());
	println!(
		"Balance: {} {}",
		format_amount(balance, token_info.decimals, 4),
		token_info.symbol
	);
	println!("Nonce:   {}", describe_nonce(&support));
	Ok(())
}

pub fn tokens(config: &Config, chain_id: Option<ChainId>) {
	for line in token_listing(config, chain_id) {
		println!("{}", line);
	}
}

pub fn validate(config: &Config) {
	info!("Configuration is valid");
	for line in config_summary(config) {
		info!("  {}", line);
	}
}

pub async fn history(config: &Config, id: Option<Uuid>) -> Result<()> {
	let Some(id) = id else {
		let ids = list_history(config).await?;
		if ids.is_empty() {
			println!("No archived swaps");
		}
		for id in ids {
			println!("{}", id);
		}
		return Ok(());
	};

	let intent = load_history(config, id).await?;
	println!("{}", serde_json::to_string_pretty(&intent)?);
	Ok(())
}

fn history_storage(config: &Config) -> Result<StorageService> {
	if config.storage.backend == StorageBackend::Memory {
		warn!("Memory storage does not outlive a swap; configure storage.backend = \"file\"");
	}
	Ok(StorageService::new(
		implementations::storage::create(&config.storage).map_err(|e| anyhow!(e))?,
	))
}

async fn load_history(config: &Config, id: Uuid) -> Result<SwapIntent> {
	history_storage(config)?
		.retrieve(HISTORY_NAMESPACE, &id.to_string())
		.await
		.with_context(|| format!("Swap {} not found in history", id))
}

async fn list_history(config: &Config) -> Result<Vec<String>> {
	history_storage(config)?
		.list(HISTORY_NAMESPACE)
		.await
		.context("Failed to list swap history")
}

fn token_listing(config: &Config, chain_id: Option<ChainId>) -> Vec<String> {
	let mut chains: Vec<ChainId> = match chain_id {
		Some(chain_id) => vec![chain_id],
		None => config
			.networks
			.keys()
			.chain(config.tokens.keys())
			.copied()
			.collect(),
	};
	chains.sort();
	chains.dedup();

	let mut lines = Vec::new();
	for chain_id in chains {
		lines.push(format!("{}:", config.describe_chain(chain_id)));
		let tokens = config.tokens_on(chain_id);
		if tokens.is_empty() {
			lines.push("  no tokens configured".to_string());
		}
		for (address, token) in tokens {
			lines.push(format!("  {} ({})", token.label(), address));
		}
	}
	lines
}

fn config_summary(config: &Config) -> Vec<String> {
	let mut networks: Vec<_> = config.networks.keys().copied().collect();
	networks.sort();
	let networks: Vec<String> = networks
		.into_iter()
		.map(|chain_id| config.describe_chain(chain_id))
		.collect();
	let token_count: usize = config.tokens.values().map(|tokens| tokens.len()).sum();
	let storage = match (&config.storage.backend, &config.storage.path) {
		(StorageBackend::File, Some(path)) => format!("file ({})", path.display()),
		(StorageBackend::File, None) => "file".to_string(),
		(StorageBackend::Memory, _) => "memory".to_string(),
	};

	vec![
		format!("Router: {}", config.swap.router_address),
		format!("Networks: {}", networks.join(", ")),
		format!(
			"Tokens: {} on {} chain(s)",
			token_count,
			config.tokens.len()
		),
		format!("Relay: {}", config.relay.base_url),
		format!("Executor: {}", config.executor.base_url),
		format!(
			"Wallet: {}",
			if config.wallet.private_key.is_some() {
				"configured"
			} else {
				"not configured"
			}
		),
		format!("Storage: {}", storage),
	]
}

fn describe_nonce(support: &PermitSupport) -> String {
	match support {
		PermitSupport::Supported { nonce } => nonce.to_string(),
		_ => "N/A (token may not support permits)".to_string(),
	}
}

fn describe_status(status: &IntentStatus) -> String {
	match status {
		IntentStatus::Created => "created".to_string(),
		IntentStatus::InFlight { step } => format!("running {}", step),
		IntentStatus::Completed {
			destination_tx: Some(tx),
		} => format!("completed (destination tx {})", tx),
		IntentStatus::Completed { destination_tx: None } => "completed".to_string(),
		IntentStatus::Failed { failure } => format!("failed: {}", failure),
		IntentStatus::Inconsistent { task_id, failure } => format!(
			"relay task {} executed but the swap did not resolve ({}); check the executor, then run `resume` instead of starting a new swap",
			task_id, failure
		),
		IntentStatus::Blocked { reason } => format!("blocked: {}", reason),
		IntentStatus::Cancelled { step, reason } => format!("cancelled at {}: {}", step, reason),
	}
}

fn describe_event(event: &SwapEvent) -> Option<String> {
	match event {
		SwapEvent::StepChanged { step, state, .. } => {
			let state = match state {
				StepState::Pending => "pending".to_string(),
				StepState::Active => "started".to_string(),
				StepState::Succeeded => "done".to_string(),
				StepState::Failed(kind) => format!("failed ({})", kind),
			};
			Some(format!("[{}/5] {} {}", step.index() + 1, step, state))
		}
		SwapEvent::StatusChanged { .. } => None,
		SwapEvent::SessionReset { reason } => Some(format!("Session reset: {}", reason)),
	}
}
