//! The permit pipeline: connect, sign, verify, relay, execute.
//!
//! One [`SwapIntent`] is driven at a time. Each step runs to `succeeded` before
//! the next one becomes active; the first failure halts the run and is
//! recorded on the intent. Until the relay has accepted the permit, a run can
//! be cancelled by the user or by a wallet account/chain change. After that
//! only confirmation or a timeout ends it.

use crate::error::OrchestratorError;
use crate::event_bus::EventBus;
use crate::session::SessionContext;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use swap_account::{WalletError, WalletService};
use swap_config::{validate_slippage, Config};
use swap_executor::{ExecutorError, ExecutorService};
use swap_relay::{RelayError, RelayService};
use swap_storage::{StorageError, StorageService};
use swap_token::TokenService;
use swap_types::{
	parse_amount, truncate_hex, Address, ChainId, ErrorKind, ExecutionReport, ExecutionRequest,
	ExecutionStatus, IntentStatus, PermitMessage, PermitSupport, RelayStatus, SignedPermit, Step,
	StepFailure, SwapEvent, SwapIntent, SwapRequest, Timestamp, TypedDataRequest, WalletEvent, U256,
};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Storage namespace for archived intents.
pub const HISTORY_NAMESPACE: &str = "history";

/// How often a stale nonce may send a run back to `sign` before it fails.
const MAX_REWINDS: u32 = 1;

/// Source of Unix time in seconds.
pub type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

/// Why a step did not succeed.
enum StepHalt {
	Failed(StepFailure),
	/// Discard progress and continue from an earlier step.
	Rewind { to: Step, reason: String },
	/// Cancelled by the user; the intent stays resumable.
	Cancelled(String),
	/// A wallet notification invalidated the session.
	Reset(String),
}

fn halt(step: Step, kind: ErrorKind, message: impl Into<String>) -> StepHalt {
	StepHalt::Failed(StepFailure::new(step, kind, message))
}

fn wallet_halt(step: Step, err: WalletError) -> StepHalt {
	let kind = match &err {
		WalletError::NoWallet | WalletError::InvalidKey(_) => ErrorKind::NoWallet,
		WalletError::UserRejected(_) => ErrorKind::UserRejected,
		WalletError::SwitchFailed(_) => ErrorKind::ChainMismatch,
		WalletError::SigningFailed(_) | WalletError::UnknownAccount(_) => {
			ErrorKind::SignatureRejected
		}
		WalletError::Provider(_) => match step {
			Step::Connect => ErrorKind::NoWallet,
			_ => ErrorKind::SignatureRejected,
		},
	};
	halt(step, kind, err.to_string())
}

/// Clears the in-flight flag when a run ends, however it ends.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::SeqCst);
	}
}

pub struct PermitOrchestrator {
	pub(crate) config: Config,
	pub(crate) wallet: Option<WalletService>,
	pub(crate) tokens: TokenService,
	pub(crate) relay: RelayService,
	pub(crate) executor: ExecutorService,
	pub(crate) storage: Arc<StorageService>,
	pub(crate) session: Mutex<SessionContext>,
	pub(crate) in_flight: AtomicBool,
	pub(crate) cancel: watch::Sender<bool>,
	pub(crate) event_bus: EventBus,
	pub(crate) clock: Clock,
}

impl PermitOrchestrator {
	/// Starts a new swap and drives it until it completes or halts.
	///
	/// Step failures are not errors: the returned intent carries them in its
	/// status. Errors mean the run could not start at all.
	pub async fn start(&self, request: SwapRequest) -> Result<SwapIntent, OrchestratorError> {
		let _guard = self.acquire()?;

		let (source_token, token) = self
			.config
			.find_token(request.source_chain, &request.source_token)
			.map(|(address, token)| (address, token.clone()))
			.ok_or_else(|| OrchestratorError::UnknownToken {
				chain_id: request.source_chain,
				token: request.source_token.clone(),
			})?;
		if let Some(slippage) = request.slippage {
			validate_slippage(slippage)
				.map_err(|e| OrchestratorError::InvalidRequest(e.to_string()))?;
		}
		if request.dest_token.trim().is_empty() {
			return Err(OrchestratorError::InvalidRequest(
				"destination token is required".to_string(),
			));
		}

		let intent = SwapIntent::new(
			&request,
			source_token,
			token,
			self.config.swap.default_slippage,
			self.now(),
		);

		info!(
			intent_id = %intent.id,
			source = %self.config.describe_chain(intent.source_chain),
			destination = %self.config.describe_chain(intent.dest_chain),
			amount = %intent.amount,
			token = %intent.token.symbol,
			"Starting gasless swap"
		);

		self.session.lock().await.begin(intent.clone());
		self.drive(intent, Step::Connect).await
	}

	/// Continues the session's intent from where it stopped.
	///
	/// A failed `verify` restarts at `sign` so a fresh nonce is fetched;
	/// `relay` and `execute` reuse the last known task.
	pub async fn resume(&self) -> Result<SwapIntent, OrchestratorError> {
		let _guard = self.acquire()?;

		let mut intent = self
			.session
			.lock()
			.await
			.intent
			.clone()
			.ok_or(OrchestratorError::NothingToResume)?;
		let from = resume_point(&intent)?;
		intent.steps.rewind(from);
		if from == Step::Sign {
			intent.discard_signature();
		}

		info!(intent_id = %intent.id, step = %from, "Resuming swap");
		self.drive(intent, from).await
	}

	/// Loads an archived intent into the session so [`resume`](Self::resume)
	/// can finish it, typically in a later process.
	///
	/// The wallet session of the original run is gone, so an intent that
	/// would resume at `sign` or earlier starts over at `connect`. Intents
	/// past `sign` keep their signature and relay task.
	pub async fn restore(&self, id: Uuid) -> Result<SwapIntent, OrchestratorError> {
		let _guard = self.acquire()?;

		let mut intent = self.history(id).await?;
		if resume_point(&intent)? <= Step::Sign {
			intent.steps.rewind(Step::Connect);
			intent.discard_signature();
		}
		intent.updated_at = self.now();

		info!(
			intent_id = %intent.id,
			task_id = ?intent.task_id,
			status = ?intent.status,
			"Restored swap from history"
		);
		self.session.lock().await.begin(intent.clone());
		Ok(intent)
	}

	/// Requests cancellation of the running swap. Ignored once the relay
	/// has accepted the permit.
	pub fn cancel(&self) {
		self.cancel.send_replace(true);
	}

	/// Clears the session unless a swap is in flight.
	pub async fn reset(&self, reason: &str) -> Result<(), OrchestratorError> {
		let _guard = self.acquire()?;
		self.session.lock().await.reset();
		self.event_bus
			.publish(SwapEvent::SessionReset {
				reason: reason.to_string(),
			})
			.ok();
		Ok(())
	}

	pub fn is_busy(&self) -> bool {
		self.in_flight.load(Ordering::SeqCst)
	}

	/// Snapshot of the active intent.
	pub async fn intent(&self) -> Option<SwapIntent> {
		self.session.lock().await.intent.clone()
	}

	pub async fn permit_support(&self) -> PermitSupport {
		self.session.lock().await.permit_support.clone()
	}

	pub fn subscribe(&self) -> broadcast::Receiver<SwapEvent> {
		self.event_bus.subscribe()
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Loads an archived intent.
	pub async fn history(&self, id: Uuid) -> Result<SwapIntent, OrchestratorError> {
		match self
			.storage
			.retrieve(HISTORY_NAMESPACE, &id.to_string())
			.await
		{
			Ok(intent) => Ok(intent),
			Err(StorageError::NotFound) => Err(OrchestratorError::HistoryNotFound(id)),
			Err(e) => Err(e.into()),
		}
	}

	/// The signed permit, provided it covers exactly the tuple recorded on
	/// the intent.
	fn signed_permit(
		&self,
		intent: &SwapIntent,
		step: Step,
		kind: ErrorKind,
	) -> Result<SignedPermit, StepHalt> {
		let permit = intent
			.signed_permit
			.clone()
			.ok_or_else(|| halt(step, kind, "no signed permit"))?;
		let expected = match (intent.owner, intent.raw_amount, intent.nonce, intent.deadline) {
			(Some(owner), Some(value), Some(nonce), Some(deadline)) => PermitMessage {
				owner,
				spender: self.config.swap.router_address,
				value,
				nonce,
				deadline,
			},
			_ => {
				return Err(halt(step, kind, "permit details missing from the swap"))
			}
		};
		if !permit.covers(&expected) {
			return Err(halt(step, kind, "signature does not cover the swap's permit"));
		}
		Ok(permit)
	}

	fn acquire(&self) -> Result<FlightGuard<'_>, OrchestratorError> {
		if self.in_flight.swap(true, Ordering::SeqCst) {
			return Err(OrchestratorError::Busy);
		}
		Ok(FlightGuard(&self.in_flight))
	}

	fn now(&self) -> Timestamp {
		(self.clock)()
	}

	fn until(&self, deadline: Timestamp) -> Duration {
		Duration::from_secs(deadline.saturating_sub(self.now()))
	}

	async fn drive(&self, mut intent: SwapIntent, from: Step) -> Result<SwapIntent, OrchestratorError> {
		self.cancel.send_replace(false);
		let mut cancel_rx = self.cancel.subscribe();
		let mut wallet_events = self.wallet.as_ref().map(WalletService::subscribe);
		let mut rewinds = 0;
		let mut reset_reason = None;
		let mut next = Some(from);

		while let Some(step) = next {
			let mut fresh_nonce = None;
			if step == Step::Sign {
				match self.probe_permit_support(&intent).await {
					Ok(nonce) => fresh_nonce = Some(nonce),
					Err(reason) => {
						warn!(intent_id = %intent.id, reason = %reason, "Swap blocked before signing");
						intent.status = IntentStatus::Blocked { reason };
						break;
					}
				}
			}

			intent.steps.activate(step)?;
			intent.status = IntentStatus::InFlight { step };
			intent.updated_at = self.now();
			self.publish_step(&intent, step);
			self.publish_status(&intent);
			self.save(&intent).await;
			info!(intent_id = %intent.id, step = %step, "Step started");

			let result = if step <= Step::Verify {
				let owner = intent.owner;
				let source_chain = intent.source_chain;
				tokio::select! {
					result = self.run_step(step, &mut intent, fresh_nonce) => result,
					interruption = wait_for_interruption(&mut cancel_rx, &mut wallet_events, owner, source_chain) => Err(interruption),
				}
			} else {
				self.run_step(step, &mut intent, fresh_nonce).await
			};

			match result {
				Ok(()) => {
					intent.steps.succeed(step)?;
					info!(intent_id = %intent.id, step = %step, "Step succeeded");
					self.publish_step(&intent, step);
					next = step.next();
				}
				Err(StepHalt::Rewind { to, reason }) if rewinds < MAX_REWINDS => {
					rewinds += 1;
					warn!(intent_id = %intent.id, step = %step, to = %to, reason = %reason, "Restarting from earlier step");
					intent.steps.deactivate(step);
					intent.steps.rewind(to);
					self.publish_step(&intent, step);
					next = Some(to);
				}
				Err(StepHalt::Rewind { reason, .. }) => {
					let failure = StepFailure::new(step, ErrorKind::NonceStale, reason);
					self.record_failure(&mut intent, failure)?;
					break;
				}
				Err(StepHalt::Failed(failure)) => {
					self.record_failure(&mut intent, failure)?;
					break;
				}
				Err(StepHalt::Cancelled(reason)) => {
					info!(intent_id = %intent.id, step = %step, reason = %reason, "Swap cancelled");
					intent.steps.deactivate(step);
					self.publish_step(&intent, step);
					intent.status = IntentStatus::Cancelled { step, reason };
					break;
				}
				Err(StepHalt::Reset(reason)) => {
					warn!(intent_id = %intent.id, step = %step, reason = %reason, "Wallet changed, resetting session");
					intent.steps.deactivate(step);
					self.publish_step(&intent, step);
					intent.status = IntentStatus::Cancelled {
						step,
						reason: reason.clone(),
					};
					reset_reason = Some(reason);
					break;
				}
			}
		}

		if intent.steps.is_complete() {
			info!(
				intent_id = %intent.id,
				destination_tx = ?intent.destination_tx,
				"Swap completed"
			);
			intent.status = IntentStatus::Completed {
				destination_tx: intent.destination_tx.clone(),
			};
		}

		// Notifications that arrived after the relay accepted the permit
		// take effect once the run is over.
		if reset_reason.is_none() {
			reset_reason = drain_wallet_events(&mut wallet_events, intent.owner, intent.source_chain);
		}

		intent.updated_at = self.now();
		self.publish_status(&intent);
		if intent.status.is_terminal() {
			self.archive(&intent).await;
		}

		let mut session = self.session.lock().await;
		match reset_reason {
			Some(reason) => {
				session.reset();
				self.event_bus
					.publish(SwapEvent::SessionReset { reason })
					.ok();
			}
			None => session.intent = Some(intent.clone()),
		}

		Ok(intent)
	}

	fn record_failure(
		&self,
		intent: &mut SwapIntent,
		failure: StepFailure,
	) -> Result<(), OrchestratorError> {
		let step = failure.step;
		intent.steps.fail(step, failure.kind)?;
		self.publish_step(intent, step);

		intent.status = if step == Step::Execute {
			let task_id = intent
				.task_id
				.as_ref()
				.map(|task| task.to_string())
				.unwrap_or_default();
			error!(
				intent_id = %intent.id,
				task_id = %task_id,
				error = %failure,
				"Permit relayed but execution did not resolve; funds may be in transit"
			);
			IntentStatus::Inconsistent { task_id, failure }
		} else {
			warn!(intent_id = %intent.id, error = %failure, "Swap failed");
			IntentStatus::Failed { failure }
		};
		Ok(())
	}

	async fn run_step(
		&self,
		step: Step,
		intent: &mut SwapIntent,
		fresh_nonce: Option<U256>,
	) -> Result<(), StepHalt> {
		match step {
			Step::Connect => self.connect(intent).await,
			Step::Sign => self.sign(intent, fresh_nonce).await,
			Step::Verify => self.verify(intent).await,
			Step::Relay => self.relay(intent).await,
			Step::Execute => self.execute(intent).await,
		}
	}

	/// Reads the permit nonce right before signing. A failing read means the
	/// token has no permits, which blocks the swap without failing it.
	async fn probe_permit_support(&self, intent: &SwapIntent) -> Result<U256, String> {
		let Some(owner) = intent.owner else {
			return Err("no connected account".to_string());
		};
		let support = self
			.tokens
			.permit_support(intent.source_chain, intent.source_token, owner)
			.await;
		self.session.lock().await.permit_support = support.clone();

		match support {
			PermitSupport::Supported { nonce } => Ok(nonce),
			PermitSupport::Unsupported { reason } => Err(format!(
				"{} does not support permits: {}",
				intent.token.symbol, reason
			)),
			PermitSupport::Unknown => Err("permit support unknown".to_string()),
		}
	}

	async fn connect(&self, intent: &mut SwapIntent) -> Result<(), StepHalt> {
		let wallet = self.wallet.as_ref().ok_or_else(|| {
			halt(
				Step::Connect,
				ErrorKind::NoWallet,
				"no wallet signer is available",
			)
		})?;

		let owner = wallet
			.connect()
			.await
			.map_err(|e| wallet_halt(Step::Connect, e))?;
		let chain_id = wallet
			.chain_id()
			.await
			.map_err(|e| wallet_halt(Step::Connect, e))?;
		intent.owner = Some(owner);
		info!(
			intent_id = %intent.id,
			account = %owner,
			chain = %self.config.describe_chain(chain_id),
			"Wallet connected"
		);

		match self
			.tokens
			.balance(intent.source_chain, intent.source_token, owner)
			.await
		{
			Ok(balance) => {
				intent.balance = Some(balance);
				if let Ok(raw) = parse_amount(&intent.amount, intent.token.decimals) {
					if balance < raw {
						warn!(
							intent_id = %intent.id,
							balance = %balance,
							required = %raw,
							"Balance is below the requested amount"
						);
					}
				}
			}
			Err(e) => warn!(intent_id = %intent.id, error = %e, "Could not read token balance"),
		}

		Ok(())
	}

	async fn sign(&self, intent: &mut SwapIntent, fresh_nonce: Option<U256>) -> Result<(), StepHalt> {
		let wallet = self.wallet.as_ref().ok_or_else(|| {
			halt(Step::Sign, ErrorKind::NoWallet, "no wallet signer is available")
		})?;
		let owner = intent.owner.ok_or_else(|| {
			halt(Step::Sign, ErrorKind::NoWallet, "no connected account")
		})?;

		let raw_amount = parse_amount(&intent.amount, intent.token.decimals)
			.map_err(|e| halt(Step::Sign, ErrorKind::InvalidAmount, e.to_string()))?;

		self.ensure_chain(wallet, intent.source_chain).await?;

		intent.discard_signature();
		let nonce = match fresh_nonce {
			Some(nonce) => nonce,
			None => self.read_nonce(intent, owner).await?,
		};

		let deadline = self.now() + self.config.swap.permit_validity_secs;
		let message = PermitMessage {
			owner,
			spender: self.config.swap.router_address,
			value: raw_amount,
			nonce,
			deadline,
		};
		let domain = self.config.permit_domain(intent.source_chain);
		let request = TypedDataRequest::new(domain.clone(), message.clone());
		intent.raw_amount = Some(raw_amount);
		intent.nonce = Some(nonce);
		intent.deadline = Some(deadline);
		debug!(
			intent_id = %intent.id,
			value = %raw_amount,
			nonce = %nonce,
			deadline,
			"Requesting permit signature"
		);

		let signature = wallet
			.sign_permit(&request, owner)
			.await
			.map_err(|e| wallet_halt(Step::Sign, e))?;
		let signed = SignedPermit::new(message, domain, signature);
		signed
			.verify_owner()
			.map_err(|e| halt(Step::Sign, ErrorKind::SignatureRejected, e.to_string()))?;

		let current = self.read_nonce(intent, owner).await?;
		if current != nonce {
			intent.discard_signature();
			return Err(halt(
				Step::Sign,
				ErrorKind::NonceStale,
				format!("nonce moved from {} to {} while signing", nonce, current),
			));
		}

		info!(
			intent_id = %intent.id,
			signature = %truncate_hex(&signed.signature),
			"Permit signed"
		);
		intent.signed_permit = Some(signed);
		intent.signed_at = Some(self.now());
		Ok(())
	}

	async fn read_nonce(&self, intent: &SwapIntent, owner: Address) -> Result<U256, StepHalt> {
		self.tokens
			.nonce(intent.source_chain, intent.source_token, owner)
			.await
			.map_err(|e| {
				halt(
					Step::Sign,
					ErrorKind::NonceStale,
					format!("could not read permit nonce: {}", e),
				)
			})
	}

	/// Switches the wallet to `chain_id` if it is elsewhere.
	async fn ensure_chain(&self, wallet: &WalletService, chain_id: ChainId) -> Result<(), StepHalt> {
		let current = wallet
			.chain_id()
			.await
			.map_err(|e| wallet_halt(Step::Sign, e))?;
		if current == chain_id {
			return Ok(());
		}

		info!(
			from = %self.config.describe_chain(current),
			to = %self.config.describe_chain(chain_id),
			"Wallet is on another chain, requesting switch"
		);
		wallet
			.switch_chain(chain_id)
			.await
			.map_err(|e| halt(Step::Sign, ErrorKind::ChainMismatch, e.to_string()))?;

		let after = wallet
			.chain_id()
			.await
			.map_err(|e| wallet_halt(Step::Sign, e))?;
		if after != chain_id {
			return Err(halt(
				Step::Sign,
				ErrorKind::ChainMismatch,
				format!(
					"wallet is on {} after switching to {}",
					self.config.describe_chain(after),
					self.config.describe_chain(chain_id)
				),
			));
		}
		Ok(())
	}

	async fn verify(&self, intent: &mut SwapIntent) -> Result<(), StepHalt> {
		let permit = match self.signed_permit(intent, Step::Verify, ErrorKind::VerificationRejected) {
			Ok(permit) => permit,
			Err(halted) => {
				intent.discard_signature();
				return Err(halted);
			}
		};
		let deadline = permit.permit_message.deadline;
		if permit.permit_message.is_expired(self.now()) {
			return Err(halt(
				Step::Verify,
				ErrorKind::VerificationRejected,
				format!("permit deadline {} has passed", deadline),
			));
		}

		match self
			.tokens
			.nonce(intent.source_chain, intent.source_token, permit.permit_message.owner)
			.await
		{
			Ok(current) if current != permit.permit_message.nonce => {
				intent.discard_signature();
				return Err(StepHalt::Rewind {
					to: Step::Sign,
					reason: format!(
						"nonce moved from {} to {} before verification",
						permit.permit_message.nonce, current
					),
				});
			}
			Ok(_) => {}
			Err(e) => {
				warn!(intent_id = %intent.id, error = %e, "Could not re-check nonce, relying on relay validation")
			}
		}

		let budget = self
			.until(deadline)
			.min(Duration::from_secs(self.config.relay.verify_timeout_secs));
		match timeout(budget, self.relay.verify(&permit)).await {
			Err(_) => Err(halt(
				Step::Verify,
				ErrorKind::Timeout,
				format!("relay did not validate the permit within {}s", budget.as_secs()),
			)),
			Ok(Err(RelayError::Rejected(reason))) => {
				Err(halt(Step::Verify, ErrorKind::VerificationRejected, reason))
			}
			Ok(Err(e)) => Err(halt(
				Step::Verify,
				ErrorKind::VerificationRejected,
				format!("relay intake unavailable: {}", e),
			)),
			Ok(Ok(())) => {
				info!(intent_id = %intent.id, "Permit accepted by relay intake");
				Ok(())
			}
		}
	}

	async fn relay(&self, intent: &mut SwapIntent) -> Result<(), StepHalt> {
		let permit = match self.signed_permit(intent, Step::Relay, ErrorKind::RelaySubmissionFailed) {
			Ok(permit) => permit,
			// A permit already handed to the relay is never replaced.
			Err(halted) if intent.task_id.is_some() => return Err(halted),
			Err(halted) => {
				intent.discard_signature();
				return Err(halted);
			}
		};
		let deadline = permit.permit_message.deadline;

		let task_id = match intent.task_id.clone() {
			Some(task_id) => {
				info!(intent_id = %intent.id, task_id = %task_id, "Reusing relay task");
				task_id
			}
			None => {
				let budget = self
					.until(deadline)
					.min(Duration::from_secs(self.config.relay.relay_timeout_secs));
				let task_id = match timeout(budget, self.relay.submit(&permit)).await {
					Err(_) => {
						return Err(halt(
							Step::Relay,
							ErrorKind::Timeout,
							"relay did not answer the submission in time",
						))
					}
					Ok(Err(e)) => {
						return Err(halt(
							Step::Relay,
							ErrorKind::RelaySubmissionFailed,
							e.to_string(),
						))
					}
					Ok(Ok(task_id)) => task_id,
				};
				intent.assign_task(task_id.clone());
				self.save(intent).await;
				task_id
			}
		};

		if intent.task_confirmed {
			return Ok(());
		}

		let budget = self
			.until(deadline)
			.min(Duration::from_secs(self.config.relay.relay_timeout_secs));
		match timeout(budget, self.relay.wait_for_confirmation(&task_id)).await {
			Err(_) => {
				intent.abandon_task();
				Err(halt(
					Step::Relay,
					ErrorKind::Timeout,
					format!(
						"relay task {} not confirmed within {}s",
						task_id,
						budget.as_secs()
					),
				))
			}
			Ok(Err(e)) => Err(halt(
				Step::Relay,
				ErrorKind::RelaySubmissionFailed,
				e.to_string(),
			)),
			Ok(Ok(status)) if status.status == RelayStatus::Confirmed => {
				info!(
					intent_id = %intent.id,
					task_id = %task_id,
					transaction = ?status.transaction_hash,
					"Permit executed on source chain"
				);
				intent.task_confirmed = true;
				intent.relay_tx = status.transaction_hash;
				Ok(())
			}
			Ok(Ok(status)) => {
				intent.abandon_task();
				Err(halt(
					Step::Relay,
					ErrorKind::RelaySubmissionFailed,
					status
						.reason
						.unwrap_or_else(|| format!("relay task {} failed", task_id)),
				))
			}
		}
	}

	async fn execute(&self, intent: &mut SwapIntent) -> Result<(), StepHalt> {
		let (Some(task_id), Some(owner), Some(amount), Some(deadline)) = (
			intent.task_id.clone(),
			intent.owner,
			intent.raw_amount,
			intent.deadline,
		) else {
			return Err(halt(
				Step::Execute,
				ErrorKind::ExecutionFailed,
				"relay task or permit details missing",
			));
		};
		let recipient = intent.effective_recipient().unwrap_or_else(|| owner.to_string());

		let limit = deadline + self.config.swap.confirmation_grace_secs;
		let budget = self.until(limit);
		let started = Instant::now();
		let timed_out = || {
			halt(
				Step::Execute,
				ErrorKind::Timeout,
				format!("swap for task {} did not resolve before {}", task_id, limit),
			)
		};

		if !intent.execution_submitted {
			let request = ExecutionRequest {
				task_id: task_id.clone(),
				owner,
				source_chain: intent.source_chain,
				source_token: intent.source_token,
				amount,
				dest_chain: intent.dest_chain,
				dest_token: intent.dest_token.clone(),
				recipient,
				slippage: intent.slippage,
			};
			let report = timeout(budget, self.executor.submit(&request))
				.await
				.map_err(|_| timed_out())?
				.map_err(|e| executor_halt(&e))?;
			intent.execution_submitted = true;
			self.save(intent).await;
			if report.status != ExecutionStatus::Pending {
				return self.finish_execution(intent, report);
			}
		}

		let remaining = budget.saturating_sub(started.elapsed());
		let report = timeout(remaining, self.executor.wait_for_completion(&task_id))
			.await
			.map_err(|_| timed_out())?
			.map_err(|e| executor_halt(&e))?;
		self.finish_execution(intent, report)
	}

	fn finish_execution(
		&self,
		intent: &mut SwapIntent,
		report: ExecutionReport,
	) -> Result<(), StepHalt> {
		match report.status {
			ExecutionStatus::Completed => {
				intent.destination_tx = report.destination_tx;
				Ok(())
			}
			ExecutionStatus::Reverted => Err(halt(
				Step::Execute,
				ErrorKind::ExecutionFailed,
				report
					.reason
					.unwrap_or_else(|| "swap reverted".to_string()),
			)),
			ExecutionStatus::Pending => Err(halt(
				Step::Execute,
				ErrorKind::ExecutionFailed,
				"executor reported the swap as still pending",
			)),
		}
	}

	fn publish_step(&self, intent: &SwapIntent, step: Step) {
		self.event_bus
			.publish(SwapEvent::StepChanged {
				intent_id: intent.id,
				step,
				state: intent.steps.get(step),
			})
			.ok();
	}

	fn publish_status(&self, intent: &SwapIntent) {
		self.event_bus
			.publish(SwapEvent::StatusChanged {
				intent_id: intent.id,
				status: intent.status.clone(),
			})
			.ok();
	}

	async fn save(&self, intent: &SwapIntent) {
		self.session.lock().await.intent = Some(intent.clone());
	}

	async fn archive(&self, intent: &SwapIntent) {
		if let Err(e) = self
			.storage
			.store(HISTORY_NAMESPACE, &intent.id.to_string(), intent)
			.await
		{
			error!(intent_id = %intent.id, error = %e, "Failed to archive swap");
		}
	}
}

/// Step a stopped intent continues from. Nothing after `sign` runs
/// without a signature, and a failed `verify` always re-signs.
fn resume_point(intent: &SwapIntent) -> Result<Step, OrchestratorError> {
	if matches!(intent.status, IntentStatus::Completed { .. }) {
		return Err(OrchestratorError::AlreadyCompleted(intent.id));
	}
	let from = match intent.steps.failed_step() {
		Some((Step::Verify, _)) => Step::Sign,
		Some((step, _)) => step,
		None => intent
			.steps
			.first_incomplete()
			.ok_or(OrchestratorError::AlreadyCompleted(intent.id))?,
	};
	if from > Step::Sign && intent.signed_permit.is_none() && intent.task_id.is_none() {
		return Ok(Step::Sign);
	}
	Ok(from)
}

fn executor_halt(err: &ExecutorError) -> StepHalt {
	halt(Step::Execute, ErrorKind::ExecutionFailed, err.to_string())
}

/// Whether a wallet notification invalidates a session bound to `owner`
/// on `source_chain`.
fn invalidates(event: &WalletEvent, owner: Option<Address>, source_chain: ChainId) -> Option<String> {
	match event {
		WalletEvent::AccountsChanged(accounts) => match owner {
			Some(owner) if accounts.first() != Some(&owner) => {
				Some("wallet account changed".to_string())
			}
			_ => None,
		},
		WalletEvent::ChainChanged(chain_id) if *chain_id != source_chain => {
			Some(format!("wallet switched to chain {}", chain_id))
		}
		WalletEvent::ChainChanged(_) => None,
	}
}

/// Resolves when the user cancels or the wallet invalidates the session.
async fn wait_for_interruption(
	cancel: &mut watch::Receiver<bool>,
	events: &mut Option<broadcast::Receiver<WalletEvent>>,
	owner: Option<Address>,
	source_chain: ChainId,
) -> StepHalt {
	let mut cancel_open = true;
	loop {
		tokio::select! {
			changed = cancel.changed(), if cancel_open => {
				if changed.is_err() {
					cancel_open = false;
					continue;
				}
				let cancelled = *cancel.borrow_and_update();
				if cancelled {
					return StepHalt::Cancelled("cancelled by user".to_string());
				}
			}
			event = next_wallet_event(events) => {
				if let Some(reason) = event.and_then(|event| invalidates(&event, owner, source_chain)) {
					return StepHalt::Reset(reason);
				}
			}
		}
	}
}

async fn next_wallet_event(
	events: &mut Option<broadcast::Receiver<WalletEvent>>,
) -> Option<WalletEvent> {
	let Some(receiver) = events.as_mut() else {
		return std::future::pending().await;
	};
	match receiver.recv().await {
		Ok(event) => Some(event),
		Err(broadcast::error::RecvError::Lagged(skipped)) => {
			warn!(skipped, "Missed wallet notifications");
			None
		}
		Err(broadcast::error::RecvError::Closed) => {
			*events = None;
			None
		}
	}
}

fn drain_wallet_events(
	events: &mut Option<broadcast::Receiver<WalletEvent>>,
	owner: Option<Address>,
	source_chain: ChainId,
) -> Option<String> {
	let receiver = events.as_mut()?;
	let mut reason = None;
	loop {
		match receiver.try_recv() {
			Ok(event) => {
				if let Some(found) = invalidates(&event, owner, source_chain) {
					reason = Some(found);
				}
			}
			Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
			Err(_) => break,
		}
	}
	reason
}
