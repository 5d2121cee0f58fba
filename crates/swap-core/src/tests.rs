use crate::{OrchestratorBuilder, OrchestratorError, PermitOrchestrator};
use alloy::signers::{local::PrivateKeySigner, Signer};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use swap_account::{WalletError, WalletInterface};
use swap_config::{Config, ConfigFormat, ConfigLoader};
use swap_executor::{ExecutorError, ExecutorInterface};
use swap_relay::{RelayError, RelayInterface};
use swap_storage::implementations::file;
use swap_storage::StorageService;
use swap_token::{TokenError, TokenInterface};
use swap_types::{
	Address, Bytes, ChainId, ErrorKind, ExecutionReport, ExecutionRequest, ExecutionStatus,
	IntentStatus, PermitSupport, RelayStatus, RelayTaskStatus, SignedPermit, Step, StepState,
	SwapEvent, SwapIntent, SwapRequest, TaskId, TypedDataRequest, WalletEvent, U256,
};
use tokio::sync::{broadcast, Notify};
use uuid::Uuid;

const START: u64 = 1_700_000_000;
const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

const CONFIG: &str = r#"
[swap]
router_address = "0x1111111111111111111111111111111111111111"

[networks.1]
name = "Ethereum"
rpc_url = "https://eth.example.com"
explorer_url = "https://etherscan.io"

[networks.8453]
name = "Base"
rpc_url = "https://base.example.com"
explorer_url = "https://basescan.org"

[networks.501]
name = "Solana"
explorer_url = "https://solscan.io"

[tokens.1."0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"]
symbol = "USDC"
name = "USD Coin"
decimals = 6

[relay]
base_url = "https://relay.example.com"
poll_interval_ms = 1

[executor]
base_url = "https://executor.example.com"
poll_interval_ms = 1
"#;

type Hook = Box<dyn FnOnce() + Send>;

struct MockWallet {
	signer: PrivateKeySigner,
	chain_id: StdMutex<ChainId>,
	events: broadcast::Sender<WalletEvent>,
	reject_access: AtomicBool,
	refuse_switch: AtomicBool,
	stall_sign: AtomicBool,
	sign_started: Notify,
	sign_calls: AtomicUsize,
	on_sign: StdMutex<Option<Hook>>,
}

impl MockWallet {
	fn new() -> Self {
		let (events, _) = broadcast::channel(16);
		Self {
			signer: ANVIL_KEY.parse().unwrap(),
			chain_id: StdMutex::new(ChainId::ETHEREUM),
			events,
			reject_access: AtomicBool::new(false),
			refuse_switch: AtomicBool::new(false),
			stall_sign: AtomicBool::new(false),
			sign_started: Notify::new(),
			sign_calls: AtomicUsize::new(0),
			on_sign: StdMutex::new(None),
		}
	}

	fn address(&self) -> Address {
		self.signer.address()
	}

	fn on_sign(&self, hook: impl FnOnce() + Send + 'static) {
		*self.on_sign.lock().unwrap() = Some(Box::new(hook));
	}
}

#[async_trait]
impl WalletInterface for MockWallet {
	async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
		Ok(Vec::new())
	}

	async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
		if self.reject_access.load(Ordering::SeqCst) {
			return Err(WalletError::UserRejected("user closed the prompt".to_string()));
		}
		Ok(vec![self.address()])
	}

	async fn chain_id(&self) -> Result<ChainId, WalletError> {
		Ok(*self.chain_id.lock().unwrap())
	}

	async fn switch_chain(&self, chain_id: ChainId) -> Result<(), WalletError> {
		if self.refuse_switch.load(Ordering::SeqCst) {
			return Err(WalletError::SwitchFailed("user declined".to_string()));
		}
		*self.chain_id.lock().unwrap() = chain_id;
		let _ = self.events.send(WalletEvent::ChainChanged(chain_id));
		Ok(())
	}

	async fn sign_typed_data(
		&self,
		request: &TypedDataRequest,
		signer: Address,
	) -> Result<Bytes, WalletError> {
		if signer != self.address() {
			return Err(WalletError::UnknownAccount(signer));
		}
		self.sign_calls.fetch_add(1, Ordering::SeqCst);
		let hook = self.on_sign.lock().unwrap().take();
		if let Some(hook) = hook {
			hook();
		}
		self.sign_started.notify_one();
		if self.stall_sign.load(Ordering::SeqCst) {
			std::future::pending::<()>().await;
		}

		let signature = self
			.signer
			.sign_hash(&request.signing_hash())
			.await
			.map_err(|e| WalletError::SigningFailed(e.to_string()))?;
		Ok(Bytes::from(signature.as_bytes().to_vec()))
	}

	fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
		self.events.subscribe()
	}
}

struct MockToken {
	balance: U256,
	nonce: StdMutex<U256>,
	/// Values returned by the next `nonces` calls before falling back to `nonce`.
	scripted: StdMutex<VecDeque<U256>>,
	unsupported: AtomicBool,
}

impl MockToken {
	fn new() -> Self {
		Self {
			balance: U256::from(50_000_000u64),
			nonce: StdMutex::new(U256::from(3u64)),
			scripted: StdMutex::new(VecDeque::new()),
			unsupported: AtomicBool::new(false),
		}
	}

	fn script_nonces(&self, nonces: &[u64]) {
		self.scripted
			.lock()
			.unwrap()
			.extend(nonces.iter().map(|n| U256::from(*n)));
	}
}

#[async_trait]
impl TokenInterface for MockToken {
	async fn balance_of(
		&self,
		_chain_id: ChainId,
		_token: Address,
		_owner: Address,
	) -> Result<U256, TokenError> {
		Ok(self.balance)
	}

	async fn nonces(
		&self,
		_chain_id: ChainId,
		_token: Address,
		_owner: Address,
	) -> Result<U256, TokenError> {
		if self.unsupported.load(Ordering::SeqCst) {
			return Err(TokenError::Call("execution reverted".to_string()));
		}
		if let Some(next) = self.scripted.lock().unwrap().pop_front() {
			return Ok(next);
		}
		Ok(*self.nonce.lock().unwrap())
	}
}

#[derive(Default)]
struct MockRelay {
	verify_script: StdMutex<VecDeque<Result<(), RelayError>>>,
	status_script: StdMutex<VecDeque<RelayTaskStatus>>,
	verified: StdMutex<Vec<SignedPermit>>,
	submitted: StdMutex<Vec<SignedPermit>>,
	stall_verify: AtomicBool,
	stall_status: AtomicBool,
	gate_status: AtomicBool,
	status_started: Notify,
	status_release: Notify,
}

impl MockRelay {
	fn submit_count(&self) -> usize {
		self.submitted.lock().unwrap().len()
	}

	fn verify_count(&self) -> usize {
		self.verified.lock().unwrap().len()
	}
}

#[async_trait]
impl RelayInterface for MockRelay {
	async fn verify(&self, permit: &SignedPermit) -> Result<(), RelayError> {
		self.verified.lock().unwrap().push(permit.clone());
		if self.stall_verify.load(Ordering::SeqCst) {
			std::future::pending::<()>().await;
		}
		self.verify_script.lock().unwrap().pop_front().unwrap_or(Ok(()))
	}

	async fn submit(&self, permit: &SignedPermit) -> Result<TaskId, RelayError> {
		let mut submitted = self.submitted.lock().unwrap();
		submitted.push(permit.clone());
		Ok(TaskId::new(format!("task-{}", submitted.len())))
	}

	async fn status(&self, task_id: &TaskId) -> Result<RelayTaskStatus, RelayError> {
		if self.gate_status.swap(false, Ordering::SeqCst) {
			self.status_started.notify_one();
			self.status_release.notified().await;
		}
		if self.stall_status.load(Ordering::SeqCst) {
			std::future::pending::<()>().await;
		}
		let scripted = self.status_script.lock().unwrap().pop_front();
		Ok(scripted.unwrap_or_else(|| RelayTaskStatus {
			task_id: task_id.clone(),
			status: RelayStatus::Confirmed,
			transaction_hash: Some("0xrelaytx".to_string()),
			reason: None,
		}))
	}
}

#[derive(Default)]
struct MockExecutor {
	outcome: StdMutex<Option<(ExecutionStatus, Option<String>)>>,
	requests: StdMutex<Vec<ExecutionRequest>>,
	stall: AtomicBool,
}

#[async_trait]
impl ExecutorInterface for MockExecutor {
	async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionReport, ExecutorError> {
		self.requests.lock().unwrap().push(request.clone());
		Ok(ExecutionReport {
			task_id: request.task_id.clone(),
			status: ExecutionStatus::Pending,
			destination_tx: None,
			reason: None,
		})
	}

	async fn status(&self, task_id: &TaskId) -> Result<ExecutionReport, ExecutorError> {
		if self.stall.load(Ordering::SeqCst) {
			std::future::pending::<()>().await;
		}
		let (status, reason) = self
			.outcome
			.lock()
			.unwrap()
			.clone()
			.unwrap_or((ExecutionStatus::Completed, None));
		let destination_tx =
			(status == ExecutionStatus::Completed).then(|| "5xDestinationSig".to_string());
		Ok(ExecutionReport {
			task_id: task_id.clone(),
			status,
			destination_tx,
			reason,
		})
	}
}

struct Harness {
	config: Config,
	wallet: Arc<MockWallet>,
	token: Arc<MockToken>,
	relay: Arc<MockRelay>,
	executor: Arc<MockExecutor>,
	now: Arc<AtomicU64>,
	/// Shared by every orchestrator the harness builds, like history on disk.
	storage_dir: tempfile::TempDir,
}

impl Harness {
	fn new() -> Self {
		let config = ConfigLoader::new()
			.with_env_prefix("CORE_TEST_")
			.load_str(CONFIG, ConfigFormat::Toml)
			.unwrap();
		Self {
			config,
			wallet: Arc::new(MockWallet::new()),
			token: Arc::new(MockToken::new()),
			relay: Arc::new(MockRelay::default()),
			executor: Arc::new(MockExecutor::default()),
			now: Arc::new(AtomicU64::new(START)),
			storage_dir: tempfile::tempdir().unwrap(),
		}
	}

	fn storage(&self) -> StorageService {
		StorageService::new(file::create_storage(self.storage_dir.path()))
	}

	fn builder(&self) -> OrchestratorBuilder {
		let token = self.token.clone();
		let relay = self.relay.clone();
		let executor = self.executor.clone();
		let now = self.now.clone();
		let storage_dir = self.storage_dir.path().to_path_buf();
		OrchestratorBuilder::new(self.config.clone())
			.with_token_factory(move |_| Ok(token.clone() as Arc<dyn TokenInterface>))
			.with_relay_factory(move |_| Ok(relay.clone() as Arc<dyn RelayInterface>))
			.with_executor_factory(move |_| Ok(executor.clone() as Arc<dyn ExecutorInterface>))
			.with_storage_factory(move |_| Ok(file::create_storage(storage_dir.clone())))
			.with_clock(Arc::new(move || now.load(Ordering::SeqCst)))
	}

	fn build(&self) -> PermitOrchestrator {
		let wallet = self.wallet.clone();
		self.builder()
			.with_wallet_factory(move |_| Ok(wallet.clone() as Arc<dyn WalletInterface>))
			.build()
			.unwrap()
	}
}

fn request(amount: &str) -> SwapRequest {
	SwapRequest {
		source_chain: ChainId::ETHEREUM,
		source_token: USDC.to_string(),
		dest_chain: ChainId::SOLANA,
		dest_token: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string(),
		amount: amount.to_string(),
		recipient: None,
		slippage: None,
	}
}

fn failure_kind(status: &IntentStatus) -> Option<(Step, ErrorKind)> {
	match status {
		IntentStatus::Failed { failure } | IntentStatus::Inconsistent { failure, .. } => {
			Some((failure.step, failure.kind))
		}
		_ => None,
	}
}

#[tokio::test]
async fn test_successful_swap() {
	let harness = Harness::new();
	let orchestrator = harness.build();
	let mut events = orchestrator.subscribe();

	let intent = orchestrator.start(request("10")).await.unwrap();

	assert_eq!(
		intent.status,
		IntentStatus::Completed {
			destination_tx: Some("5xDestinationSig".to_string())
		}
	);
	assert!(intent.steps.is_complete());
	assert_eq!(intent.created_at, START);
	assert_eq!(intent.owner, Some(harness.wallet.address()));
	assert_eq!(intent.balance, Some(U256::from(50_000_000u64)));

	let permit = intent.signed_permit.clone().unwrap();
	assert_eq!(permit.permit_message.value, U256::from(10_000_000u64));
	assert_eq!(permit.permit_message.nonce, U256::from(3u64));
	assert_eq!(permit.permit_message.deadline, START + 3600);
	assert_eq!(permit.permit_message.spender, harness.config.swap.router_address);
	assert_eq!(permit.domain.chain_id, ChainId::ETHEREUM);
	assert_eq!(permit.recover_signer().unwrap(), harness.wallet.address());

	assert_eq!(intent.task_id, Some(TaskId::new("task-1")));
	assert_eq!(intent.relay_tx.as_deref(), Some("0xrelaytx"));

	let requests = harness.executor.requests.lock().unwrap().clone();
	assert_eq!(requests.len(), 1);
	assert_eq!(requests[0].amount, U256::from(10_000_000u64));
	assert_eq!(requests[0].recipient, harness.wallet.address().to_string());
	assert_eq!(requests[0].slippage, harness.config.swap.default_slippage);

	let mut succeeded = Vec::new();
	let mut last_status = None;
	while let Ok(event) = events.try_recv() {
		match event {
			SwapEvent::StepChanged {
				step,
				state: StepState::Succeeded,
				..
			} => succeeded.push(step),
			SwapEvent::StatusChanged { status, .. } => last_status = Some(status),
			_ => {}
		}
	}
	assert_eq!(succeeded, Step::ALL.to_vec());
	assert_eq!(last_status, Some(intent.status.clone()));
}

#[tokio::test]
async fn test_completed_swap_is_archived() {
	let harness = Harness::new();
	let orchestrator = harness.build();

	let intent = orchestrator.start(request("1.5")).await.unwrap();
	let archived = orchestrator.history(intent.id).await.unwrap();
	assert_eq!(archived.id, intent.id);
	assert_eq!(archived.status, intent.status);

	let missing = Uuid::new_v4();
	assert!(matches!(
		orchestrator.history(missing).await,
		Err(OrchestratorError::HistoryNotFound(id)) if id == missing
	));
}

#[tokio::test]
async fn test_missing_wallet_fails_connect() {
	let harness = Harness::new();
	let orchestrator = harness.builder().build().unwrap();

	let intent = orchestrator.start(request("10")).await.unwrap();
	assert_eq!(failure_kind(&intent.status), Some((Step::Connect, ErrorKind::NoWallet)));
	assert_eq!(intent.steps.get(Step::Sign), StepState::Pending);
	assert_eq!(harness.relay.verify_count(), 0);
}

#[tokio::test]
async fn test_denied_account_access() {
	let harness = Harness::new();
	harness.wallet.reject_access.store(true, Ordering::SeqCst);
	let orchestrator = harness.build();

	let intent = orchestrator.start(request("10")).await.unwrap();
	assert_eq!(
		failure_kind(&intent.status),
		Some((Step::Connect, ErrorKind::UserRejected))
	);
	assert_eq!(harness.wallet.sign_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_amounts_fail_before_signing() {
	for amount in ["0", "abc", "0.0000001", ""] {
		let harness = Harness::new();
		let orchestrator = harness.build();

		let intent = orchestrator.start(request(amount)).await.unwrap();
		assert_eq!(
			failure_kind(&intent.status),
			Some((Step::Sign, ErrorKind::InvalidAmount)),
			"amount {:?}",
			amount
		);
		assert_eq!(harness.wallet.sign_calls.load(Ordering::SeqCst), 0);
	}
}

#[tokio::test]
async fn test_token_without_permit_blocks_swap() {
	let harness = Harness::new();
	harness.token.unsupported.store(true, Ordering::SeqCst);
	let orchestrator = harness.build();

	let intent = orchestrator.start(request("10")).await.unwrap();
	assert!(matches!(intent.status, IntentStatus::Blocked { .. }));
	assert_eq!(intent.steps.get(Step::Connect), StepState::Succeeded);
	assert_eq!(intent.steps.get(Step::Sign), StepState::Pending);
	assert!(intent.status.error_kind().is_none());
	assert_eq!(harness.wallet.sign_calls.load(Ordering::SeqCst), 0);
	assert!(matches!(
		orchestrator.permit_support().await,
		PermitSupport::Unsupported { .. }
	));
}

#[tokio::test]
async fn test_wallet_switched_to_source_chain() {
	let harness = Harness::new();
	*harness.wallet.chain_id.lock().unwrap() = ChainId::BASE;
	let orchestrator = harness.build();

	let intent = orchestrator.start(request("10")).await.unwrap();
	assert!(matches!(intent.status, IntentStatus::Completed { .. }));
	assert_eq!(*harness.wallet.chain_id.lock().unwrap(), ChainId::ETHEREUM);
	// The switch to the source chain must not reset the session.
	assert!(orchestrator.intent().await.is_some());
}

#[tokio::test]
async fn test_refused_chain_switch() {
	let harness = Harness::new();
	*harness.wallet.chain_id.lock().unwrap() = ChainId::BASE;
	harness.wallet.refuse_switch.store(true, Ordering::SeqCst);
	let orchestrator = harness.build();

	let intent = orchestrator.start(request("10")).await.unwrap();
	assert_eq!(
		failure_kind(&intent.status),
		Some((Step::Sign, ErrorKind::ChainMismatch))
	);
	assert_eq!(harness.wallet.sign_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_nonce_moved_while_signing() {
	let harness = Harness::new();
	let token = harness.token.clone();
	harness.wallet.on_sign(move || {
		*token.nonce.lock().unwrap() = U256::from(4u64);
	});
	let orchestrator = harness.build();

	let intent = orchestrator.start(request("10")).await.unwrap();
	assert_eq!(failure_kind(&intent.status), Some((Step::Sign, ErrorKind::NonceStale)));
	assert!(intent.signed_permit.is_none());
	assert_eq!(harness.relay.verify_count(), 0);
}

#[tokio::test]
async fn test_stale_nonce_at_verify_resigns() {
	let harness = Harness::new();
	// probe, post-sign check, verify check
	harness.token.script_nonces(&[3, 3, 4]);
	*harness.token.nonce.lock().unwrap() = U256::from(4u64);
	let orchestrator = harness.build();

	let intent = orchestrator.start(request("10")).await.unwrap();
	assert!(matches!(intent.status, IntentStatus::Completed { .. }));
	assert_eq!(harness.wallet.sign_calls.load(Ordering::SeqCst), 2);

	// Only the second signature ever reaches the relay.
	let verified = harness.relay.verified.lock().unwrap().clone();
	assert_eq!(verified.len(), 1);
	assert_eq!(verified[0].permit_message.nonce, U256::from(4u64));
	assert_eq!(
		intent.signed_permit.unwrap().permit_message.nonce,
		U256::from(4u64)
	);
}

#[tokio::test]
async fn test_repeatedly_stale_nonce_fails() {
	let harness = Harness::new();
	harness.token.script_nonces(&[3, 3, 4, 4, 4]);
	*harness.token.nonce.lock().unwrap() = U256::from(5u64);
	let orchestrator = harness.build();

	let intent = orchestrator.start(request("10")).await.unwrap();
	assert_eq!(
		failure_kind(&intent.status),
		Some((Step::Verify, ErrorKind::NonceStale))
	);
	assert_eq!(harness.relay.verify_count(), 0);
}

#[tokio::test]
async fn test_expired_permit_rejected_at_verify() {
	let harness = Harness::new();
	let now = harness.now.clone();
	harness.wallet.on_sign(move || {
		now.fetch_add(7200, Ordering::SeqCst);
	});
	let orchestrator = harness.build();

	let intent = orchestrator.start(request("10")).await.unwrap();
	assert_eq!(
		failure_kind(&intent.status),
		Some((Step::Verify, ErrorKind::VerificationRejected))
	);
	assert_eq!(harness.relay.verify_count(), 0);
	assert_eq!(harness.relay.submit_count(), 0);
}

#[tokio::test]
async fn test_verify_retries_network_failure_once() {
	let harness = Harness::new();
	harness
		.relay
		.verify_script
		.lock()
		.unwrap()
		.push_back(Err(RelayError::Network("connection reset".to_string())));
	let orchestrator = harness.build();

	let intent = orchestrator.start(request("10")).await.unwrap();
	assert!(matches!(intent.status, IntentStatus::Completed { .. }));
	assert_eq!(harness.relay.verify_count(), 2);
}

#[tokio::test]
async fn test_verify_failure_resumes_from_sign() {
	let harness = Harness::new();
	{
		let mut script = harness.relay.verify_script.lock().unwrap();
		script.push_back(Err(RelayError::Network("timeout".to_string())));
		script.push_back(Err(RelayError::Network("timeout".to_string())));
	}
	let orchestrator = harness.build();

	let intent = orchestrator.start(request("10")).await.unwrap();
	assert_eq!(
		failure_kind(&intent.status),
		Some((Step::Verify, ErrorKind::VerificationRejected))
	);
	assert_eq!(harness.relay.submit_count(), 0);

	let resumed = orchestrator.resume().await.unwrap();
	assert_eq!(resumed.id, intent.id);
	assert!(matches!(resumed.status, IntentStatus::Completed { .. }));
	assert_eq!(harness.wallet.sign_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_relay_failure_halts_pipeline() {
	let harness = Harness::new();
	harness
		.relay
		.status_script
		.lock()
		.unwrap()
		.push_back(RelayTaskStatus {
			task_id: TaskId::new("task-1"),
			status: RelayStatus::Failed,
			transaction_hash: None,
			reason: Some("permit already used".to_string()),
		});
	let orchestrator = harness.build();

	let intent = orchestrator.start(request("10")).await.unwrap();
	assert_eq!(
		failure_kind(&intent.status),
		Some((Step::Relay, ErrorKind::RelaySubmissionFailed))
	);
	assert_eq!(intent.steps.get(Step::Execute), StepState::Pending);
	assert!(intent.task_id.is_none());
	assert_eq!(intent.abandoned_tasks, vec![TaskId::new("task-1")]);
	assert!(harness.executor.requests.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_relay_timeout_abandons_task() {
	let harness = Harness::new();
	harness.relay.stall_status.store(true, Ordering::SeqCst);
	let orchestrator = harness.build();

	let intent = orchestrator.start(request("10")).await.unwrap();
	assert_eq!(failure_kind(&intent.status), Some((Step::Relay, ErrorKind::Timeout)));
	assert_eq!(intent.abandoned_tasks, vec![TaskId::new("task-1")]);

	harness.relay.stall_status.store(false, Ordering::SeqCst);
	let resumed = orchestrator.resume().await.unwrap();
	assert!(matches!(resumed.status, IntentStatus::Completed { .. }));
	assert_eq!(resumed.task_id, Some(TaskId::new("task-2")));
	assert_eq!(harness.relay.submit_count(), 2);
}

#[tokio::test]
async fn test_reverted_swap_is_inconsistent() {
	let harness = Harness::new();
	*harness.executor.outcome.lock().unwrap() = Some((
		ExecutionStatus::Reverted,
		Some("slippage exceeded".to_string()),
	));
	let orchestrator = harness.build();

	let intent = orchestrator.start(request("10")).await.unwrap();
	match &intent.status {
		IntentStatus::Inconsistent { task_id, failure } => {
			assert_eq!(task_id, "task-1");
			assert_eq!(failure.step, Step::Execute);
			assert_eq!(failure.kind, ErrorKind::ExecutionFailed);
			assert_eq!(failure.message, "slippage exceeded");
		}
		other => panic!("unexpected status {:?}", other),
	}
	assert_eq!(intent.status.error_kind(), Some(ErrorKind::InconsistentState));
	assert_eq!(intent.steps.get(Step::Relay), StepState::Succeeded);
}

#[tokio::test(start_paused = true)]
async fn test_confirmed_task_not_resubmitted_after_execute_timeout() {
	let harness = Harness::new();
	harness.executor.stall.store(true, Ordering::SeqCst);
	let orchestrator = harness.build();

	let intent = orchestrator.start(request("10")).await.unwrap();
	assert!(matches!(
		&intent.status,
		IntentStatus::Inconsistent { task_id, failure }
			if task_id == "task-1" && failure.kind == ErrorKind::Timeout
	));
	assert!(intent.task_confirmed);

	harness.executor.stall.store(false, Ordering::SeqCst);
	let resumed = orchestrator.resume().await.unwrap();
	assert!(matches!(resumed.status, IntentStatus::Completed { .. }));
	assert_eq!(harness.relay.submit_count(), 1);
	assert_eq!(harness.executor.requests.lock().unwrap().len(), 1);
	assert_eq!(harness.wallet.sign_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancel_before_verify_and_resume() {
	let harness = Harness::new();
	harness.wallet.stall_sign.store(true, Ordering::SeqCst);
	let orchestrator = Arc::new(harness.build());

	let running = tokio::spawn({
		let orchestrator = orchestrator.clone();
		async move { orchestrator.start(request("10")).await }
	});
	harness.wallet.sign_started.notified().await;

	assert!(orchestrator.is_busy());
	assert!(matches!(
		orchestrator.start(request("10")).await,
		Err(OrchestratorError::Busy)
	));

	orchestrator.cancel();
	let intent = running.await.unwrap().unwrap();
	assert!(matches!(
		intent.status,
		IntentStatus::Cancelled { step: Step::Sign, .. }
	));
	assert_eq!(intent.steps.get(Step::Sign), StepState::Pending);
	assert!(!orchestrator.is_busy());
	assert_eq!(harness.relay.verify_count(), 0);

	harness.wallet.stall_sign.store(false, Ordering::SeqCst);
	let resumed = orchestrator.resume().await.unwrap();
	assert_eq!(resumed.id, intent.id);
	assert!(matches!(resumed.status, IntentStatus::Completed { .. }));
}

#[tokio::test]
async fn test_cancel_after_relay_is_ignored() {
	let harness = Harness::new();
	harness.relay.gate_status.store(true, Ordering::SeqCst);
	let orchestrator = Arc::new(harness.build());

	let running = tokio::spawn({
		let orchestrator = orchestrator.clone();
		async move { orchestrator.start(request("10")).await }
	});
	harness.relay.status_started.notified().await;
	orchestrator.cancel();
	harness.relay.status_release.notify_one();

	let intent = running.await.unwrap().unwrap();
	assert!(matches!(intent.status, IntentStatus::Completed { .. }));
}

#[tokio::test]
async fn test_account_change_resets_session() {
	let harness = Harness::new();
	let events = harness.wallet.events.clone();
	harness.wallet.on_sign(move || {
		let _ = events.send(WalletEvent::AccountsChanged(vec![Address::repeat_byte(0x42)]));
	});
	harness.wallet.stall_sign.store(true, Ordering::SeqCst);
	let orchestrator = harness.build();
	let mut notifications = orchestrator.subscribe();

	let intent = orchestrator.start(request("10")).await.unwrap();
	assert!(matches!(
		intent.status,
		IntentStatus::Cancelled { step: Step::Sign, .. }
	));
	assert!(orchestrator.intent().await.is_none());
	assert_eq!(orchestrator.permit_support().await, PermitSupport::Unknown);
	assert!(matches!(
		orchestrator.resume().await,
		Err(OrchestratorError::NothingToResume)
	));

	let mut reset = false;
	while let Ok(event) = notifications.try_recv() {
		reset |= matches!(event, SwapEvent::SessionReset { .. });
	}
	assert!(reset);
}

#[tokio::test]
async fn test_chain_change_after_relay_applies_once_finished() {
	let harness = Harness::new();
	harness.relay.gate_status.store(true, Ordering::SeqCst);
	let orchestrator = Arc::new(harness.build());

	let running = tokio::spawn({
		let orchestrator = orchestrator.clone();
		async move { orchestrator.start(request("10")).await }
	});
	harness.relay.status_started.notified().await;
	let _ = harness
		.wallet
		.events
		.send(WalletEvent::ChainChanged(ChainId::BASE));
	harness.relay.status_release.notify_one();

	let intent = running.await.unwrap().unwrap();
	assert!(matches!(intent.status, IntentStatus::Completed { .. }));
	assert!(orchestrator.intent().await.is_none());
	assert!(orchestrator.history(intent.id).await.is_ok());
}

#[tokio::test]
async fn test_request_validation() {
	let harness = Harness::new();
	let orchestrator = harness.build();

	let mut unknown = request("10");
	unknown.source_token = "0xdAC17F958D2ee523a2206206994597C13D831ec7".to_string();
	assert!(matches!(
		orchestrator.start(unknown).await,
		Err(OrchestratorError::UnknownToken { .. })
	));

	let mut slippage = request("10");
	slippage.slippage = Some(rust_decimal::Decimal::new(150, 0));
	assert!(matches!(
		orchestrator.start(slippage).await,
		Err(OrchestratorError::InvalidRequest(_))
	));

	let mut no_destination = request("10");
	no_destination.dest_token = "  ".to_string();
	assert!(matches!(
		orchestrator.start(no_destination).await,
		Err(OrchestratorError::InvalidRequest(_))
	));

	assert!(!orchestrator.is_busy());
	assert!(orchestrator.intent().await.is_none());
}

#[tokio::test]
async fn test_resume_rules() {
	let harness = Harness::new();
	let orchestrator = harness.build();
	assert!(matches!(
		orchestrator.resume().await,
		Err(OrchestratorError::NothingToResume)
	));

	let intent = orchestrator.start(request("10")).await.unwrap();
	assert!(matches!(
		orchestrator.resume().await,
		Err(OrchestratorError::AlreadyCompleted(id)) if id == intent.id
	));

	orchestrator.reset("user requested").await.unwrap();
	assert!(orchestrator.intent().await.is_none());
}

#[tokio::test]
async fn test_builder_requires_relay() {
	let harness = Harness::new();
	let token = harness.token.clone();
	let result = OrchestratorBuilder::new(harness.config.clone())
		.with_token_factory(move |_| Ok(token.clone() as Arc<dyn TokenInterface>))
		.build();
	assert!(matches!(result, Err(OrchestratorError::Config(_))));
}

#[tokio::test(start_paused = true)]
async fn test_verify_timeout_is_not_a_rejection() {
	let harness = Harness::new();
	harness.relay.stall_verify.store(true, Ordering::SeqCst);
	let orchestrator = harness.build();

	let intent = orchestrator.start(request("10")).await.unwrap();
	assert_eq!(
		failure_kind(&intent.status),
		Some((Step::Verify, ErrorKind::Timeout))
	);
	assert_eq!(intent.steps.get(Step::Relay), StepState::Pending);
	assert_eq!(harness.relay.verify_count(), 1);
	assert_eq!(harness.relay.submit_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_restored_inconsistent_swap_reuses_task() {
	let harness = Harness::new();
	harness.executor.stall.store(true, Ordering::SeqCst);
	let first = harness.build();
	let intent = first.start(request("10")).await.unwrap();
	assert!(matches!(intent.status, IntentStatus::Inconsistent { .. }));
	drop(first);

	harness.executor.stall.store(false, Ordering::SeqCst);
	let orchestrator = harness.build();
	let restored = orchestrator.restore(intent.id).await.unwrap();
	assert_eq!(restored.task_id, Some(TaskId::new("task-1")));
	assert_eq!(restored.steps.get(Step::Relay), StepState::Succeeded);

	let resumed = orchestrator.resume().await.unwrap();
	assert_eq!(resumed.id, intent.id);
	assert!(matches!(resumed.status, IntentStatus::Completed { .. }));
	assert_eq!(harness.relay.submit_count(), 1);
	assert_eq!(harness.executor.requests.lock().unwrap().len(), 1);
	assert_eq!(harness.wallet.sign_calls.load(Ordering::SeqCst), 1);

	let archived = orchestrator.history(intent.id).await.unwrap();
	assert_eq!(archived.status, resumed.status);
}

#[tokio::test]
async fn test_restored_verify_failure_starts_at_connect() {
	let harness = Harness::new();
	{
		let mut script = harness.relay.verify_script.lock().unwrap();
		script.push_back(Err(RelayError::Rejected("bad signature".to_string())));
	}
	let intent = harness.build().start(request("10")).await.unwrap();
	assert_eq!(
		failure_kind(&intent.status),
		Some((Step::Verify, ErrorKind::VerificationRejected))
	);

	let orchestrator = harness.build();
	let restored = orchestrator.restore(intent.id).await.unwrap();
	assert!(Step::ALL
		.iter()
		.all(|step| restored.steps.get(*step) == StepState::Pending));
	assert!(restored.signed_permit.is_none());

	let resumed = orchestrator.resume().await.unwrap();
	assert!(matches!(resumed.status, IntentStatus::Completed { .. }));
	assert_eq!(harness.wallet.sign_calls.load(Ordering::SeqCst), 2);
	assert_eq!(harness.relay.submit_count(), 1);
}

#[tokio::test]
async fn test_restore_rules() {
	let harness = Harness::new();
	let orchestrator = harness.build();
	let intent = orchestrator.start(request("10")).await.unwrap();

	assert!(matches!(
		orchestrator.restore(intent.id).await,
		Err(OrchestratorError::AlreadyCompleted(id)) if id == intent.id
	));
	let missing = Uuid::new_v4();
	assert!(matches!(
		orchestrator.restore(missing).await,
		Err(OrchestratorError::HistoryNotFound(id)) if id == missing
	));
}

#[tokio::test(start_paused = true)]
async fn test_signature_for_other_tuple_is_not_relayed() {
	let harness = Harness::new();
	harness.relay.stall_status.store(true, Ordering::SeqCst);
	let intent = harness.build().start(request("10")).await.unwrap();
	assert_eq!(failure_kind(&intent.status), Some((Step::Relay, ErrorKind::Timeout)));
	assert_eq!(harness.relay.submit_count(), 1);

	// The stored record now claims a nonce the signature was not made for.
	let storage = harness.storage();
	let mut record: SwapIntent = storage
		.retrieve(crate::HISTORY_NAMESPACE, &intent.id.to_string())
		.await
		.unwrap();
	record.nonce = Some(U256::from(99u64));
	storage
		.store(crate::HISTORY_NAMESPACE, &intent.id.to_string(), &record)
		.await
		.unwrap();

	harness.relay.stall_status.store(false, Ordering::SeqCst);
	let orchestrator = harness.build();
	orchestrator.restore(intent.id).await.unwrap();
	let refused = orchestrator.resume().await.unwrap();
	assert_eq!(
		failure_kind(&refused.status),
		Some((Step::Relay, ErrorKind::RelaySubmissionFailed))
	);
	assert!(refused.signed_permit.is_none());
	assert_eq!(harness.relay.submit_count(), 1);

	let resumed = orchestrator.resume().await.unwrap();
	assert!(matches!(resumed.status, IntentStatus::Completed { .. }));
	assert_eq!(resumed.nonce, Some(U256::from(3u64)));
	assert_eq!(resumed.task_id, Some(TaskId::new("task-2")));
	assert_eq!(harness.wallet.sign_calls.load(Ordering::SeqCst), 2);
}
