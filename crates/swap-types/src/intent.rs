//! Swap requests and the single active swap intent.

use crate::chains::ChainId;
use crate::common::{Address, Timestamp, U256};
use crate::permit::SignedPermit;
use crate::pipeline::{IntentStatus, PipelineStatus};
use crate::relay::TaskId;
use crate::token::TokenInfo;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the user asked for, before any pipeline step ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
	pub source_chain: ChainId,
	/// Source token address as listed in the registry.
	pub source_token: String,
	pub dest_chain: ChainId,
	/// Destination token identifier; may be a non-EVM address.
	pub dest_token: String,
	/// Decimal amount as entered by the user.
	pub amount: String,
	/// Destination address. Defaults to the signer.
	pub recipient: Option<String>,
	/// Slippage tolerance in percent. Defaults to the configured value.
	pub slippage: Option<Decimal>,
}

/// A swap moving through the pipeline.
///
/// Created from a [`SwapRequest`], mutated in place by every step and
/// archived once it reaches a terminal status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapIntent {
	pub id: Uuid,
	pub source_chain: ChainId,
	pub dest_chain: ChainId,
	pub source_token: Address,
	pub token: TokenInfo,
	pub dest_token: String,
	pub amount: String,
	pub slippage: Decimal,
	pub recipient: Option<String>,
	/// Signer account, captured by `connect`.
	pub owner: Option<Address>,
	/// Source-token balance of the owner, informational.
	pub balance: Option<U256>,
	/// `amount * 10^decimals`, computed when signing.
	pub raw_amount: Option<U256>,
	/// Permit nonce captured together with the signature.
	pub nonce: Option<U256>,
	pub deadline: Option<Timestamp>,
	pub signed_permit: Option<SignedPermit>,
	pub signed_at: Option<Timestamp>,
	pub task_id: Option<TaskId>,
	/// Whether the relay confirmed `task_id` on-chain.
	pub task_confirmed: bool,
	pub relay_tx: Option<String>,
	/// Tasks superseded by a later submission.
	pub abandoned_tasks: Vec<TaskId>,
	/// Whether the executor already accepted `task_id`.
	pub execution_submitted: bool,
	pub destination_tx: Option<String>,
	pub steps: PipelineStatus,
	pub status: IntentStatus,
	pub created_at: Timestamp,
	pub updated_at: Timestamp,
}

impl SwapIntent {
	/// `now` stamps both `created_at` and `updated_at`.
	pub fn new(
		request: &SwapRequest,
		source_token: Address,
		token: TokenInfo,
		default_slippage: Decimal,
		now: Timestamp,
	) -> Self {
		Self {
			id: Uuid::new_v4(),
			source_chain: request.source_chain,
			dest_chain: request.dest_chain,
			source_token,
			token,
			dest_token: request.dest_token.clone(),
			amount: request.amount.clone(),
			slippage: request.slippage.unwrap_or(default_slippage),
			recipient: request.recipient.clone(),
			owner: None,
			balance: None,
			raw_amount: None,
			nonce: None,
			deadline: None,
			signed_permit: None,
			signed_at: None,
			task_id: None,
			task_confirmed: false,
			relay_tx: None,
			abandoned_tasks: Vec::new(),
			execution_submitted: false,
			destination_tx: None,
			steps: PipelineStatus::default(),
			status: IntentStatus::Created,
			created_at: now,
			updated_at: now,
		}
	}

	/// Recipient on the destination chain, falling back to the signer.
	pub fn effective_recipient(&self) -> Option<String> {
		self.recipient
			.clone()
			.or_else(|| self.owner.map(|owner| owner.to_string()))
	}

	/// Drops the signature and the nonce/deadline captured with it.
	pub fn discard_signature(&mut self) {
		self.signed_permit = None;
		self.signed_at = None;
		self.nonce = None;
		self.deadline = None;
	}

	/// Records a fresh relay task. A previous, different task is invalidated.
	pub fn assign_task(&mut self, task_id: TaskId) {
		if let Some(previous) = self.task_id.take() {
			if previous != task_id {
				self.abandoned_tasks.push(previous);
			}
		}
		self.task_id = Some(task_id);
		self.task_confirmed = false;
		self.execution_submitted = false;
		self.relay_tx = None;
	}

	/// Marks the current task abandoned so the next relay attempt resubmits.
	pub fn abandon_task(&mut self) {
		if let Some(previous) = self.task_id.take() {
			self.abandoned_tasks.push(previous);
		}
		self.task_confirmed = false;
		self.execution_submitted = false;
		self.relay_tx = None;
	}
}
