//! Wire types shared with the relay service and the swap executor.

use crate::chains::ChainId;
use crate::common::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Relay-assigned handle for a submitted permit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for TaskId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Status of a relay task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayStatus {
	Queued,
	Submitted,
	Confirmed,
	Failed,
}

impl RelayStatus {
	pub fn is_terminal(&self) -> bool {
		matches!(self, RelayStatus::Confirmed | RelayStatus::Failed)
	}
}

/// Response of the relay status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayTaskStatus {
	pub task_id: TaskId,
	pub status: RelayStatus,
	/// Origin-chain transaction that executed the permit.
	#[serde(default)]
	pub transaction_hash: Option<String>,
	/// Failure reason reported by the relay.
	#[serde(default)]
	pub reason: Option<String>,
}

/// Swap request handed to the executor once the permit is relayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
	pub task_id: TaskId,
	pub owner: Address,
	pub source_chain: ChainId,
	pub source_token: Address,
	pub amount: U256,
	pub dest_chain: ChainId,
	pub dest_token: String,
	pub recipient: String,
	pub slippage: Decimal,
}

/// Status of a swap execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
	Pending,
	Completed,
	Reverted,
}

/// Report returned by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
	pub task_id: TaskId,
	pub status: ExecutionStatus,
	/// Destination-chain transaction reference, present on completion.
	#[serde(default)]
	pub destination_tx: Option<String>,
	#[serde(default)]
	pub reason: Option<String>,
}
