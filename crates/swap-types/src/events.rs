//! Events published by the orchestrator and by wallets.

use crate::chains::ChainId;
use crate::common::Address;
use crate::pipeline::{IntentStatus, Step, StepState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notifications observers receive while a swap runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapEvent {
	StepChanged {
		intent_id: Uuid,
		step: Step,
		state: StepState,
	},
	StatusChanged {
		intent_id: Uuid,
		status: IntentStatus,
	},
	/// Session context was cleared after a wallet account or chain change.
	SessionReset { reason: String },
}

/// Account and chain change notifications emitted by a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletEvent {
	AccountsChanged(Vec<Address>),
	ChainChanged(ChainId),
}
