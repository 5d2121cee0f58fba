//! Errors returned by the orchestrator itself.
//!
//! Step failures are not errors at this level: they end the run normally
//! and are reported through the intent status.

use swap_storage::StorageError;
use swap_types::{ChainId, TransitionError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum OrchestratorError {
	#[error("A swap is already in flight")]
	Busy,

	#[error("Configuration error: {0}")]
	Config(String),

	#[error("Token {token} is not registered on chain {chain_id}")]
	UnknownToken { chain_id: ChainId, token: String },

	#[error("Invalid swap request: {0}")]
	InvalidRequest(String),

	#[error("No swap to resume")]
	NothingToResume,

	#[error("Swap {0} already completed")]
	AlreadyCompleted(Uuid),

	#[error("Swap {0} not found in history")]
	HistoryNotFound(Uuid),

	#[error("Pipeline transition error: {0}")]
	Transition(#[from] TransitionError),

	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}
