//! Relay service seam.
//!
//! The relay validates signed permits at its intake endpoint, executes them
//! on the origin chain and reports task progress.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use swap_types::{RelayTaskStatus, SignedPermit, TaskId};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod implementations {
	pub mod http;
}

#[derive(Debug, Error)]
pub enum RelayError {
	/// The relay refused the permit (bad signature, expired, nonce mismatch).
	#[error("Rejected by relay: {0}")]
	Rejected(String),
	#[error("Network error: {0}")]
	Network(String),
	#[error("Relay returned HTTP {status}: {body}")]
	Http { status: u16, body: String },
	#[error("Invalid relay response: {0}")]
	Decode(String),
}

impl RelayError {
	/// Whether the request may succeed if sent again.
	pub fn is_transient(&self) -> bool {
		match self {
			RelayError::Network(_) => true,
			RelayError::Http { status, .. } => *status >= 500,
			_ => false,
		}
	}
}

#[async_trait]
pub trait RelayInterface: Send + Sync {
	/// Intake validation of a signed permit.
	async fn verify(&self, permit: &SignedPermit) -> Result<(), RelayError>;

	/// Hands the permit over for on-chain execution.
	async fn submit(&self, permit: &SignedPermit) -> Result<TaskId, RelayError>;

	async fn status(&self, task_id: &TaskId) -> Result<RelayTaskStatus, RelayError>;
}

pub struct RelayService {
	relay: Arc<dyn RelayInterface>,
	poll_interval: Duration,
	verify_retries: u32,
}

impl RelayService {
	pub fn new(relay: Arc<dyn RelayInterface>, poll_interval: Duration) -> Self {
		Self {
			relay,
			poll_interval,
			verify_retries: 1,
		}
	}

	pub fn with_verify_retries(mut self, retries: u32) -> Self {
		self.verify_retries = retries;
		self
	}

	/// Validates a permit, retrying transient network failures only.
	pub async fn verify(&self, permit: &SignedPermit) -> Result<(), RelayError> {
		let mut attempt = 0;
		loop {
			match self.relay.verify(permit).await {
				Ok(()) => return Ok(()),
				Err(e) if e.is_transient() && attempt < self.verify_retries => {
					attempt += 1;
					warn!(attempt, error = %e, "Permit verification failed, retrying");
					tokio::time::sleep(self.poll_interval).await;
				}
				Err(e) => return Err(e),
			}
		}
	}

	pub async fn submit(&self, permit: &SignedPermit) -> Result<TaskId, RelayError> {
		let task_id = self.relay.submit(permit).await?;
		info!(task_id = %task_id, "Permit accepted by relay");
		Ok(task_id)
	}

	pub async fn status(&self, task_id: &TaskId) -> Result<RelayTaskStatus, RelayError> {
		self.relay.status(task_id).await
	}

	/// Polls a task until the relay reports `confirmed` or `failed`.
	///
	/// Transient errors are logged and polled through; callers bound the
	/// wait with their own timeout.
	pub async fn wait_for_confirmation(
		&self,
		task_id: &TaskId,
	) -> Result<RelayTaskStatus, RelayError> {
		loop {
			match self.relay.status(task_id).await {
				Ok(status) if status.status.is_terminal() => return Ok(status),
				Ok(status) => {
					debug!(task_id = %task_id, status = ?status.status, "Relay task pending");
				}
				Err(e) if e.is_transient() => {
					warn!(task_id = %task_id, error = %e, "Relay status poll failed");
				}
				Err(e) => return Err(e),
			}
			tokio::time::sleep(self.poll_interval).await;
		}
	}
}
