//! Swap executor seam.
//!
//! Once a permit is relayed, the executor performs the cross-chain swap and
//! reports `pending`, `completed` or `reverted` for the relay task.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use swap_types::{ExecutionReport, ExecutionRequest, ExecutionStatus, TaskId};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod implementations {
	pub mod http;
}

#[derive(Debug, Error)]
pub enum ExecutorError {
	#[error("Rejected by executor: {0}")]
	Rejected(String),
	/// The executor already holds a swap for this task.
	#[error("Swap already submitted for task {0}")]
	Duplicate(TaskId),
	#[error("Network error: {0}")]
	Network(String),
	#[error("Executor returned HTTP {status}: {body}")]
	Http { status: u16, body: String },
	#[error("Invalid executor response: {0}")]
	Decode(String),
}

impl ExecutorError {
	pub fn is_transient(&self) -> bool {
		match self {
			ExecutorError::Network(_) => true,
			ExecutorError::Http { status, .. } => *status >= 500,
			_ => false,
		}
	}
}

#[async_trait]
pub trait ExecutorInterface: Send + Sync {
	async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionReport, ExecutorError>;

	async fn status(&self, task_id: &TaskId) -> Result<ExecutionReport, ExecutorError>;
}

pub struct ExecutorService {
	executor: Arc<dyn ExecutorInterface>,
	poll_interval: Duration,
}

impl ExecutorService {
	pub fn new(executor: Arc<dyn ExecutorInterface>, poll_interval: Duration) -> Self {
		Self {
			executor,
			poll_interval,
		}
	}

	/// Submits a swap. A duplicate submission resolves to the existing swap.
	pub async fn submit(&self, request: &ExecutionRequest) -> Result<ExecutionReport, ExecutorError> {
		match self.executor.execute(request).await {
			Ok(report) => {
				info!(task_id = %request.task_id, status = ?report.status, "Swap submitted to executor");
				Ok(report)
			}
			Err(ExecutorError::Duplicate(task_id)) => {
				debug!(task_id = %task_id, "Executor already holds this swap");
				self.executor.status(&task_id).await
			}
			Err(e) => Err(e),
		}
	}

	/// Polls until the swap is no longer pending.
	pub async fn wait_for_completion(&self, task_id: &TaskId) -> Result<ExecutionReport, ExecutorError> {
		loop {
			match self.executor.status(task_id).await {
				Ok(report) if report.status != ExecutionStatus::Pending => return Ok(report),
				Ok(_) => debug!(task_id = %task_id, "Swap still pending"),
				Err(e) if e.is_transient() => {
					warn!(task_id = %task_id, error = %e, "Executor status poll failed");
				}
				Err(e) => return Err(e),
			}
			tokio::time::sleep(self.poll_interval).await;
		}
	}
}
