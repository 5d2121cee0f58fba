//! HTTP swap executor client.
//!
//! `POST /swaps` starts a swap for a relayed task, `GET /swaps/{taskId}`
//! reports its progress. A `409 Conflict` on submission means the task was
//! already handed over.

use crate::{ExecutorError, ExecutorInterface};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use swap_types::{ExecutionReport, ExecutionRequest, TaskId};
use tracing::debug;

const API_KEY_HEADER: &str = "X-API-Key";

pub struct HttpExecutor {
	client: Client,
	base_url: String,
	api_key: Option<String>,
}

impl HttpExecutor {
	pub fn new(
		base_url: impl Into<String>,
		api_key: Option<String>,
		timeout: Duration,
	) -> Result<Self, ExecutorError> {
		let client = Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| ExecutorError::Network(format!("Failed to build HTTP client: {}", e)))?;

		Ok(Self {
			client,
			base_url: base_url.into().trim_end_matches('/').to_string(),
			api_key,
		})
	}

	async fn send(&self, request: RequestBuilder) -> Result<Response, ExecutorError> {
		let request = match &self.api_key {
			Some(key) => request.header(API_KEY_HEADER, key),
			None => request,
		};
		let response = request
			.send()
			.await
			.map_err(|e| ExecutorError::Network(e.to_string()))?;

		let status = response.status();
		if status.is_success() {
			return Ok(response);
		}

		let body = response.text().await.unwrap_or_default();
		match status {
			StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
				Err(ExecutorError::Rejected(body))
			}
			_ => Err(ExecutorError::Http {
				status: status.as_u16(),
				body,
			}),
		}
	}

	async fn report(response: Response) -> Result<ExecutionReport, ExecutorError> {
		response
			.json()
			.await
			.map_err(|e| ExecutorError::Decode(e.to_string()))
	}
}

#[async_trait]
impl ExecutorInterface for HttpExecutor {
	async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionReport, ExecutorError> {
		debug!(
			task_id = %request.task_id,
			dest_chain = %request.dest_chain,
			"Submitting swap"
		);

		let result = self
			.send(self.client.post(format!("{}/swaps", self.base_url)).json(request))
			.await;
		match result {
			Ok(response) => Self::report(response).await,
			Err(ExecutorError::Http { status: 409, .. }) => {
				Err(ExecutorError::Duplicate(request.task_id.clone()))
			}
			Err(e) => Err(e),
		}
	}

	async fn status(&self, task_id: &TaskId) -> Result<ExecutionReport, ExecutorError> {
		let response = self
			.send(
				self.client
					.get(format!("{}/swaps/{}", self.base_url, task_id)),
			)
			.await?;
		Self::report(response).await
	}
}

/// Creates the HTTP executor client.
pub fn create_executor(
	base_url: &str,
	api_key: Option<String>,
	timeout: Duration,
) -> Result<Box<dyn ExecutorInterface>, ExecutorError> {
	Ok(Box::new(HttpExecutor::new(base_url, api_key, timeout)?))
}
