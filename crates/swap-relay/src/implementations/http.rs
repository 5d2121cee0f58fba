//! HTTP relay client.
//!
//! Endpoints, relative to the configured base URL:
//! - `POST /permits/verify` validates `{permitMessage, domain, signature}`
//! - `POST /permits` submits the same body and answers `{taskId}`
//! - `GET /tasks/{taskId}` reports the task status

use crate::{RelayError, RelayInterface};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use swap_types::{truncate_hex, RelayTaskStatus, SignedPermit, TaskId};
use tracing::debug;

const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Debug, Deserialize)]
struct VerifyResponse {
	valid: bool,
	#[serde(default)]
	reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
	task_id: TaskId,
}

pub struct HttpRelay {
	client: Client,
	base_url: String,
	api_key: Option<String>,
}

impl HttpRelay {
	pub fn new(
		base_url: impl Into<String>,
		api_key: Option<String>,
		timeout: Duration,
	) -> Result<Self, RelayError> {
		let client = Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| RelayError::Network(format!("Failed to build HTTP client: {}", e)))?;

		Ok(Self {
			client,
			base_url: base_url.into().trim_end_matches('/').to_string(),
			api_key,
		})
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
		match &self.api_key {
			Some(key) => request.header(API_KEY_HEADER, key),
			None => request,
		}
	}

	async fn send(&self, request: RequestBuilder) -> Result<Response, RelayError> {
		let response = self
			.authorized(request)
			.send()
			.await
			.map_err(|e| RelayError::Network(e.to_string()))?;

		let status = response.status();
		if status.is_success() {
			return Ok(response);
		}

		let body = response.text().await.unwrap_or_default();
		if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
			return Err(RelayError::Rejected(body));
		}
		Err(RelayError::Http {
			status: status.as_u16(),
			body,
		})
	}
}

#[async_trait]
impl RelayInterface for HttpRelay {
	async fn verify(&self, permit: &SignedPermit) -> Result<(), RelayError> {
		debug!(
			owner = %permit.permit_message.owner,
			signature = %truncate_hex(&permit.signature),
			"Submitting permit for verification"
		);

		let response = self
			.send(self.client.post(self.url("/permits/verify")).json(permit))
			.await?;
		let verdict: VerifyResponse = response
			.json()
			.await
			.map_err(|e| RelayError::Decode(e.to_string()))?;

		if verdict.valid {
			Ok(())
		} else {
			Err(RelayError::Rejected(
				verdict
					.reason
					.unwrap_or_else(|| "permit rejected".to_string()),
			))
		}
	}

	async fn submit(&self, permit: &SignedPermit) -> Result<TaskId, RelayError> {
		let response = self
			.send(self.client.post(self.url("/permits")).json(permit))
			.await?;
		let body: SubmitResponse = response
			.json()
			.await
			.map_err(|e| RelayError::Decode(e.to_string()))?;

		if body.task_id.as_str().is_empty() {
			return Err(RelayError::Decode("empty taskId".to_string()));
		}
		Ok(body.task_id)
	}

	async fn status(&self, task_id: &TaskId) -> Result<RelayTaskStatus, RelayError> {
		let response = self
			.send(self.client.get(self.url(&format!("/tasks/{}", task_id))))
			.await?;
		response
			.json()
			.await
			.map_err(|e| RelayError::Decode(e.to_string()))
	}
}

/// Creates the HTTP relay client.
pub fn create_relay(
	base_url: &str,
	api_key: Option<String>,
	timeout: Duration,
) -> Result<Box<dyn RelayInterface>, RelayError> {
	Ok(Box::new(HttpRelay::new(base_url, api_key, timeout)?))
}
