//! Wallet signer seam.
//!
//! The orchestrator talks to a wallet only through [`WalletInterface`]:
//! account access, the active chain, chain switching, EIP-712 signing and
//! account/chain change notifications.

use async_trait::async_trait;
use std::sync::Arc;
use swap_types::{Address, Bytes, ChainId, TypedDataRequest, WalletEvent};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

pub mod implementations {
	pub mod local;
}

#[derive(Debug, Error)]
pub enum WalletError {
	#[error("No wallet available")]
	NoWallet,
	#[error("Request rejected by user: {0}")]
	UserRejected(String),
	#[error("Chain switch failed: {0}")]
	SwitchFailed(String),
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	#[error("Account {0} is not managed by this wallet")]
	UnknownAccount(Address),
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	#[error("Provider error: {0}")]
	Provider(String),
}

#[async_trait]
pub trait WalletInterface: Send + Sync {
	/// Accounts already authorized for this session. Never prompts.
	async fn accounts(&self) -> Result<Vec<Address>, WalletError>;

	/// Asks the user to authorize account access.
	async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

	async fn chain_id(&self) -> Result<ChainId, WalletError>;

	async fn switch_chain(&self, chain_id: ChainId) -> Result<(), WalletError>;

	/// Signs EIP-712 typed data with `signer`, returning the 65-byte signature.
	async fn sign_typed_data(
		&self,
		request: &TypedDataRequest,
		signer: Address,
	) -> Result<Bytes, WalletError>;

	/// Account and chain change notifications.
	fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}

/// Wallet access used by the swap pipeline.
pub struct WalletService {
	wallet: Arc<dyn WalletInterface>,
}

impl WalletService {
	pub fn new(wallet: Arc<dyn WalletInterface>) -> Self {
		Self { wallet }
	}

	/// Returns the signer account, requesting access when none is authorized.
	pub async fn connect(&self) -> Result<Address, WalletError> {
		let mut accounts = self.wallet.accounts().await?;
		if accounts.is_empty() {
			info!("Requesting wallet account access");
			accounts = self.wallet.request_accounts().await?;
		}

		let account = accounts.first().copied().ok_or(WalletError::NoWallet)?;
		debug!(account = %account, "Wallet connected");
		Ok(account)
	}

	pub async fn chain_id(&self) -> Result<ChainId, WalletError> {
		self.wallet.chain_id().await
	}

	pub async fn switch_chain(&self, chain_id: ChainId) -> Result<(), WalletError> {
		info!(chain_id = %chain_id, "Requesting network switch");
		self.wallet.switch_chain(chain_id).await
	}

	pub async fn sign_permit(
		&self,
		request: &TypedDataRequest,
		owner: Address,
	) -> Result<Bytes, WalletError> {
		self.wallet.sign_typed_data(request, owner).await
	}

	pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
		self.wallet.subscribe()
	}
}
