//! Local private-key wallet.
//!
//! Holds a single key in memory and behaves like a browser wallet that has
//! one account: access must be requested once, the active chain can be
//! switched, and switches are broadcast to subscribers.

use crate::{WalletError, WalletInterface};
use alloy::signers::{local::PrivateKeySigner, Signer};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use swap_types::{Address, Bytes, ChainId, TypedDataRequest, WalletEvent};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

const EVENT_CAPACITY: usize = 16;

pub struct LocalWallet {
	signer: PrivateKeySigner,
	chain_id: RwLock<ChainId>,
	connected: AtomicBool,
	/// Chains the wallet accepts switching to. `None` accepts any chain.
	supported_chains: Option<HashSet<ChainId>>,
	events: broadcast::Sender<WalletEvent>,
}

impl LocalWallet {
	/// Creates a wallet from a hex-encoded private key (with or without 0x).
	pub fn new(private_key_hex: &str, chain_id: ChainId) -> Result<Self, WalletError> {
		let signer = private_key_hex
			.trim()
			.parse::<PrivateKeySigner>()
			.map_err(|e| WalletError::InvalidKey(e.to_string()))?;

		Ok(Self::from_signer(signer, chain_id))
	}

	pub fn from_signer(signer: PrivateKeySigner, chain_id: ChainId) -> Self {
		let (events, _) = broadcast::channel(EVENT_CAPACITY);
		Self {
			signer,
			chain_id: RwLock::new(chain_id),
			connected: AtomicBool::new(false),
			supported_chains: None,
			events,
		}
	}

	pub fn with_supported_chains(mut self, chains: impl IntoIterator<Item = ChainId>) -> Self {
		self.supported_chains = Some(chains.into_iter().collect());
		self
	}

	/// Starts with account access already granted.
	pub fn connected(self) -> Self {
		self.connected.store(true, Ordering::SeqCst);
		self
	}

	pub fn address(&self) -> Address {
		self.signer.address()
	}
}

#[async_trait]
impl WalletInterface for LocalWallet {
	async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
		if self.connected.load(Ordering::SeqCst) {
			Ok(vec![self.address()])
		} else {
			Ok(Vec::new())
		}
	}

	async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
		let was_connected = self.connected.swap(true, Ordering::SeqCst);
		if !was_connected {
			let _ = self
				.events
				.send(WalletEvent::AccountsChanged(vec![self.address()]));
		}
		Ok(vec![self.address()])
	}

	async fn chain_id(&self) -> Result<ChainId, WalletError> {
		Ok(*self.chain_id.read().await)
	}

	async fn switch_chain(&self, chain_id: ChainId) -> Result<(), WalletError> {
		if let Some(supported) = &self.supported_chains {
			if !supported.contains(&chain_id) {
				return Err(WalletError::SwitchFailed(format!(
					"chain {} is not supported by this wallet",
					chain_id
				)));
			}
		}

		let mut current = self.chain_id.write().await;
		if *current != chain_id {
			debug!(from = %*current, to = %chain_id, "Switching wallet chain");
			*current = chain_id;
			let _ = self.events.send(WalletEvent::ChainChanged(chain_id));
		}
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
		if !self.connected.load(Ordering::SeqCst) {
			return Err(WalletError::UserRejected(
				"account access has not been granted".to_string(),
			));
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

/// Creates a local wallet starting on `chain_id`.
pub fn create_wallet(
	private_key: &str,
	chain_id: ChainId,
) -> Result<Box<dyn WalletInterface>, WalletError> {
	Ok(Box::new(LocalWallet::new(private_key, chain_id)?))
}
