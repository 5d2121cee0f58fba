//! EIP-2612 permit payloads and EIP-712 typed-data signing.
//!
//! The permit is signed as structured typed data with the primary type
//!
//! ```text
//! Permit(address owner,address spender,uint256 value,uint256 nonce,uint256 deadline)
//! ```
//!
//! under a configurable domain (name, version, chain id, verifying contract).

use crate::chains::ChainId;
use crate::common::{Address, Bytes, Timestamp, B256, U256};
use alloy::primitives::Signature;
use alloy::sol;
use alloy::sol_types::{Eip712Domain, SolStruct};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use thiserror::Error;

sol! {
	/// On-chain layout of an EIP-2612 permit.
	#[derive(Debug, PartialEq, Eq)]
	struct Permit {
		address owner;
		address spender;
		uint256 value;
		uint256 nonce;
		uint256 deadline;
	}
}

/// Canonical EIP-712 type string of the permit.
pub const PERMIT_TYPE: &str =
	"Permit(address owner,address spender,uint256 value,uint256 nonce,uint256 deadline)";

/// Errors raised while handling permit signatures.
#[derive(Debug, Error)]
pub enum PermitError {
	#[error("invalid signature: {0}")]
	InvalidSignature(String),
	#[error("signature recovery failed: {0}")]
	Recovery(String),
	#[error("permit signed by {actual}, expected {expected}")]
	WrongSigner { expected: Address, actual: Address },
}

/// EIP-712 signing domain for permits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitDomain {
	pub name: String,
	pub version: String,
	pub chain_id: ChainId,
	pub verifying_contract: Address,
}

impl PermitDomain {
	/// Converts to the alloy domain used for hashing.
	pub fn to_eip712(&self) -> Eip712Domain {
		Eip712Domain::new(
			Some(Cow::Owned(self.name.clone())),
			Some(Cow::Owned(self.version.clone())),
			Some(U256::from(self.chain_id.0)),
			Some(self.verifying_contract),
			None,
		)
	}
}

/// The `(owner, spender, value, nonce, deadline)` tuple a signature covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitMessage {
	pub owner: Address,
	pub spender: Address,
	pub value: U256,
	pub nonce: U256,
	pub deadline: Timestamp,
}

impl PermitMessage {
	pub fn to_sol(&self) -> Permit {
		Permit {
			owner: self.owner,
			spender: self.spender,
			value: self.value,
			nonce: self.nonce,
			deadline: U256::from(self.deadline),
		}
	}

	/// EIP-712 digest that the wallet signs.
	pub fn signing_hash(&self, domain: &PermitDomain) -> B256 {
		self.to_sol().eip712_signing_hash(&domain.to_eip712())
	}

	pub fn is_expired(&self, now: Timestamp) -> bool {
		self.deadline < now
	}
}

/// A typed-data signing request as handed to a wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedDataRequest {
	pub domain: PermitDomain,
	pub message: PermitMessage,
}

impl TypedDataRequest {
	pub fn new(domain: PermitDomain, message: PermitMessage) -> Self {
		Self { domain, message }
	}

	pub fn signing_hash(&self) -> B256 {
		self.message.signing_hash(&self.domain)
	}
}

/// A permit together with the signature that covers it.
///
/// The signature never travels without the exact tuple it was produced for,
/// so it cannot be attached to a different permit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPermit {
	pub permit_message: PermitMessage,
	pub domain: PermitDomain,
	pub signature: Bytes,
}

impl SignedPermit {
	pub fn new(permit_message: PermitMessage, domain: PermitDomain, signature: Bytes) -> Self {
		Self {
			permit_message,
			domain,
			signature,
		}
	}

	pub fn signing_hash(&self) -> B256 {
		self.permit_message.signing_hash(&self.domain)
	}

	/// Whether this signature covers exactly the given tuple.
	pub fn covers(&self, message: &PermitMessage) -> bool {
		&self.permit_message == message
	}

	fn parse_signature(&self) -> Result<Signature, PermitError> {
		if self.signature.len() != 65 {
			return Err(PermitError::InvalidSignature(format!(
				"expected 65 bytes, got {}",
				self.signature.len()
			)));
		}

		Signature::try_from(self.signature.as_ref())
			.map_err(|e| PermitError::InvalidSignature(e.to_string()))
	}

	/// Recovers the address that produced the signature.
	pub fn recover_signer(&self) -> Result<Address, PermitError> {
		let signature = self.parse_signature()?;
		signature
			.recover_address_from_prehash(&self.signing_hash())
			.map_err(|e| PermitError::Recovery(e.to_string()))
	}

	/// Checks that the permit owner produced the signature.
	pub fn verify_owner(&self) -> Result<(), PermitError> {
		let signer = self.recover_signer()?;
		if signer != self.permit_message.owner {
			return Err(PermitError::WrongSigner {
				expected: self.permit_message.owner,
				actual: signer,
			});
		}
		Ok(())
	}
}
