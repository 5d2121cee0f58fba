//! Error taxonomy for pipeline steps.

use crate::pipeline::Step;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Kinds of failure a step can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	/// No wallet signer is available.
	NoWallet,
	/// The user denied account access.
	UserRejected,
	/// The wallet is on a different chain and could not be switched.
	ChainMismatch,
	/// The amount is not a positive number of at least one unit.
	InvalidAmount,
	/// The permit nonce moved between fetch and submission.
	NonceStale,
	/// The wallet refused or failed to produce a valid signature.
	SignatureRejected,
	/// The relay intake rejected the permit.
	VerificationRejected,
	/// The relay could not execute the permit.
	RelaySubmissionFailed,
	/// The executor reported a reverted swap.
	ExecutionFailed,
	/// A step exceeded its time bound.
	Timeout,
	/// The relay succeeded but execution never resolved.
	InconsistentState,
}

impl ErrorKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			ErrorKind::NoWallet => "NoWallet",
			ErrorKind::UserRejected => "UserRejected",
			ErrorKind::ChainMismatch => "ChainMismatch",
			ErrorKind::InvalidAmount => "InvalidAmount",
			ErrorKind::NonceStale => "NonceStale",
			ErrorKind::SignatureRejected => "SignatureRejected",
			ErrorKind::VerificationRejected => "VerificationRejected",
			ErrorKind::RelaySubmissionFailed => "RelaySubmissionFailed",
			ErrorKind::ExecutionFailed => "ExecutionFailed",
			ErrorKind::Timeout => "Timeout",
			ErrorKind::InconsistentState => "InconsistentState",
		}
	}
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A failed step with its kind and a human readable cause.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{step} failed with {kind}: {message}")]
pub struct StepFailure {
	pub step: Step,
	pub kind: ErrorKind,
	pub message: String,
}

impl StepFailure {
	pub fn new(step: Step, kind: ErrorKind, message: impl Into<String>) -> Self {
		Self {
			step,
			kind,
			message: message.into(),
		}
	}
}
