//! Token registry entries and amount conversion.

use crate::common::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metadata for a token in the per-chain registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
	/// Display symbol, e.g. "USDC".
	pub symbol: String,
	/// Full token name, e.g. "USD Coin".
	pub name: String,
	/// Number of decimals of the smallest unit.
	pub decimals: u8,
	/// Optional logo URL used by front ends.
	#[serde(default)]
	pub logo: Option<String>,
}

impl TokenInfo {
	/// Label used when listing tokens: `USDC - USD Coin`.
	pub fn label(&self) -> String {
		format!("{} - {}", self.symbol, self.name)
	}
}

/// Whether the source token implements the permit nonce scheme.
///
/// An unsupported token is a capability limitation, not a pipeline failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermitSupport {
	/// Not checked yet.
	Unknown,
	/// `nonces(owner)` answered with the given nonce.
	Supported { nonce: U256 },
	/// `nonces(owner)` failed; the token likely lacks EIP-2612.
	Unsupported { reason: String },
}

/// Errors produced when converting a user-entered amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
	#[error("amount is empty")]
	Empty,
	#[error("amount '{0}' is not a decimal number")]
	Malformed(String),
	#[error("amount must be greater than zero")]
	Zero,
	#[error("amount '{amount}' is smaller than one unit at {decimals} decimals")]
	BelowMinimumUnit { amount: String, decimals: u8 },
	#[error("amount '{0}' does not fit in 256 bits")]
	Overflow(String),
}

/// Converts a decimal amount string to the token's smallest unit.
///
/// Computes `floor(amount * 10^decimals)`. Fractional digits beyond the
/// token's precision are truncated. The result is always at least one unit.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, AmountError> {
	let amount = amount.trim();
	if amount.is_empty() {
		return Err(AmountError::Empty);
	}

	let (int_part, frac_part) = amount.split_once('.').unwrap_or((amount, ""));
	let well_formed = !(int_part.is_empty() && frac_part.is_empty())
		&& int_part.chars().all(|c| c.is_ascii_digit())
		&& frac_part.chars().all(|c| c.is_ascii_digit());
	if !well_formed {
		return Err(AmountError::Malformed(amount.to_string()));
	}

	let is_zero = int_part
		.chars()
		.chain(frac_part.chars())
		.all(|c| c == '0');
	if is_zero {
		return Err(AmountError::Zero);
	}

	let precision = decimals as usize;
	let mut digits = String::with_capacity(int_part.len() + precision);
	digits.push_str(int_part);
	digits.extend(frac_part.chars().take(precision));
	for _ in frac_part.len().min(precision)..precision {
		digits.push('0');
	}

	let digits = digits.trim_start_matches('0');
	if digits.is_empty() {
		return Err(AmountError::BelowMinimumUnit {
			amount: amount.to_string(),
			decimals,
		});
	}

	U256::from_str_radix(digits, 10).map_err(|_| AmountError::Overflow(amount.to_string()))
}

/// Formats a raw amount with a fixed number of fractional digits.
///
/// Digits beyond `precision` are truncated, never rounded up.
pub fn format_amount(raw: U256, decimals: u8, precision: usize) -> String {
	let digits = raw.to_string();
	let scale = decimals as usize;

	let (int_part, frac_part) = if digits.len() > scale {
		let split = digits.len() - scale;
		(digits[..split].to_string(), digits[split..].to_string())
	} else {
		("0".to_string(), format!("{:0>width$}", digits, width = scale))
	};

	if precision == 0 {
		return int_part;
	}

	let mut frac: String = frac_part.chars().take(precision).collect();
	while frac.len() < precision {
		frac.push('0');
	}
	format!("{}.{}", int_part, frac)
}
