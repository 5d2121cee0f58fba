//! Common types used throughout the swap client.

// Re-export commonly used ethereum types
pub use alloy::primitives::{Address, Bytes, B256, U256};

/// Timestamp (Unix seconds)
pub type Timestamp = u64;

/// Current Unix time in seconds.
pub fn now_secs() -> Timestamp {
	chrono::Utc::now().timestamp().max(0) as Timestamp
}

/// Shortens an address for display, e.g. `0x1234...abcd`.
pub fn short_address(address: &Address) -> String {
	let full = address.to_string();
	format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

/// Renders the first bytes of a signature or hash for log lines.
pub fn truncate_hex(bytes: &[u8]) -> String {
	let encoded = hex::encode(bytes);
	if encoded.len() <= 8 {
		format!("0x{}", encoded)
	} else {
		format!("0x{}...", &encoded[..8])
	}
}
