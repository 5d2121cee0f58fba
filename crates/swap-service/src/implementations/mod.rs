//! Concrete implementations wired from configuration.
//!
//! Each submodule turns a config section into the trait object the
//! orchestrator builder expects.

/// Local private-key wallet.
pub mod account;
/// Swap executor HTTP client.
pub mod executor;
/// Relay HTTP client.
pub mod relay;
/// Intent history backends (memory, file).
pub mod storage;
/// ERC-20 balance and permit nonce reader.
pub mod token;
