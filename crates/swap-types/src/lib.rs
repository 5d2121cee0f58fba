//! Shared domain types for the gasless swap client.
//!
//! Every crate in the workspace speaks in these types: chain identifiers,
//! token registry entries, permit payloads, swap intents, pipeline step
//! status and the error taxonomy attached to failed steps.

pub mod chains;
pub mod common;
pub mod errors;
pub mod events;
pub mod intent;
pub mod permit;
pub mod pipeline;
pub mod relay;
pub mod token;

pub use chains::*;
pub use common::*;
pub use errors::*;
pub use events::*;
pub use intent::*;
pub use permit::*;
pub use pipeline::*;
pub use relay::*;
pub use token::*;
