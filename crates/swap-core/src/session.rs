//! Per-session context owned by the orchestrator.

use swap_types::{PermitSupport, SwapIntent};

/// State that lives as long as the wallet session: the single active intent
/// and what is known about the source token's permit support.
///
/// Cleared whenever the wallet reports a different account or chain.
#[derive(Debug, Clone)]
pub struct SessionContext {
	pub intent: Option<SwapIntent>,
	pub permit_support: PermitSupport,
}

impl Default for SessionContext {
	fn default() -> Self {
		Self {
			intent: None,
			permit_support: PermitSupport::Unknown,
		}
	}
}

impl SessionContext {
	pub fn begin(&mut self, intent: SwapIntent) {
		self.intent = Some(intent);
		self.permit_support = PermitSupport::Unknown;
	}

	pub fn reset(&mut self) {
		*self = Self::default();
	}
}
