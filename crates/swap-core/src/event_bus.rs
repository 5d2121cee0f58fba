//! Broadcast channel for swap progress notifications.

use swap_types::SwapEvent;
use tokio::sync::broadcast;

/// Fan-out of [`SwapEvent`]s to any number of observers.
///
/// Slow subscribers lose the oldest events once `capacity` is exceeded.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<SwapEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<SwapEvent> {
		self.sender.subscribe()
	}

	/// Publishes to current subscribers. Fails only when nobody listens.
	pub fn publish(&self, event: SwapEvent) -> Result<(), broadcast::error::SendError<SwapEvent>> {
		self.sender.send(event)?;
		Ok(())
	}
}
