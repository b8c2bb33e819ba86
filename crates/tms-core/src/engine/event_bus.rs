//! Broadcast channel carrying [`TmsEvent`]s between the engine's handlers
//! and any interested subscriber.

use tms_types::TmsEvent;
use tokio::sync::broadcast;

/// Cloneable handle to the engine's event channel.
///
/// Publishing never blocks. Subscribers that fall more than `capacity`
/// events behind lose the oldest ones.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<TmsEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<TmsEvent> {
		self.sender.subscribe()
	}

	/// Sends `event` to every current subscriber and returns how many
	/// received it. Fails only when nobody is subscribed.
	pub fn publish(
		&self,
		event: TmsEvent,
	) -> Result<usize, broadcast::error::SendError<TmsEvent>> {
		self.sender.send(event)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tms_types::MovementEvent;

	#[tokio::test]
	async fn test_publish_reaches_subscribers() {
		let bus = EventBus::new(8);
		assert!(bus
			.publish(TmsEvent::Movement(MovementEvent::Saved {
				movement_id: "m0".into()
			}))
			.is_err());

		let mut first = bus.subscribe();
		let mut second = bus.clone().subscribe();
		let delivered = bus
			.publish(TmsEvent::Movement(MovementEvent::Saved {
				movement_id: "m1".into(),
			}))
			.unwrap();
		assert_eq!(delivered, 2);

		for receiver in [&mut first, &mut second] {
			match receiver.recv().await.unwrap() {
				TmsEvent::Movement(MovementEvent::Saved { movement_id }) => {
					assert_eq!(movement_id, "m1")
				},
				other => panic!("unexpected event {:?}", other),
			}
		}
	}
}
