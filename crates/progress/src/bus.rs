//! Grounded on the teacher's `Page::console_tx: broadcast::Sender<ConsoleMessage>`
//! (one broadcast lane per source, bounded, slow-consumer-drops-oldest) and
//! `handlers::Subscription` (RAII unregister via a weak reference back into
//! the owning map).

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use automation_protocol::progress::ProgressEvent;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Per-subscriber channel capacity. A subscriber lagging past this many
/// unread events starts silently missing the oldest ones (spec.md §4.6:
/// "overflow drops oldest with a warning").
const LANE_CAPACITY: usize = 256;

struct Lane {
	tx: broadcast::Sender<ProgressEvent>,
	subscriber_count: usize,
}

#[derive(Default)]
pub struct ProgressBus {
	lanes: Mutex<HashMap<Uuid, Lane>>,
	latest_by_job: Mutex<HashMap<Uuid, ProgressEvent>>,
}

impl ProgressBus {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Publishes `event` to every subscriber of `user_id` and updates the
	/// cached latest-event-per-job used by the polling progress endpoint.
	pub fn publish(&self, user_id: Uuid, event: ProgressEvent) {
		self.latest_by_job.lock().insert(event.job_id, event.clone());

		let mut lanes = self.lanes.lock();
		let lane = lanes.entry(user_id).or_insert_with(|| Lane {
			tx: broadcast::channel(LANE_CAPACITY).0,
			subscriber_count: 0,
		});
		// No receivers is not an error: publishing before anyone subscribes
		// is normal (e.g. a job started before the WS client connects).
		let _ = lane.tx.send(event);
	}

	/// Returns the most recently published event for `job_id`, if any. Backs
	/// the polling-style `GET /work-orders/scrape/progress/{user_id}`
	/// endpoint, which doesn't want to hold a subscription open.
	pub fn latest(&self, job_id: Uuid) -> Option<ProgressEvent> {
		self.latest_by_job.lock().get(&job_id).cloned()
	}

	pub fn subscribe(self: &Arc<Self>, user_id: Uuid) -> (Subscription, broadcast::Receiver<ProgressEvent>) {
		let mut lanes = self.lanes.lock();
		let lane = lanes.entry(user_id).or_insert_with(|| Lane {
			tx: broadcast::channel(LANE_CAPACITY).0,
			subscriber_count: 0,
		});
		lane.subscriber_count += 1;
		let receiver = lane.tx.subscribe();
		drop(lanes);

		(
			Subscription {
				user_id,
				bus: Arc::downgrade(self),
			},
			receiver,
		)
	}
}

/// RAII unregister handle. Decrements the lane's subscriber count on drop
/// and removes the lane entirely once the last subscriber is gone.
pub struct Subscription {
	user_id: Uuid,
	bus: Weak<ProgressBus>,
}

impl Drop for Subscription {
	fn drop(&mut self) {
		let Some(bus) = self.bus.upgrade() else {
			return;
		};
		let mut lanes = bus.lanes.lock();
		if let Some(lane) = lanes.get_mut(&self.user_id) {
			lane.subscriber_count = lane.subscriber_count.saturating_sub(1);
			if lane.subscriber_count == 0 {
				lanes.remove(&self.user_id);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use automation_protocol::progress::Phase;

	fn event(job_id: Uuid) -> ProgressEvent {
		ProgressEvent::new(job_id, Phase::new(Phase::NAVIGATION), 10, "navigating")
	}

	#[tokio::test]
	async fn subscriber_receives_published_events_in_order() {
		let bus = ProgressBus::new();
		let user_id = Uuid::new_v4();
		let job_id = Uuid::new_v4();
		let (_sub, mut rx) = bus.subscribe(user_id);

		bus.publish(user_id, event(job_id));
		bus.publish(user_id, event(job_id));

		let first = rx.recv().await.unwrap();
		let second = rx.recv().await.unwrap();
		assert_eq!(first.job_id, job_id);
		assert_eq!(second.job_id, job_id);
	}

	#[tokio::test]
	async fn latest_reflects_the_most_recent_event_for_a_job() {
		let bus = ProgressBus::new();
		let user_id = Uuid::new_v4();
		let job_id = Uuid::new_v4();

		assert!(bus.latest(job_id).is_none());
		bus.publish(user_id, event(job_id));
		assert_eq!(bus.latest(job_id).unwrap().job_id, job_id);
	}

	#[tokio::test]
	async fn dropping_the_last_subscription_removes_the_lane() {
		let bus = ProgressBus::new();
		let user_id = Uuid::new_v4();
		let (sub, rx) = bus.subscribe(user_id);
		assert_eq!(bus.lanes.lock().len(), 1);
		drop(rx);
		drop(sub);
		assert_eq!(bus.lanes.lock().len(), 0);
	}

	#[tokio::test]
	async fn independent_users_do_not_see_each_others_events() {
		let bus = ProgressBus::new();
		let user_a = Uuid::new_v4();
		let user_b = Uuid::new_v4();
		let (_sub_a, mut rx_a) = bus.subscribe(user_a);
		let (_sub_b, mut rx_b) = bus.subscribe(user_b);

		bus.publish(user_a, event(Uuid::new_v4()));

		assert!(rx_a.try_recv().is_ok());
		assert!(rx_b.try_recv().is_err());
	}
}
