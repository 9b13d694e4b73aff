//! Event bus for post-booking jobs
//!
//! A tokio broadcast channel carrying [`EventMessage`]s. The bus is the
//! in-process [`JobQueue`]: the booking service enqueues and moves on,
//! workers subscribe and consume.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::domain::events::{BookingEvent, EventMessage};
use crate::domain::ports::JobQueue;

const DEFAULT_CAPACITY: usize = 1024;

/// Event bus for broadcasting booking events to all subscribers
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventMessage>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            subscriber_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn publish(&self, event: BookingEvent) {
        let message = EventMessage::new(event);
        let event_type = message.event.event_type();
        let reservation_id = message.event.reservation_id();

        match self.sender.send(message) {
            Ok(count) => {
                debug!(
                    event_type,
                    reservation_id,
                    subscribers = count,
                    "Event published"
                );
            }
            Err(_) => {
                debug!(event_type, reservation_id, "Event published (no subscribers)");
            }
        }
    }

    pub fn subscribe(&self) -> EventSubscriber {
        let receiver = self.sender.subscribe();
        let count = self.subscriber_count.fetch_add(1, Ordering::SeqCst) + 1;
        info!(total = count, "New event subscriber");

        EventSubscriber {
            receiver,
            subscriber_count: self.subscriber_count.clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriber_count.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue for EventBus {
    fn enqueue(&self, event: BookingEvent) {
        self.publish(event);
    }
}

/// Event subscriber that receives events from the bus
pub struct EventSubscriber {
    receiver: broadcast::Receiver<EventMessage>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventSubscriber {
    /// Next message, skipping over anything lost to lag.
    /// `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<EventMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(missed = count, "Subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return None;
                }
            }
        }
    }
}

impl Drop for EventSubscriber {
    fn drop(&mut self) {
        let prev = self.subscriber_count.fetch_sub(1, Ordering::SeqCst);
        info!(remaining = prev.saturating_sub(1), "Event subscriber disconnected");
    }
}

/// Shared event bus type
pub type SharedEventBus = Arc<EventBus>;

/// Create a shared event bus
pub fn create_event_bus(capacity: usize) -> SharedEventBus {
    Arc::new(EventBus::with_capacity(capacity))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(id: i32) -> BookingEvent {
        BookingEvent::ReservationCompleted {
            reservation_id: id,
            listing_id: 1,
            guest_id: "guest-1".into(),
        }
    }

    #[tokio::test]
    async fn enqueue_reaches_every_subscriber() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.enqueue(completed(5));

        assert_eq!(a.recv().await.unwrap().event.reservation_id(), 5);
        assert_eq!(b.recv().await.unwrap().event.reservation_id(), 5);
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_harmless() {
        let bus = EventBus::with_capacity(4);
        bus.publish(completed(1));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn dropped_subscriber_is_counted_out() {
        let bus = EventBus::new();
        let sub = bus.subscribe();
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_to_newest() {
        let bus = EventBus::with_capacity(2);
        let mut sub = bus.subscribe();
        for id in 1..=5 {
            bus.publish(completed(id));
        }
        let first = sub.recv().await.unwrap();
        assert!(first.event.reservation_id() >= 4);
    }

    #[tokio::test]
    async fn recv_ends_when_bus_is_gone() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        drop(bus);
        assert!(sub.recv().await.is_none());
    }
}
