//! Application events (pub/sub)
//!
//! Event types are defined in `domain::events`. The `EventBus`
//! implementation (broadcast channel) and the worker draining it live here.

pub mod event_bus;
pub mod worker;

pub use event_bus::{create_event_bus, EventBus, EventSubscriber, SharedEventBus};
pub use worker::start_notification_worker;
