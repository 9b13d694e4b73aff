//! Domain events
//!
//! Facts about what happened to a reservation. They are the payloads of the
//! post-booking jobs (guest/host notifications, payment capture, refunds).
//! The EventBus implementation lives in `application::events`.

pub mod types;

pub use types::{BookingEvent, EventMessage, RefundQuote};
