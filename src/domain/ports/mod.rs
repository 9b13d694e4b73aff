//! Ports — interfaces the booking core depends on besides repositories

pub mod outbound;

pub use outbound::{Clock, FixedClock, JobQueue, SystemClock};
