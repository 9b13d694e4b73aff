//! Outbound ports — post-booking jobs and the clock
//!
//! [`JobQueue`] is the contract for fire-and-forget side effects (emails,
//! payment capture, refunds). The core never waits on it and its
//! correctness never depends on delivery. The in-process implementation is
//! [`EventBus`](crate::application::events::EventBus).

use std::sync::Mutex;

use chrono::{NaiveDate, Utc};

use crate::domain::events::BookingEvent;

/// Queue for post-booking side effects.
pub trait JobQueue: Send + Sync {
    /// Submit an event. Never blocks and never fails towards the caller.
    fn enqueue(&self, event: BookingEvent);
}

/// Source of "today" for range validation and stay completion.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock (UTC calendar date)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Settable clock for tests and replays
#[derive(Debug)]
pub struct FixedClock {
    today: Mutex<NaiveDate>,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
        }
    }

    pub fn set(&self, today: NaiveDate) {
        *self.today.lock().unwrap_or_else(|e| e.into_inner()) = today;
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.today.lock().unwrap_or_else(|e| e.into_inner())
    }
}
