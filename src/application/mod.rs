//! Application layer: booking use cases, listing management, background
//! tasks and the in-process job queue.

pub mod events;
pub mod services;

pub use events::{create_event_bus, start_notification_worker, EventBus, EventSubscriber, SharedEventBus};
pub use services::{
    start_completion_task, AvailabilityChecker, BookingRequest, BookingService, CalendarEntry,
    ListingCalendar, ListingService, ListingTerms, NewListing,
};
