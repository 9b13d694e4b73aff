//! Application services

mod availability;
mod booking;
mod calendar;
mod completion;
mod listing;

#[cfg(test)]
pub(crate) mod test_support;

pub use availability::AvailabilityChecker;
pub use booking::{BookingRequest, BookingService};
pub use calendar::{CalendarEntry, ListingCalendar};
pub use completion::start_completion_task;
pub use listing::{ListingService, ListingTerms, NewListing};
