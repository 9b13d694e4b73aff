//! Domain layer: listings, reservations, their lifecycle, and the ports the
//! booking core talks to.

pub mod events;
pub mod listing;
pub mod ports;
pub mod repositories;
pub mod reservation;
pub mod stay;

// Re-export commonly used types
pub use events::{BookingEvent, EventMessage, RefundQuote};
pub use listing::{CancellationPolicy, Listing, ListingRepository, ListingStatus, Location};
pub use ports::{Clock, FixedClock, JobQueue, SystemClock};
pub use repositories::{DomainResult, RepositoryProvider};
pub use reservation::{
    NewReservation, Reservation, ReservationEvent, ReservationRepository, ReservationStatus,
};
pub use stay::StayRange;

// Re-export DomainError from shared for convenience
pub use crate::shared::errors::DomainError;
