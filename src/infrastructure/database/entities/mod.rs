//! Database entities module

pub mod listing;
pub mod reservation;

pub use listing::Entity as Listing;
pub use reservation::Entity as Reservation;
