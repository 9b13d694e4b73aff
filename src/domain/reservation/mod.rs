//! Reservation aggregate
//!
//! Contains the Reservation entity, its lifecycle table, and repository interface.

pub mod model;
pub mod repository;
pub mod state_machine;

pub use model::{NewReservation, Reservation, ReservationStatus};
pub use repository::ReservationRepository;
pub use state_machine::{next_status, ReservationEvent, TRANSITIONS};
