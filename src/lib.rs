//! # StayHub booking core
//!
//! Reservation lifecycle and availability engine for a short-term rental
//! marketplace.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: listings, reservations, stay ranges, the reservation
//!   transition table, booking events and the ports the core talks to
//! - **application**: booking and listing use cases, availability checks,
//!   the listing calendar, the completion sweeper and the event bus
//! - **infrastructure**: SeaORM persistence (SQLite by default) and an
//!   in-memory adapter
//! - **service**: runtime wiring, tracing and metrics setup, shutdown
//! - **shared**: errors, retry and shutdown helpers

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod service;
pub mod shared;

pub use config::{default_config_path, AppConfig};

// Re-export database types for easy access
pub use infrastructure::{
    init_database, DatabaseConfig, InMemoryRepositoryProvider, SeaOrmRepositoryProvider,
};

pub use application::{
    create_event_bus, BookingRequest, BookingService, EventBus, ListingCalendar, ListingService,
    SharedEventBus,
};
pub use domain::{DomainError, DomainResult, Reservation, ReservationStatus, StayRange};
