//! In-memory repository implementations

mod memory;

pub use memory::{InMemoryListingRepository, InMemoryRepositoryProvider, InMemoryReservationRepository};
