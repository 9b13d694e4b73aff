//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod listing_repository;
pub mod repository_provider;
pub mod reservation_repository;

pub use listing_repository::SeaOrmListingRepository;
pub use repository_provider::SeaOrmRepositoryProvider;
pub use reservation_repository::SeaOrmReservationRepository;
