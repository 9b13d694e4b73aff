//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::listing::ListingRepository;
use crate::domain::repositories::RepositoryProvider;
use crate::domain::reservation::ReservationRepository;

use super::listing_repository::SeaOrmListingRepository;
use super::reservation_repository::SeaOrmReservationRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let listing = repos.listings().find_by_id(7).await?;
/// let booked = repos.reservations().find_for_listing(7, &ReservationStatus::RELEASED).await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    listings: SeaOrmListingRepository,
    reservations: SeaOrmReservationRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            listings: SeaOrmListingRepository::new(db.clone()),
            reservations: SeaOrmReservationRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn listings(&self) -> &dyn ListingRepository {
        &self.listings
    }

    fn reservations(&self) -> &dyn ReservationRepository {
        &self.reservations
    }
}
