//! Repository traits for the domain layer
//!
//! Contains:
//! - `RepositoryProvider` — unified access to all per-aggregate repositories
//! - `DomainResult` — standard result type for domain operations

use super::listing::ListingRepository;
use super::reservation::ReservationRepository;

pub use crate::shared::errors::DomainResult;

// ── RepositoryProvider ──────────────────────────────────────────

/// Provides access to all domain repositories.
///
/// Consumers request only the repository they need:
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let listing = repos.listings().find_by_id(7).await?;
///     let booked = repos.reservations().find_for_listing(7, &ReservationStatus::RELEASED).await?;
/// }
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn listings(&self) -> &dyn ListingRepository;
    fn reservations(&self) -> &dyn ReservationRepository;
}
