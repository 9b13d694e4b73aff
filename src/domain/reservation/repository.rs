//! Reservation repository interface

use async_trait::async_trait;
use chrono::NaiveDate;

use super::model::{NewReservation, Reservation, ReservationStatus};
use crate::domain::DomainResult;

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Insert a new reservation and return its id.
    ///
    /// Implementations must re-check the listing's calendar and insert under
    /// one serialization boundary (transaction, advisory lock or per-listing
    /// lock). If a holding reservation overlaps `reservation.stay`, nothing
    /// is written and `DomainError::AvailabilityConflict` is returned.
    async fn insert(&self, reservation: NewReservation) -> DomainResult<i32>;

    /// Find reservation by ID
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Reservation>>;

    /// All reservations of a listing whose status is not in `exclude`,
    /// ordered by check-in date
    async fn find_for_listing(
        &self,
        listing_id: i32,
        exclude: &[ReservationStatus],
    ) -> DomainResult<Vec<Reservation>>;

    /// All reservations made by a guest, newest first
    async fn find_for_guest(&self, guest_id: &str) -> DomainResult<Vec<Reservation>>;

    /// Confirmed reservations whose check-out date is on or before `today`
    async fn find_due_for_completion(&self, today: NaiveDate) -> DomainResult<Vec<Reservation>>;

    /// Compare-and-set the status of a reservation.
    ///
    /// Returns `false` without writing when the stored status is no longer
    /// `from` (a concurrent transition won). Unknown ids fail with `NotFound`.
    async fn update_status(
        &self,
        id: i32,
        from: ReservationStatus,
        to: ReservationStatus,
    ) -> DomainResult<bool>;
}
