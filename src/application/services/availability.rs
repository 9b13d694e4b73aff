//! Availability checks against a listing's calendar

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::warn;

use crate::domain::repositories::RepositoryProvider;
use crate::domain::reservation::{Reservation, ReservationStatus};
use crate::domain::stay::StayRange;
use crate::domain::{DomainError, DomainResult};

/// Answers whether a listing is free for a date range.
///
/// Read-only. The answer is advisory: the insert at the persistence
/// boundary re-checks under its own lock.
#[derive(Clone)]
pub struct AvailabilityChecker {
    repos: Arc<dyn RepositoryProvider>,
}

impl AvailabilityChecker {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// `true` iff no date-holding reservation overlaps `[start, end)`.
    ///
    /// A failing reservation lookup reports the listing as unavailable.
    pub async fn is_available(
        &self,
        listing_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DomainResult<bool> {
        let range = StayRange::new(start, end)?;

        if self.repos.listings().find_by_id(listing_id).await?.is_none() {
            return Err(DomainError::not_found("Listing", listing_id));
        }

        match self.find_conflict(listing_id, &range, None).await {
            Ok(conflict) => Ok(conflict.is_none()),
            Err(e) if e.is_storage() => {
                warn!(listing_id, %range, error = %e, "Availability lookup failed, reporting unavailable");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// First date-holding reservation overlapping `range`, skipping the
    /// reservation `ignore`.
    pub async fn find_conflict(
        &self,
        listing_id: i32,
        range: &StayRange,
        ignore: Option<i32>,
    ) -> DomainResult<Option<Reservation>> {
        let booked = self
            .repos
            .reservations()
            .find_for_listing(listing_id, &ReservationStatus::RELEASED)
            .await?;

        Ok(booked
            .into_iter()
            .filter(|r| Some(r.id) != ignore)
            .find(|r| r.holds_dates() && r.stay.overlaps(range)))
    }
}
