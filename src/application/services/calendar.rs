//! Listing calendar: the occupied side of a listing's dates

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::repositories::RepositoryProvider;
use crate::domain::reservation::ReservationStatus;
use crate::domain::stay::StayRange;
use crate::domain::{DomainError, DomainResult};

/// One occupied interval
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEntry {
    pub reservation_id: i32,
    pub status: ReservationStatus,
    pub stay: StayRange,
}

pub struct ListingCalendar {
    repos: Arc<dyn RepositoryProvider>,
}

impl ListingCalendar {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Date-holding reservations ordered by check-in. With a `window`, only
    /// the part of each stay inside it is returned.
    pub async fn occupied(
        &self,
        listing_id: i32,
        window: Option<StayRange>,
    ) -> DomainResult<Vec<CalendarEntry>> {
        if self.repos.listings().find_by_id(listing_id).await?.is_none() {
            return Err(DomainError::not_found("Listing", listing_id));
        }

        let booked = self
            .repos
            .reservations()
            .find_for_listing(listing_id, &ReservationStatus::RELEASED)
            .await?;

        let mut entries: Vec<CalendarEntry> = booked
            .into_iter()
            .filter(|r| r.holds_dates())
            .filter_map(|r| {
                let stay = match window {
                    Some(w) => r.stay.clip(&w)?,
                    None => r.stay,
                };
                Some(CalendarEntry {
                    reservation_id: r.id,
                    status: r.status,
                    stay,
                })
            })
            .collect();
        entries.sort_by_key(|e| (e.stay.start(), e.reservation_id));
        Ok(entries)
    }

    /// Every occupied night, ascending.
    pub async fn blocked_nights(
        &self,
        listing_id: i32,
        window: Option<StayRange>,
    ) -> DomainResult<Vec<NaiveDate>> {
        let entries = self.occupied(listing_id, window).await?;
        Ok(entries
            .iter()
            .flat_map(|e| e.stay.iter_nights().collect::<Vec<_>>())
            .collect())
    }
}
