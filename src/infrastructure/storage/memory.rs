//! In-memory repositories for development and testing
//!
//! Reservations are grouped per listing. Every write to a listing's
//! calendar happens while holding that listing's DashMap entry, which makes
//! the overlap check and the insert one atomic step per listing.

use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;

use crate::domain::listing::{Listing, ListingRepository, ListingStatus, TermsUpdate};
use crate::domain::repositories::RepositoryProvider;
use crate::domain::reservation::{
    NewReservation, Reservation, ReservationRepository, ReservationStatus,
};
use crate::domain::{DomainError, DomainResult};

// ── Listings ────────────────────────────────────────────────────

pub struct InMemoryListingRepository {
    listings: DashMap<i32, Listing>,
    counter: AtomicI32,
}

impl InMemoryListingRepository {
    pub fn new() -> Self {
        Self {
            listings: DashMap::new(),
            counter: AtomicI32::new(1),
        }
    }
}

impl Default for InMemoryListingRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ListingRepository for InMemoryListingRepository {
    async fn save(&self, mut listing: Listing) -> DomainResult<Listing> {
        listing.id = self.counter.fetch_add(1, Ordering::SeqCst);
        self.listings.insert(listing.id, listing.clone());
        Ok(listing)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Listing>> {
        Ok(self.listings.get(&id).map(|l| l.clone()))
    }

    async fn update_status(&self, id: i32, status: ListingStatus) -> DomainResult<()> {
        let mut listing = self
            .listings
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Listing", id))?;
        listing.status = status;
        listing.updated_at = Utc::now();
        Ok(())
    }

    async fn update_terms(&self, id: i32, terms: &TermsUpdate) -> DomainResult<()> {
        let mut listing = self
            .listings
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Listing", id))?;
        terms.apply_to(&mut listing);
        listing.updated_at = Utc::now();
        Ok(())
    }

    async fn find_all(&self) -> DomainResult<Vec<Listing>> {
        let mut all: Vec<Listing> = self.listings.iter().map(|l| l.clone()).collect();
        all.sort_by_key(|l| l.id);
        Ok(all)
    }
}

// ── Reservations ────────────────────────────────────────────────

pub struct InMemoryReservationRepository {
    /// listing id -> that listing's reservations, in insertion order
    calendars: DashMap<i32, Vec<Reservation>>,
    /// reservation id -> listing id
    index: DashMap<i32, i32>,
    counter: AtomicI32,
}

impl InMemoryReservationRepository {
    pub fn new() -> Self {
        Self {
            calendars: DashMap::new(),
            index: DashMap::new(),
            counter: AtomicI32::new(1),
        }
    }

    fn collect_sorted(&self, mut found: Vec<Reservation>) -> Vec<Reservation> {
        found.sort_by_key(|r| (r.stay.start(), r.id));
        found
    }
}

impl Default for InMemoryReservationRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn insert(&self, new: NewReservation) -> DomainResult<i32> {
        let mut calendar = self.calendars.entry(new.listing_id).or_default();

        if let Some(existing) = calendar
            .iter()
            .filter(|r| r.holds_dates())
            .find(|r| r.stay.overlaps(&new.stay))
        {
            return Err(DomainError::AvailabilityConflict {
                listing_id: new.listing_id,
                conflicting: existing.stay,
            });
        }

        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        let listing_id = new.listing_id;
        calendar.push(new.into_reservation(id));
        self.index.insert(id, listing_id);
        Ok(id)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Reservation>> {
        let Some(listing_id) = self.index.get(&id).map(|l| *l) else {
            return Ok(None);
        };
        Ok(self
            .calendars
            .get(&listing_id)
            .and_then(|cal| cal.iter().find(|r| r.id == id).cloned()))
    }

    async fn find_for_listing(
        &self,
        listing_id: i32,
        exclude: &[ReservationStatus],
    ) -> DomainResult<Vec<Reservation>> {
        let found = self
            .calendars
            .get(&listing_id)
            .map(|cal| {
                cal.iter()
                    .filter(|r| !exclude.contains(&r.status))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(self.collect_sorted(found))
    }

    async fn find_for_guest(&self, guest_id: &str) -> DomainResult<Vec<Reservation>> {
        let mut found: Vec<Reservation> = self
            .calendars
            .iter()
            .flat_map(|cal| {
                cal.value()
                    .iter()
                    .filter(|r| r.guest_id == guest_id)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        found.sort_by_key(|r| std::cmp::Reverse(r.id));
        Ok(found)
    }

    async fn find_due_for_completion(&self, today: NaiveDate) -> DomainResult<Vec<Reservation>> {
        let mut found: Vec<Reservation> = self
            .calendars
            .iter()
            .flat_map(|cal| {
                cal.value()
                    .iter()
                    .filter(|r| r.status == ReservationStatus::Confirmed && r.stay.end() <= today)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        found.sort_by_key(|r| (r.stay.end(), r.id));
        Ok(found)
    }

    async fn update_status(
        &self,
        id: i32,
        from: ReservationStatus,
        to: ReservationStatus,
    ) -> DomainResult<bool> {
        let listing_id = self
            .index
            .get(&id)
            .map(|l| *l)
            .ok_or_else(|| DomainError::not_found("Reservation", id))?;
        let mut calendar = self
            .calendars
            .get_mut(&listing_id)
            .ok_or_else(|| DomainError::not_found("Reservation", id))?;
        let reservation = calendar
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| DomainError::not_found("Reservation", id))?;

        if reservation.status != from {
            return Ok(false);
        }
        reservation.status = to;
        reservation.updated_at = Utc::now();
        Ok(true)
    }
}

// ── Provider ────────────────────────────────────────────────────

/// Repository provider backed by process memory
#[derive(Default)]
pub struct InMemoryRepositoryProvider {
    listings: InMemoryListingRepository,
    reservations: InMemoryReservationRepository,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
    fn listings(&self) -> &dyn ListingRepository {
        &self.listings
    }

    fn reservations(&self) -> &dyn ReservationRepository {
        &self.reservations
    }
}
