//! Shared fixtures and doubles for service tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use super::booking::{BookingRequest, BookingService};
use crate::domain::events::BookingEvent;
use crate::domain::listing::{
    CancellationPolicy, Listing, ListingRepository, ListingStatus, Location,
};
use crate::domain::ports::{FixedClock, JobQueue};
use crate::domain::repositories::RepositoryProvider;
use crate::domain::reservation::{
    NewReservation, Reservation, ReservationRepository, ReservationStatus,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::storage::{
    InMemoryListingRepository, InMemoryRepositoryProvider, InMemoryReservationRepository,
};
use crate::shared::retry::RetryConfig;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Published listing, 4 guests, 100.00 EUR a night, Moderate policy.
pub fn listing(instant_booking: bool) -> Listing {
    let now = Utc::now();
    Listing {
        id: 0,
        host_id: "host-1".into(),
        title: "Cabin near the lake".into(),
        location: Location {
            address: "Seestrasse 4".into(),
            city: "Zurich".into(),
            country: "CH".into(),
            latitude: 47.36,
            longitude: 8.54,
        },
        nightly_price: Decimal::new(10000, 2),
        currency: "EUR".into(),
        max_guests: 4,
        instant_booking,
        cancellation_policy: CancellationPolicy::Moderate,
        status: ListingStatus::Published,
        created_at: now,
        updated_at: now,
    }
}

pub fn request(listing_id: i32, start: &str, end: &str) -> BookingRequest {
    BookingRequest {
        listing_id,
        guest_id: "guest-1".into(),
        start: date(start),
        end: date(end),
        guest_count: 2,
    }
}

/// Job queue that remembers what it was given
#[derive(Default)]
pub struct RecordingQueue {
    events: Mutex<Vec<BookingEvent>>,
}

impl RecordingQueue {
    pub fn events(&self) -> Vec<BookingEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn types(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.event_type()).collect()
    }
}

impl JobQueue for RecordingQueue {
    fn enqueue(&self, event: BookingEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// A booking service wired to in-test collaborators. Today is 2023-12-01.
pub struct Harness {
    pub repos: Arc<dyn RepositoryProvider>,
    pub jobs: Arc<RecordingQueue>,
    pub clock: Arc<FixedClock>,
    pub service: Arc<BookingService>,
}

impl Harness {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        let jobs = Arc::new(RecordingQueue::default());
        let clock = Arc::new(FixedClock::new(date("2023-12-01")));
        let service = Arc::new(
            BookingService::new(repos.clone(), jobs.clone(), clock.clone())
                .with_retry(RetryConfig::once(std::time::Duration::from_millis(1))),
        );
        Self {
            repos,
            jobs,
            clock,
            service,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRepositoryProvider::new()))
    }

    pub async fn add_listing(&self, listing: Listing) -> Listing {
        self.repos.listings().save(listing).await.unwrap()
    }
}

/// Provider with real in-memory listings and a scripted reservation store
pub struct ScriptedProvider<R> {
    pub listings: InMemoryListingRepository,
    pub reservations: R,
}

impl<R: ReservationRepository> ScriptedProvider<R> {
    pub fn new(reservations: R) -> Self {
        Self {
            listings: InMemoryListingRepository::new(),
            reservations,
        }
    }
}

impl<R: ReservationRepository> RepositoryProvider for ScriptedProvider<R> {
    fn listings(&self) -> &dyn ListingRepository {
        &self.listings
    }

    fn reservations(&self) -> &dyn ReservationRepository {
        &self.reservations
    }
}

/// Reservation store whose database is down
pub struct BrokenReservations;

fn down() -> DomainError {
    DomainError::Storage("connection refused".into())
}

#[async_trait]
impl ReservationRepository for BrokenReservations {
    async fn insert(&self, _: NewReservation) -> DomainResult<i32> {
        Err(down())
    }
    async fn find_by_id(&self, _: i32) -> DomainResult<Option<Reservation>> {
        Err(down())
    }
    async fn find_for_listing(
        &self,
        _: i32,
        _: &[ReservationStatus],
    ) -> DomainResult<Vec<Reservation>> {
        Err(down())
    }
    async fn find_for_guest(&self, _: &str) -> DomainResult<Vec<Reservation>> {
        Err(down())
    }
    async fn find_due_for_completion(&self, _: NaiveDate) -> DomainResult<Vec<Reservation>> {
        Err(down())
    }
    async fn update_status(
        &self,
        _: i32,
        _: ReservationStatus,
        _: ReservationStatus,
    ) -> DomainResult<bool> {
        Err(down())
    }
}

/// In-memory store whose first insert fails with a busy error.
///
/// With `commit_first` the failing insert is still written, like a commit
/// whose acknowledgement was lost.
pub struct FlakyReservations {
    pub inner: InMemoryReservationRepository,
    failures_left: Mutex<u32>,
    commit_first: bool,
}

impl FlakyReservations {
    pub fn new(commit_first: bool) -> Self {
        Self {
            inner: InMemoryReservationRepository::new(),
            failures_left: Mutex::new(1),
            commit_first,
        }
    }

    fn should_fail(&self) -> bool {
        let mut left = self.failures_left.lock().unwrap();
        if *left > 0 {
            *left -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl ReservationRepository for FlakyReservations {
    async fn insert(&self, r: NewReservation) -> DomainResult<i32> {
        if self.should_fail() {
            if self.commit_first {
                self.inner.insert(r).await?;
            }
            return Err(DomainError::Storage("database is locked".into()));
        }
        self.inner.insert(r).await
    }
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Reservation>> {
        self.inner.find_by_id(id).await
    }
    async fn find_for_listing(
        &self,
        listing_id: i32,
        exclude: &[ReservationStatus],
    ) -> DomainResult<Vec<Reservation>> {
        self.inner.find_for_listing(listing_id, exclude).await
    }
    async fn find_for_guest(&self, guest_id: &str) -> DomainResult<Vec<Reservation>> {
        self.inner.find_for_guest(guest_id).await
    }
    async fn find_due_for_completion(&self, today: NaiveDate) -> DomainResult<Vec<Reservation>> {
        self.inner.find_due_for_completion(today).await
    }
    async fn update_status(
        &self,
        id: i32,
        from: ReservationStatus,
        to: ReservationStatus,
    ) -> DomainResult<bool> {
        self.inner.update_status(id, from, to).await
    }
}
