//! Booking orchestration
//!
//! Creates reservations and drives them through their lifecycle. Every
//! status change goes through the transition table, is guarded here, and is
//! persisted as a compare-and-set on the previous status so that two
//! concurrent transitions cannot both win.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::availability::AvailabilityChecker;
use crate::domain::events::{BookingEvent, RefundQuote};
use crate::domain::listing::Listing;
use crate::domain::ports::{Clock, JobQueue};
use crate::domain::repositories::RepositoryProvider;
use crate::domain::reservation::{NewReservation, Reservation, ReservationEvent};
use crate::domain::stay::StayRange;
use crate::domain::{DomainError, DomainResult};
use crate::shared::retry::{retry_with_backoff, RetryConfig};

/// A guest's booking attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub listing_id: i32,
    pub guest_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub guest_count: i32,
}

/// Booking orchestrator
pub struct BookingService {
    repos: Arc<dyn RepositoryProvider>,
    availability: AvailabilityChecker,
    jobs: Arc<dyn JobQueue>,
    clock: Arc<dyn Clock>,
    retry: RetryConfig,
}

impl BookingService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        jobs: Arc<dyn JobQueue>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            availability: AvailabilityChecker::new(repos.clone()),
            repos,
            jobs,
            clock,
            retry: RetryConfig::once(Duration::from_millis(50)),
        }
    }

    /// Retry policy for inserts that fail transiently.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn availability(&self) -> &AvailabilityChecker {
        &self.availability
    }

    // ── Create ─────────────────────────────────────────────────

    /// Reserve `[start, end)` on a listing for a guest.
    ///
    /// Instant-booking listings yield a Confirmed reservation, all others a
    /// Pending one. Nothing is stored on error.
    pub async fn create_booking(&self, req: BookingRequest) -> DomainResult<Reservation> {
        let stay = StayRange::new(req.start, req.end)?;
        let today = self.clock.today();
        if stay.start() < today {
            return Err(DomainError::InvalidRange(format!(
                "check-in {} is in the past (today is {})",
                stay.start(),
                today
            )));
        }
        if req.guest_count < 1 {
            return Err(DomainError::Validation(
                "guest_count must be at least 1".to_string(),
            ));
        }
        if req.guest_id.trim().is_empty() {
            return Err(DomainError::Validation("guest_id is required".to_string()));
        }

        let listing = self.load_listing(req.listing_id).await?;
        if !listing.is_bookable() {
            return Err(DomainError::ListingNotBookable {
                listing_id: listing.id,
                status: listing.status,
            });
        }
        if req.guest_count > listing.max_guests {
            return Err(DomainError::CapacityExceeded {
                listing_id: listing.id,
                max_guests: listing.max_guests,
                requested: req.guest_count,
            });
        }

        if let Some(existing) = self.availability.find_conflict(listing.id, &stay, None).await? {
            debug!(
                listing_id = listing.id,
                %stay,
                conflicting_id = existing.id,
                "Requested stay overlaps an existing reservation"
            );
            metrics::counter!("bookings_conflicts_total").increment(1);
            return Err(DomainError::AvailabilityConflict {
                listing_id: listing.id,
                conflicting: existing.stay,
            });
        }

        let new = NewReservation {
            listing_id: listing.id,
            guest_id: req.guest_id,
            stay,
            guest_count: req.guest_count,
            total_price: listing.price_for(stay.nights())?,
            status: NewReservation::initial_status(listing.instant_booking),
        };

        let reservations = self.repos.reservations();
        let pending = &new;
        let inserted = retry_with_backoff(
            self.retry.clone(),
            move || reservations.insert(pending.clone()),
            DomainError::is_transient,
            "insert_reservation",
        )
        .await;

        let id = match inserted {
            Ok(id) => id,
            Err(e) => {
                if matches!(e, DomainError::AvailabilityConflict { .. }) {
                    metrics::counter!("bookings_conflicts_total").increment(1);
                    info!(listing_id = listing.id, %stay, "Lost booking race");
                }
                return Err(e);
            }
        };

        let reservation = new.into_reservation(id);
        metrics::counter!("bookings_created_total", "status" => reservation.status.as_str())
            .increment(1);
        info!(
            reservation_id = reservation.id,
            listing_id = reservation.listing_id,
            guest_id = %reservation.guest_id,
            stay = %reservation.stay,
            status = %reservation.status,
            total_price = %reservation.total_price,
            "Reservation created"
        );

        self.jobs.enqueue(BookingEvent::created(&reservation));
        Ok(reservation)
    }

    // ── Lifecycle ──────────────────────────────────────────────

    /// Host approval of a pending request.
    pub async fn confirm(&self, id: i32) -> DomainResult<Reservation> {
        self.transition(id, ReservationEvent::Confirm).await
    }

    /// Host declines a pending request. The dates are released.
    pub async fn reject(&self, id: i32) -> DomainResult<Reservation> {
        self.transition(id, ReservationEvent::Reject).await
    }

    /// Guest or host cancellation. The dates are released and a refund
    /// quote is attached to the emitted event.
    pub async fn cancel(&self, id: i32) -> DomainResult<Reservation> {
        self.transition(id, ReservationEvent::Cancel).await
    }

    /// Close a confirmed stay whose check-out date has arrived.
    pub async fn complete(&self, id: i32) -> DomainResult<Reservation> {
        self.transition(id, ReservationEvent::Complete).await
    }

    /// Complete every confirmed stay that has ended. Failures are logged
    /// and skipped; returns how many were completed.
    pub async fn complete_due_stays(&self) -> DomainResult<usize> {
        let today = self.clock.today();
        let due = self
            .repos
            .reservations()
            .find_due_for_completion(today)
            .await?;

        if due.is_empty() {
            return Ok(0);
        }
        info!(count = due.len(), %today, "Completing finished stays");

        let mut completed = 0;
        for reservation in due {
            match self.complete(reservation.id).await {
                Ok(_) => completed += 1,
                Err(e) => {
                    warn!(reservation_id = reservation.id, error = %e, "Failed to complete reservation")
                }
            }
        }
        Ok(completed)
    }

    async fn transition(&self, id: i32, event: ReservationEvent) -> DomainResult<Reservation> {
        let mut reservation = self.load(id).await?;
        let from = reservation.status;
        let to = from.apply(event)?;

        let outgoing = match event {
            ReservationEvent::Confirm => {
                if let Some(other) = self
                    .availability
                    .find_conflict(reservation.listing_id, &reservation.stay, Some(id))
                    .await?
                {
                    metrics::counter!("bookings_conflicts_total").increment(1);
                    return Err(DomainError::AvailabilityConflict {
                        listing_id: reservation.listing_id,
                        conflicting: other.stay,
                    });
                }
                BookingEvent::confirmed(&reservation)
            }
            ReservationEvent::Complete => {
                let today = self.clock.today();
                if today < reservation.stay.end() {
                    return Err(DomainError::Validation(format!(
                        "stay {} has not ended yet (today is {})",
                        reservation.stay, today
                    )));
                }
                BookingEvent::ReservationCompleted {
                    reservation_id: id,
                    listing_id: reservation.listing_id,
                    guest_id: reservation.guest_id.clone(),
                }
            }
            ReservationEvent::Cancel => {
                // Quoted against the status before cancellation.
                let listing = self.load_listing(reservation.listing_id).await?;
                BookingEvent::ReservationCancelled {
                    reservation_id: id,
                    listing_id: reservation.listing_id,
                    guest_id: reservation.guest_id.clone(),
                    stay: reservation.stay,
                    refund: RefundQuote::for_cancellation(
                        &reservation,
                        listing.cancellation_policy,
                        self.clock.today(),
                    ),
                }
            }
            ReservationEvent::Reject => BookingEvent::ReservationRejected {
                reservation_id: id,
                listing_id: reservation.listing_id,
                guest_id: reservation.guest_id.clone(),
            },
        };

        let applied = self
            .repos
            .reservations()
            .update_status(id, from, to)
            .await?;
        if !applied {
            let current = self.load(id).await?;
            warn!(
                reservation_id = id,
                expected = %from,
                found = %current.status,
                %event,
                "Reservation changed concurrently"
            );
            return Err(DomainError::InvalidTransition {
                from: current.status,
                event,
            });
        }

        reservation.transition(event)?;
        metrics::counter!(
            "reservation_transitions_total",
            "from" => from.as_str(),
            "to" => to.as_str()
        )
        .increment(1);
        info!(
            reservation_id = id,
            listing_id = reservation.listing_id,
            %from,
            %to,
            %event,
            "Reservation status changed"
        );

        self.jobs.enqueue(outgoing);
        Ok(reservation)
    }

    // ── Reads ──────────────────────────────────────────────────

    pub async fn get(&self, id: i32) -> DomainResult<Reservation> {
        self.load(id).await
    }

    /// Every reservation of a listing, released ones included, by check-in.
    pub async fn list_for_listing(&self, listing_id: i32) -> DomainResult<Vec<Reservation>> {
        self.load_listing(listing_id).await?;
        self.repos
            .reservations()
            .find_for_listing(listing_id, &[])
            .await
    }

    /// A guest's reservations, newest first.
    pub async fn list_for_guest(&self, guest_id: &str) -> DomainResult<Vec<Reservation>> {
        self.repos.reservations().find_for_guest(guest_id).await
    }

    async fn load(&self, id: i32) -> DomainResult<Reservation> {
        self.repos
            .reservations()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", id))
    }

    async fn load_listing(&self, id: i32) -> DomainResult<Listing> {
        self.repos
            .listings()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Listing", id))
    }
}
