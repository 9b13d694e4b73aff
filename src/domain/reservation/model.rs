//! Reservation domain entity

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::state_machine::ReservationEvent;
use crate::domain::stay::StayRange;
use crate::domain::DomainResult;

/// Reservation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    /// Waiting for host approval; dates are already held
    Pending,
    /// Approved (or instant-booked)
    Confirmed,
    /// Cancelled by guest or host
    Cancelled,
    /// Stay is over
    Completed,
    /// Declined by the host
    Rejected,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Cancelled => "Cancelled",
            Self::Completed => "Completed",
            Self::Rejected => "Rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(Self::Pending),
            "Confirmed" => Some(Self::Confirmed),
            "Cancelled" => Some(Self::Cancelled),
            "Completed" => Some(Self::Completed),
            "Rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Whether a reservation in this status occupies its dates.
    pub fn holds_dates(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::Rejected)
    }

    /// Statuses that never block a calendar.
    pub const RELEASED: [ReservationStatus; 2] = [Self::Cancelled, Self::Rejected];

    /// Statuses that block a calendar.
    pub const HOLDING: [ReservationStatus; 3] = [Self::Pending, Self::Confirmed, Self::Completed];
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A guest's claim on a listing for a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i32,
    pub listing_id: i32,
    pub guest_id: String,
    pub stay: StayRange,
    pub guest_count: i32,
    /// Nights × nightly price at booking time
    pub total_price: Decimal,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Move to the next status through the transition table.
    ///
    /// Returns the status the reservation had before. On error the
    /// reservation is left untouched.
    pub fn transition(&mut self, event: ReservationEvent) -> DomainResult<ReservationStatus> {
        let next = self.status.apply(event)?;
        let previous = std::mem::replace(&mut self.status, next);
        self.updated_at = Utc::now();
        Ok(previous)
    }

    pub fn holds_dates(&self) -> bool {
        self.status.holds_dates()
    }
}

/// A reservation that has not been stored yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewReservation {
    pub listing_id: i32,
    pub guest_id: String,
    pub stay: StayRange,
    pub guest_count: i32,
    pub total_price: Decimal,
    pub status: ReservationStatus,
}

impl NewReservation {
    /// Initial status: instant-booking listings skip the approval step.
    pub fn initial_status(instant_booking: bool) -> ReservationStatus {
        if instant_booking {
            ReservationStatus::Confirmed
        } else {
            ReservationStatus::Pending
        }
    }

    /// Materialize with the id assigned by the store.
    pub fn into_reservation(self, id: i32) -> Reservation {
        let now = Utc::now();
        Reservation {
            id,
            listing_id: self.listing_id,
            guest_id: self.guest_id,
            stay: self.stay,
            guest_count: self.guest_count,
            total_price: self.total_price,
            status: self.status,
            created_at: now,
            updated_at: now,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────
