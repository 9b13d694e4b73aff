//! Listing domain entity

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, DomainResult};

/// Upper bound on a nightly rate, in whole currency units
pub const MAX_NIGHTLY_PRICE: i64 = 1_000_000;

/// Listing publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingStatus {
    /// Being prepared by the host, not visible
    Draft,
    /// Visible and bookable
    Published,
    /// Hidden by the host
    Inactive,
    /// Disabled by an administrator
    Suspended,
    /// Waiting for moderation
    UnderReview,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Published => "Published",
            Self::Inactive => "Inactive",
            Self::Suspended => "Suspended",
            Self::UnderReview => "UnderReview",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Draft" => Some(Self::Draft),
            "Published" => Some(Self::Published),
            "Inactive" => Some(Self::Inactive),
            "Suspended" => Some(Self::Suspended),
            "UnderReview" => Some(Self::UnderReview),
            _ => None,
        }
    }

    pub fn accepts_bookings(&self) -> bool {
        matches!(self, Self::Published)
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Host-selected cancellation policy.
///
/// The booking core only carries the policy; the refund it yields is
/// handed to the payments side together with the cancellation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancellationPolicy {
    Flexible,
    Moderate,
    Strict,
    NonRefundable,
}

impl CancellationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flexible => "Flexible",
            Self::Moderate => "Moderate",
            Self::Strict => "Strict",
            Self::NonRefundable => "NonRefundable",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Flexible" => Some(Self::Flexible),
            "Moderate" => Some(Self::Moderate),
            "Strict" => Some(Self::Strict),
            "NonRefundable" => Some(Self::NonRefundable),
            _ => None,
        }
    }

    /// Refund share (percent) for a cancellation on `today` of a stay
    /// starting on `check_in`.
    pub fn refund_percent(&self, today: NaiveDate, check_in: NaiveDate) -> u32 {
        let days_before = (check_in - today).num_days();
        match self {
            Self::Flexible if days_before >= 1 => 100,
            Self::Flexible => 0,
            Self::Moderate if days_before >= 5 => 100,
            Self::Moderate => 50,
            Self::Strict if days_before >= 14 => 100,
            Self::Strict if days_before >= 7 => 50,
            Self::Strict => 0,
            Self::NonRefundable => 0,
        }
    }
}

impl std::fmt::Display for CancellationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the listing is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A rentable property unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: i32,
    pub host_id: String,
    pub title: String,
    pub location: Location,
    pub nightly_price: Decimal,
    pub currency: String,
    /// Maximum number of guests per reservation
    pub max_guests: i32,
    /// Skip host approval: new reservations start Confirmed
    pub instant_booking: bool,
    pub cancellation_policy: CancellationPolicy,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Price of a stay of `nights` nights at the current nightly rate.
    pub fn price_for(&self, nights: i64) -> DomainResult<Decimal> {
        self.nightly_price
            .checked_mul(Decimal::from(nights))
            .ok_or_else(|| {
                DomainError::Validation(format!(
                    "price of {} nights at {} is out of range",
                    nights, self.nightly_price
                ))
            })
    }

    pub fn is_bookable(&self) -> bool {
        self.status.accepts_bookings()
    }
}

/// Partial change of booking terms. `None` leaves the column alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermsUpdate {
    pub nightly_price: Option<Decimal>,
    pub max_guests: Option<i32>,
    pub instant_booking: Option<bool>,
    pub cancellation_policy: Option<CancellationPolicy>,
}

impl TermsUpdate {
    pub fn apply_to(&self, listing: &mut Listing) {
        if let Some(price) = self.nightly_price {
            listing.nightly_price = price;
        }
        if let Some(max) = self.max_guests {
            listing.max_guests = max;
        }
        if let Some(instant) = self.instant_booking {
            listing.instant_booking = instant;
        }
        if let Some(policy) = self.cancellation_policy {
            listing.cancellation_policy = policy;
        }
    }
}
