//! Reservation lifecycle as an explicit transition table
//!
//! ```text
//!   Pending ──confirm──▶ Confirmed ──complete──▶ Completed
//!      │ │                   │
//!      │ └─cancel─┐          └─cancel─▶ Cancelled
//!      │          ▼
//!      │      Cancelled
//!      └─reject─▶ Rejected
//! ```
//!
//! Guards (availability on confirm, clock on complete, refund on cancel)
//! are evaluated by the booking service before a transition is persisted;
//! this module only answers whether an edge exists.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::model::ReservationStatus;
use crate::shared::errors::{DomainError, DomainResult};

/// Something that happens to a reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationEvent {
    /// Host or system approval
    Confirm,
    /// Host declines the request
    Reject,
    /// Guest or host cancels
    Cancel,
    /// Stay end date has passed
    Complete,
}

impl ReservationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Reject => "reject",
            Self::Cancel => "cancel",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for ReservationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use ReservationEvent as E;
use ReservationStatus as S;

/// Every permitted `(from, event) -> to` edge. Anything absent is illegal.
pub const TRANSITIONS: &[(ReservationStatus, ReservationEvent, ReservationStatus)] = &[
    (S::Pending, E::Confirm, S::Confirmed),
    (S::Pending, E::Reject, S::Rejected),
    (S::Pending, E::Cancel, S::Cancelled),
    (S::Confirmed, E::Cancel, S::Cancelled),
    (S::Confirmed, E::Complete, S::Completed),
];

/// Look up the state reached from `from` on `event`.
pub fn next_status(from: ReservationStatus, event: ReservationEvent) -> DomainResult<ReservationStatus> {
    TRANSITIONS
        .iter()
        .find(|(f, e, _)| *f == from && *e == event)
        .map(|(_, _, to)| *to)
        .ok_or(DomainError::InvalidTransition { from, event })
}

impl ReservationStatus {
    /// Apply `event` to this status.
    pub fn apply(self, event: ReservationEvent) -> DomainResult<ReservationStatus> {
        next_status(self, event)
    }

    /// No edge leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        !TRANSITIONS.iter().any(|(from, _, _)| from == self)
    }
}
