//! Booking event types

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::listing::CancellationPolicy;
use crate::domain::reservation::{Reservation, ReservationStatus};
use crate::domain::stay::StayRange;

/// What the payments side should refund after a cancellation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundQuote {
    pub policy: CancellationPolicy,
    pub percent: u32,
    pub amount: Decimal,
}

impl RefundQuote {
    /// Quote a refund for cancelling `reservation` on `today`.
    ///
    /// Nothing has been captured for a Pending reservation, so it is always
    /// refunded in full.
    pub fn for_cancellation(
        reservation: &Reservation,
        policy: CancellationPolicy,
        today: NaiveDate,
    ) -> Self {
        let percent = match reservation.status {
            ReservationStatus::Pending => 100,
            _ => policy.refund_percent(today, reservation.stay.start()),
        };
        let amount = (reservation.total_price / Decimal::ONE_HUNDRED * Decimal::from(percent))
            .round_dp(2);
        Self {
            policy,
            percent,
            amount,
        }
    }
}

/// Post-booking events handed to the job queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BookingEvent {
    /// A reservation was created and waits for host approval
    ReservationRequested {
        reservation_id: i32,
        listing_id: i32,
        guest_id: String,
        stay: StayRange,
    },
    /// A reservation was confirmed (approval or instant booking)
    ReservationConfirmed {
        reservation_id: i32,
        listing_id: i32,
        guest_id: String,
        stay: StayRange,
        total_price: Decimal,
    },
    /// The host declined a pending request
    ReservationRejected {
        reservation_id: i32,
        listing_id: i32,
        guest_id: String,
    },
    /// A reservation was cancelled; dates are free again
    ReservationCancelled {
        reservation_id: i32,
        listing_id: i32,
        guest_id: String,
        stay: StayRange,
        refund: RefundQuote,
    },
    /// The stay is over
    ReservationCompleted {
        reservation_id: i32,
        listing_id: i32,
        guest_id: String,
    },
}

impl BookingEvent {
    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ReservationRequested { .. } => "reservation_requested",
            Self::ReservationConfirmed { .. } => "reservation_confirmed",
            Self::ReservationRejected { .. } => "reservation_rejected",
            Self::ReservationCancelled { .. } => "reservation_cancelled",
            Self::ReservationCompleted { .. } => "reservation_completed",
        }
    }

    pub fn reservation_id(&self) -> i32 {
        match self {
            Self::ReservationRequested { reservation_id, .. }
            | Self::ReservationConfirmed { reservation_id, .. }
            | Self::ReservationRejected { reservation_id, .. }
            | Self::ReservationCancelled { reservation_id, .. }
            | Self::ReservationCompleted { reservation_id, .. } => *reservation_id,
        }
    }

    pub fn listing_id(&self) -> i32 {
        match self {
            Self::ReservationRequested { listing_id, .. }
            | Self::ReservationConfirmed { listing_id, .. }
            | Self::ReservationRejected { listing_id, .. }
            | Self::ReservationCancelled { listing_id, .. }
            | Self::ReservationCompleted { listing_id, .. } => *listing_id,
        }
    }

    /// The event announcing that `reservation` was just created.
    pub fn created(reservation: &Reservation) -> Self {
        match reservation.status {
            ReservationStatus::Confirmed => Self::confirmed(reservation),
            _ => Self::ReservationRequested {
                reservation_id: reservation.id,
                listing_id: reservation.listing_id,
                guest_id: reservation.guest_id.clone(),
                stay: reservation.stay,
            },
        }
    }

    pub fn confirmed(reservation: &Reservation) -> Self {
        Self::ReservationConfirmed {
            reservation_id: reservation.id,
            listing_id: reservation.listing_id,
            guest_id: reservation.guest_id.clone(),
            stay: reservation.stay,
            total_price: reservation.total_price,
        }
    }
}

/// Envelope carried by the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: BookingEvent,
}

impl EventMessage {
    pub fn new(event: BookingEvent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reservation::NewReservation;

    fn reservation(status: ReservationStatus) -> Reservation {
        NewReservation {
            listing_id: 4,
            guest_id: "guest-9".into(),
            stay: StayRange::parse("2024-06-10", "2024-06-14").unwrap(),
            guest_count: 2,
            total_price: Decimal::new(50000, 2),
            status,
        }
        .into_reservation(21)
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn pending_cancellation_is_fully_refunded() {
        let r = reservation(ReservationStatus::Pending);
        let quote =
            RefundQuote::for_cancellation(&r, CancellationPolicy::NonRefundable, date("2024-06-09"));
        assert_eq!(quote.percent, 100);
        assert_eq!(quote.amount, Decimal::new(50000, 2));
    }

    #[test]
    fn confirmed_cancellation_follows_policy() {
        let r = reservation(ReservationStatus::Confirmed);
        let quote =
            RefundQuote::for_cancellation(&r, CancellationPolicy::Moderate, date("2024-06-08"));
        assert_eq!(quote.percent, 50);
        assert_eq!(quote.amount, Decimal::new(25000, 2));
    }

    #[test]
    fn created_event_depends_on_initial_status() {
        let pending = reservation(ReservationStatus::Pending);
        assert_eq!(BookingEvent::created(&pending).event_type(), "reservation_requested");

        let confirmed = reservation(ReservationStatus::Confirmed);
        let event = BookingEvent::created(&confirmed);
        assert_eq!(event.event_type(), "reservation_confirmed");
        assert_eq!(event.reservation_id(), 21);
        assert_eq!(event.listing_id(), 4);
    }

    #[test]
    fn message_serializes_with_type_tag() {
        let msg = EventMessage::new(BookingEvent::ReservationCompleted {
            reservation_id: 1,
            listing_id: 2,
            guest_id: "g".into(),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "ReservationCompleted");
        assert_eq!(json["data"]["reservation_id"], 1);
        assert!(json["id"].is_string());
    }
}
