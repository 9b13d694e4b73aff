use thiserror::Error;

use crate::domain::listing::ListingStatus;
use crate::domain::reservation::{ReservationEvent, ReservationStatus};
use crate::domain::stay::StayRange;

#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Listing {listing_id} accepts at most {max_guests} guests, requested {requested}")]
    CapacityExceeded {
        listing_id: i32,
        max_guests: i32,
        requested: i32,
    },

    #[error("Listing {listing_id} is already booked for {conflicting}")]
    AvailabilityConflict {
        listing_id: i32,
        conflicting: StayRange,
    },

    #[error("Cannot {event} a reservation that is {from}")]
    InvalidTransition {
        from: ReservationStatus,
        event: ReservationEvent,
    },

    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Listing {listing_id} is not open for booking (status: {status})")]
    ListingNotBookable {
        listing_id: i32,
        status: ListingStatus,
    },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// A stored row that cannot be turned back into a domain value
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        Self::NotFound {
            entity,
            field: "id",
            value: id.to_string(),
        }
    }

    /// Whether this error is likely transient (e.g. DB connection lost,
    /// writer lock held by a concurrent booking) and the operation may
    /// succeed if retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::Storage(_))
    }

    /// Storage failed or returned data that could not be read
    pub fn is_storage(&self) -> bool {
        matches!(self, DomainError::Storage(_) | DomainError::Corrupt(_))
    }
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metrics exporter error: {0}")]
    Metrics(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Infra(#[from] InfraError),
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_storage_errors_are_transient() {
        assert!(DomainError::Storage("database is locked".into()).is_transient());
        assert!(!DomainError::Validation("bad".into()).is_transient());
        assert!(!DomainError::not_found("Listing", 7).is_transient());
    }

    #[test]
    fn corrupt_rows_are_not_retried() {
        let err = DomainError::Corrupt("reservation 4 has unknown status 'Lost'".into());
        assert!(!err.is_transient());
        assert!(err.is_storage());
    }

    #[test]
    fn conflict_message_names_the_interval() {
        let range = StayRange::parse("2024-01-01", "2024-01-05").unwrap();
        let err = DomainError::AvailabilityConflict {
            listing_id: 3,
            conflicting: range,
        };
        assert_eq!(
            err.to_string(),
            "Listing 3 is already booked for 2024-01-01..2024-01-05"
        );
    }

    #[test]
    fn transition_message_reads_naturally() {
        let err = DomainError::InvalidTransition {
            from: ReservationStatus::Completed,
            event: ReservationEvent::Cancel,
        };
        assert_eq!(err.to_string(), "Cannot cancel a reservation that is Completed");
    }
}
