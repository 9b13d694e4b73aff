//! Host-side listing management

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::domain::listing::{
    CancellationPolicy, Listing, ListingStatus, Location, TermsUpdate, MAX_NIGHTLY_PRICE,
};
use crate::domain::repositories::RepositoryProvider;
use crate::domain::{DomainError, DomainResult};

fn positive_price(price: &Decimal) -> Result<(), ValidationError> {
    if !price.is_sign_positive() || price.is_zero() {
        return Err(ValidationError::new("positive")
            .with_message("nightly_price must be positive".into()));
    }
    if *price > Decimal::from(MAX_NIGHTLY_PRICE) {
        return Err(ValidationError::new("range")
            .with_message(format!("nightly_price must not exceed {}", MAX_NIGHTLY_PRICE).into()));
    }
    Ok(())
}

fn valid_location(location: &Location) -> Result<(), ValidationError> {
    if location.city.trim().is_empty() || location.country.trim().is_empty() {
        return Err(ValidationError::new("location")
            .with_message("city and country are required".into()));
    }
    if !(-90.0..=90.0).contains(&location.latitude)
        || !(-180.0..=180.0).contains(&location.longitude)
    {
        return Err(ValidationError::new("location")
            .with_message("coordinates out of range".into()));
    }
    Ok(())
}

/// Flatten validator output into one readable message.
fn validation_message(errors: ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let msg = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{}: {}", field, msg)
            })
        })
        .collect();
    messages.sort();

    if messages.is_empty() {
        "validation failed".to_string()
    } else {
        messages.join("; ")
    }
}

/// Input for a new listing
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewListing {
    #[validate(length(min = 1, message = "host_id is required"))]
    pub host_id: String,
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    #[validate(custom(function = "valid_location"))]
    pub location: Location,
    #[validate(custom(function = "positive_price"))]
    pub nightly_price: Decimal,
    #[validate(length(equal = 3, message = "currency must be an ISO 4217 code"))]
    pub currency: String,
    #[validate(range(min = 1, max = 50, message = "max_guests must be 1-50"))]
    pub max_guests: i32,
    pub instant_booking: bool,
    pub cancellation_policy: CancellationPolicy,
}

/// Booking terms a host may change on a live listing. Absent fields are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ListingTerms {
    #[validate(custom(function = "positive_price"))]
    pub nightly_price: Option<Decimal>,
    #[validate(range(min = 1, max = 50, message = "max_guests must be 1-50"))]
    pub max_guests: Option<i32>,
    pub instant_booking: Option<bool>,
    pub cancellation_policy: Option<CancellationPolicy>,
}

impl From<ListingTerms> for TermsUpdate {
    fn from(terms: ListingTerms) -> Self {
        Self {
            nightly_price: terms.nightly_price,
            max_guests: terms.max_guests,
            instant_booking: terms.instant_booking,
            cancellation_policy: terms.cancellation_policy,
        }
    }
}

pub struct ListingService {
    repos: Arc<dyn RepositoryProvider>,
}

impl ListingService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Create a listing in `Draft`.
    pub async fn create_listing(&self, input: NewListing) -> DomainResult<Listing> {
        input
            .validate()
            .map_err(|e| DomainError::Validation(validation_message(e)))?;

        let now = Utc::now();
        let listing = Listing {
            id: 0,
            host_id: input.host_id,
            title: input.title.trim().to_string(),
            location: input.location,
            nightly_price: input.nightly_price,
            currency: input.currency.to_uppercase(),
            max_guests: input.max_guests,
            instant_booking: input.instant_booking,
            cancellation_policy: input.cancellation_policy,
            status: ListingStatus::Draft,
            created_at: now,
            updated_at: now,
        };

        let saved = self.repos.listings().save(listing).await?;
        info!(listing_id = saved.id, host_id = %saved.host_id, "Listing created");
        Ok(saved)
    }

    /// Publish, hide, suspend or send to review. Existing reservations are
    /// untouched; only new bookings depend on the status.
    ///
    /// Only the status column is written, so a concurrent terms change
    /// cannot undo it.
    pub async fn set_status(&self, id: i32, status: ListingStatus) -> DomainResult<Listing> {
        let listing = self.get(id).await?;
        let previous = listing.status;
        if previous == status {
            return Ok(listing);
        }

        self.repos.listings().update_status(id, status).await?;
        info!(listing_id = id, from = %previous, to = %status, "Listing status changed");
        self.get(id).await
    }

    /// Change booking terms. Applies to future bookings only.
    pub async fn update_terms(&self, id: i32, terms: ListingTerms) -> DomainResult<Listing> {
        terms
            .validate()
            .map_err(|e| DomainError::Validation(validation_message(e)))?;

        self.repos
            .listings()
            .update_terms(id, &TermsUpdate::from(terms))
            .await?;
        let listing = self.get(id).await?;
        info!(
            listing_id = id,
            nightly_price = %listing.nightly_price,
            max_guests = listing.max_guests,
            instant_booking = listing.instant_booking,
            "Listing terms updated"
        );
        Ok(listing)
    }

    pub async fn get(&self, id: i32) -> DomainResult<Listing> {
        self.repos
            .listings()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Listing", id))
    }

    pub async fn list(&self) -> DomainResult<Vec<Listing>> {
        self.repos.listings().find_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::{request, Harness};

    fn input() -> NewListing {
        NewListing {
            host_id: "host-3".into(),
            title: "  Studio with balcony ".into(),
            location: Location {
                address: "Rua Augusta 10".into(),
                city: "Lisbon".into(),
                country: "PT".into(),
                latitude: 38.71,
                longitude: -9.14,
            },
            nightly_price: Decimal::new(8500, 2),
            currency: "eur".into(),
            max_guests: 2,
            instant_booking: false,
            cancellation_policy: CancellationPolicy::Flexible,
        }
    }

    #[tokio::test]
    async fn new_listing_starts_as_draft() {
        let h = Harness::in_memory();
        let service = ListingService::new(h.repos.clone());

        let listing = service.create_listing(input()).await.unwrap();
        assert_eq!(listing.status, ListingStatus::Draft);
        assert_eq!(listing.title, "Studio with balcony");
        assert_eq!(listing.currency, "EUR");
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_with_field_names() {
        let h = Harness::in_memory();
        let service = ListingService::new(h.repos.clone());

        let mut bad = input();
        bad.title = String::new();
        bad.max_guests = 0;
        bad.nightly_price = Decimal::ZERO;

        match service.create_listing(bad).await {
            Err(DomainError::Validation(msg)) => {
                assert!(msg.contains("title"), "{msg}");
                assert!(msg.contains("max_guests"), "{msg}");
                assert!(msg.contains("nightly_price"), "{msg}");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bad_coordinates_are_rejected() {
        let h = Harness::in_memory();
        let service = ListingService::new(h.repos.clone());
        let mut bad = input();
        bad.location.latitude = 123.0;
        assert!(matches!(
            service.create_listing(bad).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn publishing_opens_the_listing_for_booking() {
        let h = Harness::in_memory();
        let service = ListingService::new(h.repos.clone());
        let listing = service.create_listing(input()).await.unwrap();

        assert!(matches!(
            h.service
                .create_booking(request(listing.id, "2024-01-01", "2024-01-03"))
                .await,
            Err(DomainError::ListingNotBookable { .. })
        ));

        service
            .set_status(listing.id, ListingStatus::Published)
            .await
            .unwrap();
        h.service
            .create_booking(request(listing.id, "2024-01-01", "2024-01-03"))
            .await
            .unwrap();

        service
            .set_status(listing.id, ListingStatus::Suspended)
            .await
            .unwrap();
        assert!(matches!(
            h.service
                .create_booking(request(listing.id, "2024-02-01", "2024-02-03"))
                .await,
            Err(DomainError::ListingNotBookable {
                status: ListingStatus::Suspended,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn terms_apply_to_future_bookings_only() {
        let h = Harness::in_memory();
        let service = ListingService::new(h.repos.clone());
        let listing = service.create_listing(input()).await.unwrap();
        service
            .set_status(listing.id, ListingStatus::Published)
            .await
            .unwrap();

        let before = h
            .service
            .create_booking(request(listing.id, "2024-01-01", "2024-01-03"))
            .await
            .unwrap();

        let updated = service
            .update_terms(
                listing.id,
                ListingTerms {
                    nightly_price: Some(Decimal::new(10000, 2)),
                    instant_booking: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.max_guests, 2);

        let after = h
            .service
            .create_booking(request(listing.id, "2024-02-01", "2024-02-03"))
            .await
            .unwrap();

        assert_eq!(before.total_price, Decimal::new(17000, 2));
        assert_eq!(after.total_price, Decimal::new(20000, 2));
        assert_eq!(h.service.get(before.id).await.unwrap().total_price, before.total_price);
        assert_eq!(after.status, crate::domain::ReservationStatus::Confirmed);
    }

    #[tokio::test]
    async fn invalid_terms_change_nothing() {
        let h = Harness::in_memory();
        let service = ListingService::new(h.repos.clone());
        let listing = service.create_listing(input()).await.unwrap();

        let err = service
            .update_terms(
                listing.id,
                ListingTerms {
                    max_guests: Some(99),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(service.get(listing.id).await.unwrap().max_guests, 2);
    }

    #[tokio::test]
    async fn absurd_prices_are_rejected() {
        let h = Harness::in_memory();
        let service = ListingService::new(h.repos.clone());

        let mut bad = input();
        bad.nightly_price = Decimal::MAX / Decimal::TWO;
        match service.create_listing(bad).await {
            Err(DomainError::Validation(msg)) => assert!(msg.contains("nightly_price"), "{msg}"),
            other => panic!("expected validation error, got {other:?}"),
        }

        let listing = service.create_listing(input()).await.unwrap();
        let err = service
            .update_terms(
                listing.id,
                ListingTerms {
                    nightly_price: Some(Decimal::from(MAX_NIGHTLY_PRICE + 1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn terms_change_does_not_undo_a_suspension() {
        let h = Harness::in_memory();
        let service = ListingService::new(h.repos.clone());
        let listing = service.create_listing(input()).await.unwrap();
        service
            .set_status(listing.id, ListingStatus::Published)
            .await
            .unwrap();

        let (suspended, updated) = tokio::join!(
            service.set_status(listing.id, ListingStatus::Suspended),
            service.update_terms(
                listing.id,
                ListingTerms {
                    max_guests: Some(3),
                    ..Default::default()
                },
            ),
        );
        suspended.unwrap();
        updated.unwrap();

        let stored = service.get(listing.id).await.unwrap();
        assert_eq!(stored.status, ListingStatus::Suspended);
        assert_eq!(stored.max_guests, 3);
    }

    #[tokio::test]
    async fn unknown_listing_is_not_found() {
        let h = Harness::in_memory();
        let service = ListingService::new(h.repos.clone());
        assert!(matches!(
            service.set_status(8, ListingStatus::Published).await,
            Err(DomainError::NotFound { .. })
        ));
    }
}
