//! SeaORM implementation of ListingRepository

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::domain::listing::{
    CancellationPolicy, Listing, ListingRepository, ListingStatus, Location, TermsUpdate,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::listing;

pub struct SeaOrmListingRepository {
    db: DatabaseConnection,
}

impl SeaOrmListingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

/// Decode failures mean a bad row, not a flaky connection.
pub(super) fn db_err(e: DbErr) -> DomainError {
    match e {
        DbErr::Type(_) | DbErr::Json(_) | DbErr::TryIntoErr { .. } => {
            DomainError::Corrupt(e.to_string())
        }
        other => DomainError::Storage(other.to_string()),
    }
}

/// Money is stored as integer minor units.
pub(super) fn to_cents(amount: Decimal) -> DomainResult<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.round().to_i64())
        .ok_or_else(|| DomainError::Validation(format!("amount {} out of range", amount)))
}

pub(super) fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

fn model_to_domain(m: listing::Model) -> DomainResult<Listing> {
    let status = ListingStatus::from_str(&m.status).ok_or_else(|| {
        DomainError::Corrupt(format!("listing {} has unknown status '{}'", m.id, m.status))
    })?;
    let cancellation_policy =
        CancellationPolicy::from_str(&m.cancellation_policy).ok_or_else(|| {
            DomainError::Corrupt(format!(
                "listing {} has unknown cancellation policy '{}'",
                m.id, m.cancellation_policy
            ))
        })?;

    Ok(Listing {
        id: m.id,
        host_id: m.host_id,
        title: m.title,
        location: Location {
            address: m.address,
            city: m.city,
            country: m.country,
            latitude: m.latitude,
            longitude: m.longitude,
        },
        nightly_price: from_cents(m.nightly_price_cents),
        currency: m.currency,
        max_guests: m.max_guests,
        instant_booking: m.instant_booking,
        cancellation_policy,
        status,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn domain_to_active(l: Listing) -> DomainResult<listing::ActiveModel> {
    Ok(listing::ActiveModel {
        id: Set(l.id),
        host_id: Set(l.host_id),
        title: Set(l.title),
        address: Set(l.location.address),
        city: Set(l.location.city),
        country: Set(l.location.country),
        latitude: Set(l.location.latitude),
        longitude: Set(l.location.longitude),
        nightly_price_cents: Set(to_cents(l.nightly_price)?),
        currency: Set(l.currency),
        max_guests: Set(l.max_guests),
        instant_booking: Set(l.instant_booking),
        cancellation_policy: Set(l.cancellation_policy.as_str().to_string()),
        status: Set(l.status.as_str().to_string()),
        created_at: Set(l.created_at),
        updated_at: Set(l.updated_at),
    })
}

// ── ListingRepository impl ──────────────────────────────────────

#[async_trait]
impl ListingRepository for SeaOrmListingRepository {
    async fn save(&self, l: Listing) -> DomainResult<Listing> {
        debug!("Saving listing: {}", l.title);

        let mut model = domain_to_active(l)?;
        model.id = NotSet;
        let saved = model.insert(&self.db).await.map_err(db_err)?;
        model_to_domain(saved)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Listing>> {
        let model = listing::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(model_to_domain).transpose()
    }

    async fn update_status(&self, id: i32, status: ListingStatus) -> DomainResult<()> {
        debug!("Updating listing {} status to {}", id, status);

        let result = listing::Entity::update_many()
            .col_expr(listing::Column::Status, Expr::value(status.as_str()))
            .col_expr(listing::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(listing::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found("Listing", id));
        }
        Ok(())
    }

    async fn update_terms(&self, id: i32, terms: &TermsUpdate) -> DomainResult<()> {
        debug!("Updating listing {} terms", id);

        let mut update = listing::Entity::update_many()
            .col_expr(listing::Column::UpdatedAt, Expr::value(Utc::now()));
        if let Some(price) = terms.nightly_price {
            update = update.col_expr(
                listing::Column::NightlyPriceCents,
                Expr::value(to_cents(price)?),
            );
        }
        if let Some(max) = terms.max_guests {
            update = update.col_expr(listing::Column::MaxGuests, Expr::value(max));
        }
        if let Some(instant) = terms.instant_booking {
            update = update.col_expr(listing::Column::InstantBooking, Expr::value(instant));
        }
        if let Some(policy) = terms.cancellation_policy {
            update = update.col_expr(
                listing::Column::CancellationPolicy,
                Expr::value(policy.as_str()),
            );
        }

        let result = update
            .filter(listing::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found("Listing", id));
        }
        Ok(())
    }

    async fn find_all(&self) -> DomainResult<Vec<Listing>> {
        let models = listing::Entity::find()
            .order_by_asc(listing::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(model_to_domain).collect()
    }
}
