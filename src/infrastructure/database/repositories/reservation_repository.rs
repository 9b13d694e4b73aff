//! SeaORM implementation of ReservationRepository
//!
//! `insert` is a single conditional statement: the row is written only if
//! no date-holding reservation of the same listing overlaps it. A writing
//! statement takes the SQLite write lock before it reads, so concurrent
//! bookings wait on the busy timeout instead of failing. On PostgreSQL the
//! statement runs inside a transaction holding an advisory lock keyed on
//! the listing id, so bookings for one listing queue up while other
//! listings proceed.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, QueryFilter,
    QueryOrder, Statement, TransactionTrait,
};

use super::listing_repository::{db_err, from_cents, to_cents};
use crate::domain::reservation::{
    NewReservation, Reservation, ReservationRepository, ReservationStatus,
};
use crate::domain::stay::StayRange;
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::reservation;

/// Rounds of "insert skipped, but the blocker is gone" before giving up
const MAX_INSERT_ROUNDS: usize = 3;

pub struct SeaOrmReservationRepository {
    db: DatabaseConnection,
}

impl SeaOrmReservationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// One attempt at the conditional insert. `None` when an overlapping
    /// reservation blocked it.
    async fn try_insert(&self, r: &NewReservation) -> DomainResult<Option<i32>> {
        if self.db.get_database_backend() != DbBackend::Postgres {
            return insert_if_free(&self.db, r).await;
        }

        let txn = self.db.begin().await.map_err(db_err)?;
        txn.execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT pg_advisory_xact_lock($1)",
            [i64::from(r.listing_id).into()],
        ))
        .await
        .map_err(db_err)?;
        let inserted = insert_if_free(&txn, r).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(inserted)
    }

    async fn first_overlap(&self, r: &NewReservation) -> DomainResult<Option<reservation::Model>> {
        reservation::Entity::find()
            .filter(reservation::Column::ListingId.eq(r.listing_id))
            .filter(reservation::Column::Status.is_in(holding_statuses()))
            .filter(reservation::Column::StartDate.lt(r.stay.end()))
            .filter(reservation::Column::EndDate.gt(r.stay.start()))
            .order_by_asc(reservation::Column::StartDate)
            .one(&self.db)
            .await
            .map_err(db_err)
    }
}

/// `INSERT INTO reservations (...) SELECT <values> WHERE NOT EXISTS (<overlap>)
/// RETURNING id`
async fn insert_if_free<C: ConnectionTrait>(
    conn: &C,
    r: &NewReservation,
) -> DomainResult<Option<i32>> {
    let overlap = Query::select()
        .expr(Expr::val(1))
        .from(reservation::Entity)
        .and_where(Expr::col(reservation::Column::ListingId).eq(r.listing_id))
        .and_where(Expr::col(reservation::Column::Status).is_in(holding_statuses()))
        .and_where(Expr::col(reservation::Column::StartDate).lt(r.stay.end()))
        .and_where(Expr::col(reservation::Column::EndDate).gt(r.stay.start()))
        .to_owned();

    let now = Utc::now();
    let values = Query::select()
        .exprs([
            Expr::val(r.listing_id),
            Expr::val(r.guest_id.clone()),
            Expr::val(r.stay.start()),
            Expr::val(r.stay.end()),
            Expr::val(r.guest_count),
            Expr::val(to_cents(r.total_price)?),
            Expr::val(r.status.as_str()),
            Expr::val(now),
            Expr::val(now),
        ])
        .and_where(Expr::exists(overlap).not())
        .to_owned();

    let mut insert = Query::insert();
    insert
        .into_table(reservation::Entity)
        .columns([
            reservation::Column::ListingId,
            reservation::Column::GuestId,
            reservation::Column::StartDate,
            reservation::Column::EndDate,
            reservation::Column::GuestCount,
            reservation::Column::TotalPriceCents,
            reservation::Column::Status,
            reservation::Column::CreatedAt,
            reservation::Column::UpdatedAt,
        ])
        .select_from(values)
        .map_err(|e| DomainError::Storage(e.to_string()))?
        .returning_col(reservation::Column::Id);

    let statement = conn.get_database_backend().build(&insert);
    let row = conn.query_one(statement).await.map_err(db_err)?;
    row.map(|row| row.try_get::<i32>("", "id").map_err(db_err))
        .transpose()
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: reservation::Model) -> DomainResult<Reservation> {
    let status = ReservationStatus::from_str(&m.status).ok_or_else(|| {
        DomainError::Corrupt(format!(
            "reservation {} has unknown status '{}'",
            m.id, m.status
        ))
    })?;
    let stay = StayRange::new(m.start_date, m.end_date)
        .map_err(|e| DomainError::Corrupt(format!("reservation {}: {}", m.id, e)))?;

    Ok(Reservation {
        id: m.id,
        listing_id: m.listing_id,
        guest_id: m.guest_id,
        stay,
        guest_count: m.guest_count,
        total_price: from_cents(m.total_price_cents),
        status,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn holding_statuses() -> Vec<&'static str> {
    ReservationStatus::HOLDING.iter().map(|s| s.as_str()).collect()
}

// ── ReservationRepository impl ──────────────────────────────────

#[async_trait]
impl ReservationRepository for SeaOrmReservationRepository {
    async fn insert(&self, r: NewReservation) -> DomainResult<i32> {
        debug!(
            "Inserting reservation for listing {} ({})",
            r.listing_id, r.stay
        );

        for _ in 0..MAX_INSERT_ROUNDS {
            if let Some(id) = self.try_insert(&r).await? {
                info!(
                    "Reservation {} stored for listing {} as {}",
                    id, r.listing_id, r.status
                );
                return Ok(id);
            }

            // Blocked. Report the blocker unless it was released meanwhile.
            if let Some(existing) = self.first_overlap(&r).await? {
                let existing = model_to_domain(existing)?;
                return Err(DomainError::AvailabilityConflict {
                    listing_id: r.listing_id,
                    conflicting: existing.stay,
                });
            }
        }

        warn!(
            "Calendar of listing {} kept changing while inserting {}",
            r.listing_id, r.stay
        );
        Err(DomainError::Storage(format!(
            "listing {} calendar changed during insert",
            r.listing_id
        )))
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Reservation>> {
        let model = reservation::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(model_to_domain).transpose()
    }

    async fn find_for_listing(
        &self,
        listing_id: i32,
        exclude: &[ReservationStatus],
    ) -> DomainResult<Vec<Reservation>> {
        let mut query = reservation::Entity::find()
            .filter(reservation::Column::ListingId.eq(listing_id));
        if !exclude.is_empty() {
            query = query.filter(
                reservation::Column::Status.is_not_in(exclude.iter().map(|s| s.as_str())),
            );
        }
        let models = query
            .order_by_asc(reservation::Column::StartDate)
            .order_by_asc(reservation::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(model_to_domain).collect()
    }

    async fn find_for_guest(&self, guest_id: &str) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::GuestId.eq(guest_id))
            .order_by_desc(reservation::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(model_to_domain).collect()
    }

    async fn find_due_for_completion(&self, today: NaiveDate) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::Status.eq(ReservationStatus::Confirmed.as_str()))
            .filter(reservation::Column::EndDate.lte(today))
            .order_by_asc(reservation::Column::EndDate)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(model_to_domain).collect()
    }

    async fn update_status(
        &self,
        id: i32,
        from: ReservationStatus,
        to: ReservationStatus,
    ) -> DomainResult<bool> {
        debug!("Updating reservation {}: {} -> {}", id, from, to);

        let result = reservation::Entity::update_many()
            .col_expr(reservation::Column::Status, Expr::value(to.as_str()))
            .col_expr(reservation::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(reservation::Column::Id.eq(id))
            .filter(reservation::Column::Status.eq(from.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 1 {
            return Ok(true);
        }

        let exists = reservation::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .is_some();
        if exists {
            Ok(false)
        } else {
            Err(DomainError::not_found("Reservation", id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::listing::ListingRepository;
    use crate::infrastructure::database::repositories::listing_repository::SeaOrmListingRepository;
    use crate::infrastructure::database::test_support::{file_db, memory_db, published_listing};
    use std::sync::Arc;
    use rust_decimal::Decimal;

    fn new_reservation(listing_id: i32, start: &str, end: &str) -> NewReservation {
        NewReservation {
            listing_id,
            guest_id: "guest-1".into(),
            stay: StayRange::parse(start, end).unwrap(),
            guest_count: 2,
            total_price: Decimal::new(12345, 2),
            status: ReservationStatus::Confirmed,
        }
    }

    async fn setup() -> (SeaOrmReservationRepository, i32) {
        let db = memory_db().await;
        let listings = SeaOrmListingRepository::new(db.clone());
        let listing = listings.save(published_listing()).await.unwrap();
        (SeaOrmReservationRepository::new(db), listing.id)
    }

    #[tokio::test]
    async fn insert_and_read_back() {
        let (repo, listing_id) = setup().await;
        let id = repo
            .insert(new_reservation(listing_id, "2024-01-01", "2024-01-05"))
            .await
            .unwrap();

        let stored = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.listing_id, listing_id);
        assert_eq!(stored.stay, StayRange::parse("2024-01-01", "2024-01-05").unwrap());
        assert_eq!(stored.total_price, Decimal::new(12345, 2));
        assert_eq!(stored.status, ReservationStatus::Confirmed);
    }

    #[tokio::test]
    async fn insert_rejects_overlap_inside_transaction() {
        let (repo, listing_id) = setup().await;
        repo.insert(new_reservation(listing_id, "2024-01-01", "2024-01-05"))
            .await
            .unwrap();

        let err = repo
            .insert(new_reservation(listing_id, "2024-01-03", "2024-01-06"))
            .await
            .unwrap_err();
        match err {
            DomainError::AvailabilityConflict { conflicting, .. } => {
                assert_eq!(conflicting, StayRange::parse("2024-01-01", "2024-01-05").unwrap());
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        let all = repo.find_for_listing(listing_id, &[]).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn adjacent_stays_are_accepted() {
        let (repo, listing_id) = setup().await;
        repo.insert(new_reservation(listing_id, "2024-01-01", "2024-01-05"))
            .await
            .unwrap();
        repo.insert(new_reservation(listing_id, "2024-01-05", "2024-01-10"))
            .await
            .unwrap();
        assert_eq!(repo.find_for_listing(listing_id, &[]).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn released_reservations_do_not_block() {
        let (repo, listing_id) = setup().await;
        let id = repo
            .insert(new_reservation(listing_id, "2024-01-01", "2024-01-05"))
            .await
            .unwrap();
        assert!(repo
            .update_status(id, ReservationStatus::Confirmed, ReservationStatus::Cancelled)
            .await
            .unwrap());

        repo.insert(new_reservation(listing_id, "2024-01-01", "2024-01-05"))
            .await
            .unwrap();

        let active = repo
            .find_for_listing(listing_id, &ReservationStatus::RELEASED)
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        let everything = repo.find_for_listing(listing_id, &[]).await.unwrap();
        assert_eq!(everything.len(), 2);
    }

    #[tokio::test]
    async fn update_status_is_compare_and_set() {
        let (repo, listing_id) = setup().await;
        let id = repo
            .insert(new_reservation(listing_id, "2024-02-01", "2024-02-03"))
            .await
            .unwrap();

        let stale = repo
            .update_status(id, ReservationStatus::Pending, ReservationStatus::Rejected)
            .await
            .unwrap();
        assert!(!stale);
        assert_eq!(
            repo.find_by_id(id).await.unwrap().unwrap().status,
            ReservationStatus::Confirmed
        );

        let missing = repo
            .update_status(999, ReservationStatus::Pending, ReservationStatus::Rejected)
            .await;
        assert!(matches!(missing, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn due_for_completion_uses_checkout_date() {
        let (repo, listing_id) = setup().await;
        repo.insert(new_reservation(listing_id, "2024-03-01", "2024-03-04"))
            .await
            .unwrap();
        repo.insert(new_reservation(listing_id, "2024-03-04", "2024-03-08"))
            .await
            .unwrap();

        let today = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let due = repo.find_due_for_completion(today).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].stay.end(), today);
    }

    #[tokio::test]
    async fn find_for_guest_lists_newest_first() {
        let (repo, listing_id) = setup().await;
        let first = repo
            .insert(new_reservation(listing_id, "2024-04-01", "2024-04-02"))
            .await
            .unwrap();
        let second = repo
            .insert(new_reservation(listing_id, "2024-05-01", "2024-05-02"))
            .await
            .unwrap();
        let ids: Vec<i32> = repo
            .find_for_guest("guest-1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![second, first]);
        assert!(repo.find_for_guest("nobody").await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_on_a_shared_file_keep_one() {
        let (_dir, db) = file_db(8).await;
        let listings = SeaOrmListingRepository::new(db.clone());
        let listing_id = listings.save(published_listing()).await.unwrap().id;
        let repo = Arc::new(SeaOrmReservationRepository::new(db));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.insert(new_reservation(listing_id, "2024-07-01", "2024-07-04"))
                        .await
                })
            })
            .collect();

        let (mut ok, mut conflicts) = (0, 0);
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => ok += 1,
                Err(DomainError::AvailabilityConflict { .. }) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!((ok, conflicts), (1, 15));
        assert_eq!(repo.find_for_listing(listing_id, &[]).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unreadable_status_is_reported_as_corrupt() {
        let (repo, listing_id) = setup().await;
        let id = repo
            .insert(new_reservation(listing_id, "2024-08-01", "2024-08-03"))
            .await
            .unwrap();
        reservation::Entity::update_many()
            .col_expr(reservation::Column::Status, Expr::value("Misplaced"))
            .filter(reservation::Column::Id.eq(id))
            .exec(&repo.db)
            .await
            .unwrap();

        let err = repo.find_by_id(id).await.unwrap_err();
        assert!(matches!(err, DomainError::Corrupt(_)));
        assert!(!err.is_transient());
    }
}
