//! Fixtures for repository tests

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tempfile::TempDir;

use super::migrator::Migrator;
use super::{init_database, DatabaseConfig};
use crate::domain::listing::{CancellationPolicy, Listing, ListingStatus, Location};

/// Fresh migrated in-memory database
pub async fn memory_db() -> DatabaseConnection {
    let db = init_database(&DatabaseConfig::in_memory()).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

/// Migrated database in a temporary file behind a pool of `connections`.
/// Keep the `TempDir` alive for as long as the connection is used.
pub async fn file_db(connections: u32) -> (TempDir, DatabaseConnection) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stayhub.db");
    let config = DatabaseConfig {
        max_connections: connections,
        min_connections: 1,
        ..DatabaseConfig::sqlite(path.to_str().unwrap())
    };
    let db = init_database(&config).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    (dir, db)
}

pub fn published_listing() -> Listing {
    let now = Utc::now();
    Listing {
        id: 0,
        host_id: "host-1".into(),
        title: "Loft by the canal".into(),
        location: Location {
            address: "Prinsengracht 1".into(),
            city: "Amsterdam".into(),
            country: "NL".into(),
            latitude: 52.37,
            longitude: 4.88,
        },
        nightly_price: Decimal::new(12000, 2),
        currency: "EUR".into(),
        max_guests: 4,
        instant_booking: true,
        cancellation_policy: CancellationPolicy::Moderate,
        status: ListingStatus::Published,
        created_at: now,
        updated_at: now,
    }
}
