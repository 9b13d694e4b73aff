//! Create reservations table
//!
//! Stays are stored as half-open `[start_date, end_date)` date pairs.
//! Rows are never deleted; cancellation only changes `status`.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_listings::Listings;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reservations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reservations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Reservations::ListingId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Reservations::GuestId).string().not_null())
                    .col(ColumnDef::new(Reservations::StartDate).date().not_null())
                    .col(ColumnDef::new(Reservations::EndDate).date().not_null())
                    .col(
                        ColumnDef::new(Reservations::GuestCount)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Reservations::TotalPriceCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::Status)
                            .string()
                            .not_null()
                            .default("Pending"),
                    )
                    .col(
                        ColumnDef::new(Reservations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Reservations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .check(Expr::col(Reservations::StartDate).lt(Expr::col(Reservations::EndDate)))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservations_listing")
                            .from(Reservations::Table, Reservations::ListingId)
                            .to(Listings::Table, Listings::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_listing_dates")
                    .table(Reservations::Table)
                    .col(Reservations::ListingId)
                    .col(Reservations::StartDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_guest")
                    .table(Reservations::Table)
                    .col(Reservations::GuestId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_status_end")
                    .table(Reservations::Table)
                    .col(Reservations::Status)
                    .col(Reservations::EndDate)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reservations::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Reservations {
    Table,
    Id,
    ListingId,
    GuestId,
    StartDate,
    EndDate,
    GuestCount,
    TotalPriceCents,
    Status,
    CreatedAt,
    UpdatedAt,
}
