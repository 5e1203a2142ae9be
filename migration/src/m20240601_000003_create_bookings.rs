use sea_orm_migration::{prelude::*, schema::*};

use super::m20240601_000001_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // car_id is a plain reference: deleting a car keeps its booking history
        manager
            .create_table(
                Table::create()
                    .table(Booking::Table)
                    .if_not_exists()
                    .col(uuid(Booking::Id).primary_key())
                    .col(uuid(Booking::UserId).not_null())
                    .col(uuid(Booking::CarId).not_null())
                    .col(date(Booking::StartDate).not_null())
                    .col(date(Booking::EndDate).not_null())
                    .col(integer(Booking::TotalDays).not_null())
                    .col(double(Booking::TotalAmount).not_null())
                    .col(string_len(Booking::Status, 20).not_null().default("pending"))
                    .col(
                        string_len(Booking::PaymentStatus, 20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(string_len(Booking::PickupLocation, 255).not_null())
                    .col(string_len(Booking::DropoffLocation, 255).not_null())
                    .col(text_null(Booking::SpecialRequests))
                    .col(
                        timestamp_with_time_zone(Booking::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Booking::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_user")
                            .from(Booking::Table, Booking::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_booking_car_dates")
                    .table(Booking::Table)
                    .col(Booking::CarId)
                    .col(Booking::StartDate)
                    .col(Booking::EndDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_booking_user")
                    .table(Booking::Table)
                    .col(Booking::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Booking::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Booking {
    Table,
    Id,
    UserId,
    CarId,
    StartDate,
    EndDate,
    TotalDays,
    TotalAmount,
    Status,
    PaymentStatus,
    PickupLocation,
    DropoffLocation,
    SpecialRequests,
    CreatedAt,
    UpdatedAt,
}
