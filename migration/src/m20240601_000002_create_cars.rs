use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Car::Table)
                    .if_not_exists()
                    .col(uuid(Car::Id).primary_key())
                    .col(string_len(Car::Name, 100).not_null())
                    .col(string_len(Car::Brand, 50).not_null())
                    .col(string_len(Car::Model, 50).not_null())
                    .col(integer(Car::Year).not_null())
                    .col(string_len(Car::Color, 30).not_null())
                    .col(string_len(Car::FuelType, 20).not_null())
                    .col(string_len(Car::Transmission, 20).not_null())
                    .col(integer(Car::Seats).not_null())
                    .col(double(Car::PricePerDay).not_null())
                    .col(text_null(Car::Description))
                    .col(json(Car::Features).not_null())
                    .col(json(Car::Images).not_null())
                    .col(boolean(Car::IsAvailable).not_null().default(true))
                    .col(string_len(Car::Location, 100).not_null())
                    .col(
                        string_len(Car::RegistrationNumber, 32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        timestamp_with_time_zone(Car::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Car::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Car::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Car {
    Table,
    Id,
    Name,
    Brand,
    Model,
    Year,
    Color,
    FuelType,
    Transmission,
    Seats,
    PricePerDay,
    Description,
    Features,
    Images,
    IsAvailable,
    Location,
    RegistrationNumber,
    CreatedAt,
    UpdatedAt,
}
