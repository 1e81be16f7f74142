//! Ledger schema.
//!
//! - `transactions`: every income and expense entry
//! - `fixed_recurrences`: monthly templates materialized by the scheduler
//!
//! A materialized row carries `recurrence_id` and `recurrence_period`; the
//! unique index on that pair keeps one row per recurrence and month. Manual
//! entries leave both NULL, which SQLite treats as distinct.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    UserId,
    Kind,
    AmountMinor,
    Category,
    PaymentMethod,
    Description,
    Photo,
    OccurredAt,
    RecurrenceId,
    RecurrencePeriod,
}

#[derive(Iden)]
enum FixedRecurrences {
    Table,
    Id,
    UserId,
    Kind,
    AmountMinor,
    Category,
    PaymentMethod,
    Description,
    DayOfMonth,
    Active,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Transactions::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Category).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::PaymentMethod)
                            .string()
                            .not_null()
                            .default("no_especificado"),
                    )
                    .col(ColumnDef::new(Transactions::Description).string())
                    .col(ColumnDef::new(Transactions::Photo).string())
                    .col(
                        ColumnDef::new(Transactions::OccurredAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::RecurrenceId).string())
                    .col(ColumnDef::new(Transactions::RecurrencePeriod).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-user_id-occurred_at")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .col(Transactions::OccurredAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-recurrence-period-unique")
                    .table(Transactions::Table)
                    .col(Transactions::RecurrenceId)
                    .col(Transactions::RecurrencePeriod)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FixedRecurrences::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FixedRecurrences::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FixedRecurrences::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FixedRecurrences::Kind).string().not_null())
                    .col(
                        ColumnDef::new(FixedRecurrences::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FixedRecurrences::Category)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FixedRecurrences::PaymentMethod)
                            .string()
                            .not_null()
                            .default("no_especificado"),
                    )
                    .col(ColumnDef::new(FixedRecurrences::Description).string())
                    .col(
                        ColumnDef::new(FixedRecurrences::DayOfMonth)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FixedRecurrences::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(FixedRecurrences::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-fixed_recurrences-user_id")
                    .table(FixedRecurrences::Table)
                    .col(FixedRecurrences::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FixedRecurrences::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        Ok(())
    }
}
