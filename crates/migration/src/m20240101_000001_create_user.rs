//! Create `user` table.
//!
//! One row per person; `role` decides which profile table is populated.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(pk_auto(User::Id))
                    .col(string_len(User::Username, 64).unique_key().not_null())
                    .col(string_len(User::Email, 120).unique_key().not_null())
                    .col(string_len(User::FullName, 100).not_null())
                    .col(string_len(User::PhoneNumber, 20).not_null())
                    .col(string_len(User::Address, 200).not_null())
                    .col(string_len(User::PinCode, 10).not_null())
                    .col(string_len(User::Role, 20).not_null())
                    .col(boolean(User::IsActive).not_null())
                    .col(timestamp_with_time_zone(User::CreatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(User::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum User { Table, Id, Username, Email, FullName, PhoneNumber, Address, PinCode, Role, IsActive, CreatedAt }
