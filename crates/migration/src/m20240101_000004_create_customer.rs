//! Create `customer` profile table with FK to `user`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Customer::Table)
                    .if_not_exists()
                    .col(pk_auto(Customer::Id))
                    .col(integer(Customer::UserId).unique_key().not_null())
                    .col(text(Customer::Preferences).not_null())
                    .col(boolean(Customer::IsBlocked).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_customer_user")
                            .from(Customer::Table, Customer::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Customer::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Customer { Table, Id, UserId, Preferences, IsBlocked }

#[derive(DeriveIden)]
enum User { Table, Id }
