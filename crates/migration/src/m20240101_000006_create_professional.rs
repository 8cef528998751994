//! Create `professional` profile table with FKs to `user` and `service`.
//!
//! `avg_rating` is derived from reviews and only ever written by the rating recompute.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Professional::Table)
                    .if_not_exists()
                    .col(pk_auto(Professional::Id))
                    .col(integer(Professional::UserId).unique_key().not_null())
                    .col(integer(Professional::ServiceId).not_null())
                    .col(integer(Professional::Experience).not_null())
                    .col(text(Professional::Description).not_null())
                    .col(boolean(Professional::IsVerified).not_null())
                    .col(double(Professional::AvgRating).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_professional_user")
                            .from(Professional::Table, Professional::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_professional_service")
                            .from(Professional::Table, Professional::ServiceId)
                            .to(Service::Table, Service::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Professional::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Professional { Table, Id, UserId, ServiceId, Experience, Description, IsVerified, AvgRating }

#[derive(DeriveIden)]
enum User { Table, Id }

#[derive(DeriveIden)]
enum Service { Table, Id }
