//! Create `service_request` table.
//!
//! `version` is the optimistic-concurrency counter every lifecycle update checks and bumps.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ServiceRequest::Table)
                    .if_not_exists()
                    .col(pk_auto(ServiceRequest::Id))
                    .col(integer(ServiceRequest::ServiceId).not_null())
                    .col(integer(ServiceRequest::CustomerId).not_null())
                    .col(ColumnDef::new(ServiceRequest::ProfessionalId).integer().null())
                    .col(string_len(ServiceRequest::Status, 20).not_null())
                    .col(timestamp_with_time_zone(ServiceRequest::DateOfRequest).not_null())
                    .col(timestamp_with_time_zone(ServiceRequest::ScheduledDate).not_null())
                    .col(
                        ColumnDef::new(ServiceRequest::DateOfCompletion)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(text(ServiceRequest::Remarks).not_null())
                    .col(string_len(ServiceRequest::Address, 200).not_null())
                    .col(string_len(ServiceRequest::PinCode, 10).not_null())
                    .col(integer(ServiceRequest::Version).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_request_service")
                            .from(ServiceRequest::Table, ServiceRequest::ServiceId)
                            .to(Service::Table, Service::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_request_customer")
                            .from(ServiceRequest::Table, ServiceRequest::CustomerId)
                            .to(Customer::Table, Customer::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_request_professional")
                            .from(ServiceRequest::Table, ServiceRequest::ProfessionalId)
                            .to(Professional::Table, Professional::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ServiceRequest::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ServiceRequest {
    Table,
    Id,
    ServiceId,
    CustomerId,
    ProfessionalId,
    Status,
    DateOfRequest,
    ScheduledDate,
    DateOfCompletion,
    Remarks,
    Address,
    PinCode,
    Version,
}

#[derive(DeriveIden)]
enum Service { Table, Id }

#[derive(DeriveIden)]
enum Customer { Table, Id }

#[derive(DeriveIden)]
enum Professional { Table, Id }
