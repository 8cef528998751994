use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Service: lookups by name (registration names a service)
        manager
            .create_index(
                Index::create()
                    .name("idx_service_name")
                    .table(Service::Table)
                    .col(Service::Name)
                    .to_owned(),
            )
            .await?;

        // Professional: pending-work listings filter on service_id
        manager
            .create_index(
                Index::create()
                    .name("idx_professional_service")
                    .table(Professional::Table)
                    .col(Professional::ServiceId)
                    .to_owned(),
            )
            .await?;

        // ServiceRequest: composite (service_id, status) for pending queues
        manager
            .create_index(
                Index::create()
                    .name("idx_request_service_status")
                    .table(ServiceRequest::Table)
                    .col(ServiceRequest::ServiceId)
                    .col(ServiceRequest::Status)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_request_customer")
                    .table(ServiceRequest::Table)
                    .col(ServiceRequest::CustomerId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_request_professional")
                    .table(ServiceRequest::Table)
                    .col(ServiceRequest::ProfessionalId)
                    .to_owned(),
            )
            .await?;

        // Review: one review per request
        manager
            .create_index(
                Index::create()
                    .name("uniq_review_service_request")
                    .table(Review::Table)
                    .col(Review::ServiceRequestId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_service_name").table(Service::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_professional_service").table(Professional::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_request_service_status").table(ServiceRequest::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_request_customer").table(ServiceRequest::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_request_professional").table(ServiceRequest::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uniq_review_service_request").table(Review::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Service { Table, Name }

#[derive(DeriveIden)]
enum Professional { Table, ServiceId }

#[derive(DeriveIden)]
enum ServiceRequest { Table, ServiceId, Status, CustomerId, ProfessionalId }

#[derive(DeriveIden)]
enum Review { Table, ServiceRequestId }
