//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_user;
mod m20240101_000002_create_user_credentials;
mod m20240101_000003_create_admin;
mod m20240101_000004_create_customer;
mod m20240101_000005_create_service;
mod m20240101_000006_create_professional;
mod m20240101_000007_create_service_request;
mod m20240101_000008_create_review;
mod m20240101_000009_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_user::Migration),
            Box::new(m20240101_000002_create_user_credentials::Migration),
            Box::new(m20240101_000003_create_admin::Migration),
            Box::new(m20240101_000004_create_customer::Migration),
            Box::new(m20240101_000005_create_service::Migration),
            Box::new(m20240101_000006_create_professional::Migration),
            Box::new(m20240101_000007_create_service_request::Migration),
            Box::new(m20240101_000008_create_review::Migration),
            // Indexes should always be applied last
            Box::new(m20240101_000009_add_indexes::Migration),
        ]
    }
}
