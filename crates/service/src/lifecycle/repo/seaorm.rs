use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, TransactionTrait};
use tracing::{debug, warn};

use models::service_request::{NewServiceRequest, RequestPatch};
use models::{customer, professional, review, service, service_request, user};

use crate::errors::ServiceError;
use crate::lifecycle::repository::LifecycleRepository;
use crate::rating::recompute_average;

/// SeaORM-backed repository implementation.
pub struct SeaOrmLifecycleRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmLifecycleRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

#[async_trait::async_trait]
impl LifecycleRepository for SeaOrmLifecycleRepository {
    async fn find_request(&self, id: i32) -> Result<Option<service_request::Model>, ServiceError> {
        service_request::Entity::find_by_id(id).one(&self.db).await.map_err(ServiceError::db)
    }

    async fn find_professional_by_user(&self, user_id: i32) -> Result<Option<professional::Model>, ServiceError> {
        Ok(professional::find_by_user(&self.db, user_id).await?)
    }

    async fn find_customer_by_user(&self, user_id: i32) -> Result<Option<customer::Model>, ServiceError> {
        Ok(customer::find_by_user(&self.db, user_id).await?)
    }

    async fn find_user(&self, user_id: i32) -> Result<Option<user::Model>, ServiceError> {
        user::Entity::find_by_id(user_id).one(&self.db).await.map_err(ServiceError::db)
    }

    async fn service_exists(&self, service_id: i32) -> Result<bool, ServiceError> {
        let found = service::Entity::find_by_id(service_id).one(&self.db).await.map_err(ServiceError::db)?;
        Ok(found.is_some())
    }

    async fn insert_request(&self, input: NewServiceRequest) -> Result<service_request::Model, ServiceError> {
        Ok(service_request::create(&self.db, input).await?)
    }

    async fn compare_and_set(
        &self,
        id: i32,
        expected_version: i32,
        patch: &RequestPatch,
        rerate: &[i32],
    ) -> Result<bool, ServiceError> {
        if rerate.is_empty() {
            return Ok(service_request::update_if_version(&self.db, id, expected_version, patch).await?);
        }
        let txn = self.db.begin().await.map_err(ServiceError::db)?;
        match write_and_rerate(&txn, id, expected_version, patch, rerate).await {
            Ok(true) => {
                txn.commit().await.map_err(ServiceError::db)?;
                Ok(true)
            }
            Ok(false) => {
                txn.rollback().await.map_err(ServiceError::db)?;
                Ok(false)
            }
            Err(e) => {
                if let Err(rb) = txn.rollback().await {
                    warn!(request_id = id, error = %rb, "rollback after failed reassignment");
                }
                Err(e)
            }
        }
    }
}

/// Version-checked write, then refresh the averages the reassignment moved
/// the request's review between.
async fn write_and_rerate<C: ConnectionTrait>(
    txn: &C,
    id: i32,
    expected_version: i32,
    patch: &RequestPatch,
    rerate: &[i32],
) -> Result<bool, ServiceError> {
    if !service_request::update_if_version(txn, id, expected_version, patch).await? {
        return Ok(false);
    }
    if review::find_by_request(txn, id).await?.is_none() {
        return Ok(true);
    }
    for &professional_id in rerate {
        let ratings = review::ratings_for_professional(txn, professional_id).await?;
        let avg = recompute_average(&ratings);
        professional::set_avg_rating(txn, professional_id, avg).await?;
        debug!(request_id = id, professional_id, avg, "rating refreshed after reassignment");
    }
    Ok(true)
}
