use async_trait::async_trait;
use models::service_request::{NewServiceRequest, RequestPatch};
use models::{customer, professional, service_request, user};

use crate::errors::ServiceError;

/// Persistence seen by the lifecycle service.
#[async_trait]
pub trait LifecycleRepository: Send + Sync {
    async fn find_request(&self, id: i32) -> Result<Option<service_request::Model>, ServiceError>;
    async fn find_professional_by_user(&self, user_id: i32) -> Result<Option<professional::Model>, ServiceError>;
    async fn find_customer_by_user(&self, user_id: i32) -> Result<Option<customer::Model>, ServiceError>;
    async fn find_user(&self, user_id: i32) -> Result<Option<user::Model>, ServiceError>;
    async fn service_exists(&self, service_id: i32) -> Result<bool, ServiceError>;
    async fn insert_request(&self, input: NewServiceRequest) -> Result<service_request::Model, ServiceError>;

    /// Apply `patch` only if the row still carries `expected_version`.
    /// `Ok(false)` means another writer got there first.
    ///
    /// When the request carries a review, the average rating of every
    /// professional in `rerate` is recomputed in the same write.
    async fn compare_and_set(
        &self,
        id: i32,
        expected_version: i32,
        patch: &RequestPatch,
        rerate: &[i32],
    ) -> Result<bool, ServiceError>;
}

/// In-memory repository for service-level tests.
pub mod mock {
    use super::*;
    use chrono::Utc;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockLifecycleRepository {
        requests: Mutex<HashMap<i32, service_request::Model>>,
        professionals: Mutex<HashMap<i32, professional::Model>>, // key: user_id
        customers: Mutex<HashMap<i32, customer::Model>>,         // key: user_id
        users: Mutex<HashMap<i32, user::Model>>,
        services: Mutex<HashSet<i32>>,
        rerated: Mutex<Vec<i32>>,
        interleave: bool,
    }

    impl MockLifecycleRepository {
        /// Every request read yields to the scheduler once, so concurrent
        /// callers on one task all read before any of them writes.
        pub fn interleaved() -> Self { Self { interleave: true, ..Self::default() } }

        pub fn add_service(&self, id: i32) { self.services.lock().unwrap().insert(id); }

        pub fn add_user(&self, u: user::Model) { self.users.lock().unwrap().insert(u.id, u); }

        pub fn add_professional(&self, p: professional::Model) { self.professionals.lock().unwrap().insert(p.user_id, p); }

        pub fn add_customer(&self, c: customer::Model) { self.customers.lock().unwrap().insert(c.user_id, c); }

        pub fn request(&self, id: i32) -> Option<service_request::Model> { self.requests.lock().unwrap().get(&id).cloned() }

        /// Professionals whose rating a successful write asked to refresh.
        pub fn rerated(&self) -> Vec<i32> { self.rerated.lock().unwrap().clone() }
    }

    #[async_trait]
    impl LifecycleRepository for MockLifecycleRepository {
        async fn find_request(&self, id: i32) -> Result<Option<service_request::Model>, ServiceError> {
            let found = self.requests.lock().unwrap().get(&id).cloned();
            if self.interleave {
                tokio::task::yield_now().await;
            }
            Ok(found)
        }

        async fn find_professional_by_user(&self, user_id: i32) -> Result<Option<professional::Model>, ServiceError> {
            Ok(self.professionals.lock().unwrap().get(&user_id).cloned())
        }

        async fn find_customer_by_user(&self, user_id: i32) -> Result<Option<customer::Model>, ServiceError> {
            Ok(self.customers.lock().unwrap().get(&user_id).cloned())
        }

        async fn find_user(&self, user_id: i32) -> Result<Option<user::Model>, ServiceError> {
            Ok(self.users.lock().unwrap().get(&user_id).cloned())
        }

        async fn service_exists(&self, service_id: i32) -> Result<bool, ServiceError> {
            Ok(self.services.lock().unwrap().contains(&service_id))
        }

        async fn insert_request(&self, input: NewServiceRequest) -> Result<service_request::Model, ServiceError> {
            let mut requests = self.requests.lock().unwrap();
            let id = requests.len() as i32 + 1;
            let model = service_request::Model {
                id,
                service_id: input.service_id,
                customer_id: input.customer_id,
                professional_id: None,
                status: models::RequestStatus::Requested.as_str().into(),
                date_of_request: Utc::now().into(),
                scheduled_date: input.scheduled_date,
                date_of_completion: None,
                remarks: input.remarks,
                address: input.address,
                pin_code: input.pin_code,
                version: 0,
            };
            requests.insert(id, model.clone());
            Ok(model)
        }

        async fn compare_and_set(
            &self,
            id: i32,
            expected_version: i32,
            patch: &RequestPatch,
            rerate: &[i32],
        ) -> Result<bool, ServiceError> {
            let mut requests = self.requests.lock().unwrap();
            let Some(row) = requests.get_mut(&id) else { return Ok(false) };
            if row.version != expected_version {
                return Ok(false);
            }
            if let Some(s) = patch.status {
                row.status = s.as_str().into();
            }
            if let Some(p) = patch.professional_id {
                row.professional_id = p;
            }
            if let Some(d) = patch.date_of_completion {
                row.date_of_completion = d;
            }
            if let Some(d) = patch.scheduled_date {
                row.scheduled_date = d;
            }
            if let Some(r) = &patch.remarks {
                row.remarks = r.clone();
            }
            row.version += 1;
            self.rerated.lock().unwrap().extend_from_slice(rerate);
            Ok(true)
        }
    }
}
