use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument, warn};

use common::metrics::{TRANSITIONS_TOTAL, TRANSITION_CONFLICTS_TOTAL};
use models::service_request::{self, NewServiceRequest, RequestPatch};

use super::machine::{self, Action, Actor, CustomerEdit, Policy, ProfessionalActor};
use super::repository::LifecycleRepository;
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRequestInput {
    pub service_id: i32,
    pub scheduled_date: String,
    #[serde(default)]
    pub remarks: Option<String>,
    /// Defaults to the customer's own address.
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub pin_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRequestInput {
    #[serde(default)]
    pub scheduled_date: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    /// Only `closed` is accepted.
    #[serde(default)]
    pub status: Option<String>,
}

/// Professionals a review on `read` moves away from or onto when `patch` is applied.
fn reassigned(read: &service_request::Model, patch: &RequestPatch) -> Vec<i32> {
    match patch.professional_id {
        Some(next) if next != read.professional_id => read.professional_id.into_iter().chain(next).collect(),
        _ => Vec::new(),
    }
}

/// Runs service-request transitions as version-checked writes.
pub struct LifecycleService<R: LifecycleRepository> {
    repo: Arc<R>,
    policy: Policy,
}

impl<R: LifecycleRepository> LifecycleService<R> {
    pub fn new(repo: Arc<R>, policy: Policy) -> Self { Self { repo, policy } }

    async fn professional(&self, user_id: i32) -> Result<ProfessionalActor, ServiceError> {
        let p = self
            .repo
            .find_professional_by_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("professional profile"))?;
        Ok(ProfessionalActor::from(&p))
    }

    async fn customer(&self, user_id: i32) -> Result<models::customer::Model, ServiceError> {
        self.repo
            .find_customer_by_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("customer profile"))
    }

    async fn load(&self, request_id: i32) -> Result<service_request::Model, ServiceError> {
        self.repo
            .find_request(request_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("service request"))
    }

    /// Write `patch` against the version that was read, then return the stored row.
    async fn commit(&self, read: &service_request::Model, patch: &RequestPatch, action: &str) -> Result<service_request::Model, ServiceError> {
        let rerate = reassigned(read, patch);
        if !self.repo.compare_and_set(read.id, read.version, patch, &rerate).await? {
            TRANSITION_CONFLICTS_TOTAL.inc();
            warn!(request_id = read.id, version = read.version, action, "lost update race");
            return Err(ServiceError::Conflict("service request was modified concurrently; reload and retry".into()));
        }
        TRANSITIONS_TOTAL.with_label_values(&[action]).inc();
        self.load(read.id).await
    }

    #[instrument(skip(self, input), fields(service_id = input.service_id))]
    pub async fn create_request(&self, user_id: i32, input: CreateRequestInput) -> Result<service_request::Model, ServiceError> {
        let customer = self.customer(user_id).await?;
        if customer.is_blocked {
            return Err(ServiceError::Forbidden("customer account is blocked".into()));
        }
        if !self.repo.service_exists(input.service_id).await? {
            return Err(ServiceError::not_found("service"));
        }
        let scheduled_date = machine::parse_schedule(&input.scheduled_date)?;
        let user = self.repo.find_user(user_id).await?.ok_or_else(|| ServiceError::not_found("user"))?;
        let address = input.address.unwrap_or(user.address);
        let pin_code = input.pin_code.unwrap_or(user.pin_code);
        models::user::validate_address(&address)?;
        models::user::validate_pin_code(&pin_code)?;

        let created = self
            .repo
            .insert_request(NewServiceRequest {
                service_id: input.service_id,
                customer_id: customer.id,
                scheduled_date,
                remarks: input.remarks.unwrap_or_default(),
                address,
                pin_code,
            })
            .await?;
        info!(request_id = created.id, customer_id = customer.id, "service_request_created");
        Ok(created)
    }

    #[instrument(skip(self), fields(action = action.as_str()))]
    pub async fn transition_as_professional(&self, user_id: i32, request_id: i32, action: Action) -> Result<service_request::Model, ServiceError> {
        let actor = self.professional(user_id).await?;
        if action == Action::Accept && !actor.is_verified {
            return Err(ServiceError::Forbidden("your profile is not verified yet".into()));
        }
        let req = self.load(request_id).await?;
        let patch = machine::plan(&req, action, &Actor::Professional(actor), self.policy, machine::now())?;
        let updated = self.commit(&req, &patch, action.as_str()).await?;
        info!(request_id, professional_id = actor.id, status = %updated.status, "service_request_transition");
        Ok(updated)
    }

    pub async fn accept(&self, user_id: i32, request_id: i32) -> Result<service_request::Model, ServiceError> {
        self.transition_as_professional(user_id, request_id, Action::Accept).await
    }

    pub async fn reject(&self, user_id: i32, request_id: i32) -> Result<service_request::Model, ServiceError> {
        self.transition_as_professional(user_id, request_id, Action::Reject).await
    }

    pub async fn start(&self, user_id: i32, request_id: i32) -> Result<service_request::Model, ServiceError> {
        self.transition_as_professional(user_id, request_id, Action::Start).await
    }

    pub async fn complete(&self, user_id: i32, request_id: i32) -> Result<service_request::Model, ServiceError> {
        self.transition_as_professional(user_id, request_id, Action::Complete).await
    }

    #[instrument(skip(self))]
    pub async fn close(&self, user_id: i32, request_id: i32) -> Result<service_request::Model, ServiceError> {
        let customer = self.customer(user_id).await?;
        let req = self.load(request_id).await?;
        let actor = Actor::Customer { customer_id: customer.id };
        let patch = machine::plan(&req, Action::Close, &actor, self.policy, machine::now())?;
        self.commit(&req, &patch, Action::Close.as_str()).await
    }

    /// Reschedule, change remarks and/or close, as one write.
    #[instrument(skip(self, input))]
    pub async fn update_by_customer(&self, user_id: i32, request_id: i32, input: UpdateRequestInput) -> Result<service_request::Model, ServiceError> {
        let customer = self.customer(user_id).await?;
        let close = match input.status.as_deref().map(str::trim) {
            None => false,
            Some("closed") => true,
            Some(other) => return Err(ServiceError::Validation(format!("status can only be set to closed, got {other}"))),
        };
        let scheduled_date = input.scheduled_date.as_deref().map(machine::parse_schedule).transpose()?;
        let edit = CustomerEdit { scheduled_date, remarks: input.remarks, close };

        let req = self.load(request_id).await?;
        let patch = machine::plan_customer_edit(&req, customer.id, &edit, machine::now())?;
        let action = if close { Action::Close.as_str() } else { "update" };
        self.commit(&req, &patch, action).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::repository::mock::MockLifecycleRepository;
    use chrono::Utc;
    use models::{customer, professional, user, RequestStatus};

    const CUSTOMER_USER: i32 = 50;
    const PRO_USER: i32 = 60;
    const RIVAL_USER: i32 = 61;

    fn user_row(id: i32, role: user::Role) -> user::Model {
        user::Model {
            id,
            username: format!("user_{id}"),
            email: format!("user{id}@example.com"),
            full_name: "Test Person".into(),
            phone_number: "9876543210".into(),
            address: "12 Main Street".into(),
            pin_code: "560001".into(),
            role: role.as_str().into(),
            is_active: true,
            created_at: Utc::now().into(),
        }
    }

    fn pro_row(id: i32, user_id: i32, verified: bool) -> professional::Model {
        professional::Model {
            id,
            user_id,
            service_id: 1,
            experience: 3,
            description: "Fixes leaking pipes".into(),
            is_verified: verified,
            avg_rating: 0.0,
        }
    }

    fn seeded(repo: MockLifecycleRepository) -> Arc<MockLifecycleRepository> {
        repo.add_service(1);
        repo.add_user(user_row(CUSTOMER_USER, user::Role::Customer));
        repo.add_customer(customer::Model { id: 5, user_id: CUSTOMER_USER, preferences: String::new(), is_blocked: false });
        repo.add_professional(pro_row(10, PRO_USER, true));
        repo.add_professional(pro_row(11, RIVAL_USER, true));
        Arc::new(repo)
    }

    fn input() -> CreateRequestInput {
        CreateRequestInput {
            service_id: 1,
            scheduled_date: "2030-01-15T09:00:00".into(),
            remarks: None,
            address: None,
            pin_code: None,
        }
    }

    #[tokio::test]
    async fn full_lifecycle_scenario() {
        let repo = seeded(MockLifecycleRepository::default());
        let svc = LifecycleService::new(repo.clone(), Policy::default());

        let req = svc.create_request(CUSTOMER_USER, input()).await.unwrap();
        assert_eq!(req.current_status().unwrap(), RequestStatus::Requested);
        assert_eq!((req.service_id, req.customer_id), (1, 5));
        assert_eq!(req.address, "12 Main Street");

        let accepted = svc.accept(PRO_USER, req.id).await.unwrap();
        assert_eq!(accepted.current_status().unwrap(), RequestStatus::Accepted);
        assert_eq!(accepted.professional_id, Some(10));

        let completed = svc.complete(PRO_USER, req.id).await.unwrap();
        assert_eq!(completed.current_status().unwrap(), RequestStatus::Completed);
        assert!(completed.date_of_completion.is_some());

        let closed = svc.close(CUSTOMER_USER, req.id).await.unwrap();
        assert_eq!(closed.current_status().unwrap(), RequestStatus::Closed);
        assert_eq!(closed.version, 3);

        let again = svc.close(CUSTOMER_USER, req.id).await;
        assert!(matches!(again, Err(ServiceError::InvalidTransition(_))));
        assert_eq!(repo.request(req.id).unwrap().version, 3);
    }

    #[tokio::test]
    async fn concurrent_accepts_yield_one_winner_and_one_conflict() {
        let repo = seeded(MockLifecycleRepository::interleaved());
        let svc = LifecycleService::new(repo.clone(), Policy::default());
        let req = svc.create_request(CUSTOMER_USER, input()).await.unwrap();

        let (a, b) = tokio::join!(svc.accept(PRO_USER, req.id), svc.accept(RIVAL_USER, req.id));
        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(outcomes.iter().filter(|r| matches!(r, Err(ServiceError::Conflict(_)))).count(), 1);

        let stored = repo.request(req.id).unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.professional_id, Some(10));
    }

    #[tokio::test]
    async fn blocked_customer_cannot_create_requests() {
        let repo = seeded(MockLifecycleRepository::default());
        repo.add_customer(customer::Model { id: 5, user_id: CUSTOMER_USER, preferences: String::new(), is_blocked: true });
        let svc = LifecycleService::new(repo, Policy::default());
        assert!(matches!(svc.create_request(CUSTOMER_USER, input()).await, Err(ServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn unknown_service_or_bad_date_is_refused() {
        let svc = LifecycleService::new(seeded(MockLifecycleRepository::default()), Policy::default());
        let mut missing = input();
        missing.service_id = 99;
        assert!(matches!(svc.create_request(CUSTOMER_USER, missing).await, Err(ServiceError::NotFound(_))));
        let mut bad_date = input();
        bad_date.scheduled_date = "next week".into();
        assert!(matches!(svc.create_request(CUSTOMER_USER, bad_date).await, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn unverified_professional_cannot_accept() {
        let repo = seeded(MockLifecycleRepository::default());
        repo.add_professional(pro_row(12, 62, false));
        let svc = LifecycleService::new(repo, Policy::default());
        let req = svc.create_request(CUSTOMER_USER, input()).await.unwrap();
        assert!(matches!(svc.accept(62, req.id).await, Err(ServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn missing_profile_or_request_is_not_found() {
        let svc = LifecycleService::new(seeded(MockLifecycleRepository::default()), Policy::default());
        assert!(matches!(svc.accept(999, 1).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(svc.accept(PRO_USER, 404).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn reject_clears_assignment() {
        let repo = seeded(MockLifecycleRepository::default());
        let svc = LifecycleService::new(repo, Policy::default());
        let req = svc.create_request(CUSTOMER_USER, input()).await.unwrap();
        svc.accept(PRO_USER, req.id).await.unwrap();
        svc.start(PRO_USER, req.id).await.unwrap();
        let rejected = svc.reject(PRO_USER, req.id).await.unwrap();
        assert_eq!(rejected.current_status().unwrap(), RequestStatus::Requested);
        assert!(rejected.professional_id.is_none());
    }

    #[tokio::test]
    async fn reassignment_asks_to_refresh_both_professionals() {
        let repo = seeded(MockLifecycleRepository::default());
        let svc = LifecycleService::new(repo.clone(), Policy::default());
        let req = svc.create_request(CUSTOMER_USER, input()).await.unwrap();

        svc.accept(PRO_USER, req.id).await.unwrap();
        svc.complete(PRO_USER, req.id).await.unwrap();
        assert_eq!(repo.rerated(), vec![10]);

        svc.reject(RIVAL_USER, req.id).await.unwrap();
        svc.accept(RIVAL_USER, req.id).await.unwrap();
        assert_eq!(repo.rerated(), vec![10, 10, 11]);
    }

    #[tokio::test]
    async fn customer_update_reschedules_and_refuses_other_statuses() {
        let svc = LifecycleService::new(seeded(MockLifecycleRepository::default()), Policy::default());
        let req = svc.create_request(CUSTOMER_USER, input()).await.unwrap();

        let updated = svc
            .update_by_customer(
                CUSTOMER_USER,
                req.id,
                UpdateRequestInput { scheduled_date: Some("2030-02-01".into()), remarks: Some("gate code 42".into()), status: None },
            )
            .await
            .unwrap();
        assert_eq!(updated.remarks, "gate code 42");
        assert_eq!(updated.scheduled_date.to_rfc3339(), "2030-02-01T00:00:00+00:00");

        let bad = svc
            .update_by_customer(CUSTOMER_USER, req.id, UpdateRequestInput { status: Some("completed".into()), ..Default::default() })
            .await;
        assert!(matches!(bad, Err(ServiceError::Validation(_))));

        let early_close = svc
            .update_by_customer(CUSTOMER_USER, req.id, UpdateRequestInput { status: Some("closed".into()), ..Default::default() })
            .await;
        assert!(matches!(early_close, Err(ServiceError::InvalidTransition(_))));
    }
}
