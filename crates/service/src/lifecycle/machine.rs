//! Transition rules for a service request.
//!
//! Everything here is pure: a rule looks at the stored request and the caller
//! and either refuses or returns the [`RequestPatch`] to write. Persisting the
//! patch (and losing races) is the service's job.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use models::service_request::{self, RequestPatch};
use models::RequestStatus;

use crate::errors::ServiceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Accept,
    Reject,
    Start,
    Complete,
    Close,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Accept => "accept",
            Action::Reject => "reject",
            Action::Start => "start",
            Action::Complete => "complete",
            Action::Close => "close",
        }
    }

    /// Past tense, for response messages.
    pub fn done(&self) -> &'static str {
        match self {
            Action::Accept => "accepted",
            Action::Reject => "rejected",
            Action::Start => "started",
            Action::Complete => "completed",
            Action::Close => "closed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProfessionalActor {
    pub id: i32,
    pub service_id: i32,
    pub is_verified: bool,
}

impl From<&models::professional::Model> for ProfessionalActor {
    fn from(p: &models::professional::Model) -> Self {
        Self { id: p.id, service_id: p.service_id, is_verified: p.is_verified }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Actor {
    Professional(ProfessionalActor),
    Customer { customer_id: i32 },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Policy {
    /// Only the assigned professional may reject an assigned request.
    pub strict_reject: bool,
}

impl Policy {
    pub fn from_config(cfg: &configs::LifecycleConfig) -> Self { Self { strict_reject: cfg.strict_reject } }
}

/// Customer-side edit of a request; `close` runs the close transition.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CustomerEdit {
    pub scheduled_date: Option<DateTime<FixedOffset>>,
    pub remarks: Option<String>,
    pub close: bool,
}

fn require_assigned(req: &service_request::Model, p: &ProfessionalActor) -> Result<(), ServiceError> {
    if req.professional_id != Some(p.id) {
        return Err(ServiceError::Forbidden("service request is not assigned to you".into()));
    }
    Ok(())
}

fn close_patch(req: &service_request::Model, customer_id: i32, now: DateTime<FixedOffset>) -> Result<RequestPatch, ServiceError> {
    if req.customer_id != customer_id {
        return Err(ServiceError::not_found("service request"));
    }
    if req.current_status()? != RequestStatus::Completed {
        return Err(ServiceError::InvalidTransition("cannot close a request that is not completed".into()));
    }
    Ok(RequestPatch {
        status: Some(RequestStatus::Closed),
        date_of_completion: Some(Some(now)),
        ..Default::default()
    })
}

/// Decide whether `actor` may apply `action` to `req` and what changes.
pub fn plan(
    req: &service_request::Model,
    action: Action,
    actor: &Actor,
    policy: Policy,
    now: DateTime<FixedOffset>,
) -> Result<RequestPatch, ServiceError> {
    let status = req.current_status()?;
    match (action, actor) {
        (Action::Accept, Actor::Professional(p)) => {
            if !p.is_verified {
                return Err(ServiceError::Forbidden("your profile is not verified yet".into()));
            }
            if status != RequestStatus::Requested {
                return Err(ServiceError::InvalidTransition("service request is not in requested status".into()));
            }
            if req.service_id != p.service_id {
                return Err(ServiceError::Forbidden("service request does not match your service type".into()));
            }
            Ok(RequestPatch {
                status: Some(RequestStatus::Accepted),
                professional_id: Some(Some(p.id)),
                ..Default::default()
            })
        }
        (Action::Reject, Actor::Professional(p)) => {
            if status.is_terminal() {
                return Err(ServiceError::InvalidTransition("a closed service request cannot be rejected".into()));
            }
            if policy.strict_reject && req.professional_id.is_some() {
                require_assigned(req, p)?;
            }
            Ok(RequestPatch {
                status: Some(RequestStatus::Requested),
                professional_id: Some(None),
                ..Default::default()
            })
        }
        (Action::Start, Actor::Professional(p)) => {
            require_assigned(req, p)?;
            if status != RequestStatus::Accepted {
                return Err(ServiceError::InvalidTransition("service request is not in accepted status".into()));
            }
            Ok(RequestPatch { status: Some(RequestStatus::InProgress), ..Default::default() })
        }
        (Action::Complete, Actor::Professional(p)) => {
            require_assigned(req, p)?;
            if !matches!(status, RequestStatus::Accepted | RequestStatus::InProgress) {
                return Err(ServiceError::InvalidTransition("service request is not accepted or in progress".into()));
            }
            Ok(RequestPatch {
                status: Some(RequestStatus::Completed),
                date_of_completion: Some(Some(now)),
                ..Default::default()
            })
        }
        (Action::Close, Actor::Customer { customer_id }) => close_patch(req, *customer_id, now),
        (action, _) => Err(ServiceError::Forbidden(format!("{} is not permitted for this role", action.as_str()))),
    }
}

/// Plan a customer edit. Closed requests refuse every edit.
pub fn plan_customer_edit(
    req: &service_request::Model,
    customer_id: i32,
    edit: &CustomerEdit,
    now: DateTime<FixedOffset>,
) -> Result<RequestPatch, ServiceError> {
    if req.customer_id != customer_id {
        return Err(ServiceError::not_found("service request"));
    }
    if req.current_status()?.is_terminal() {
        return Err(ServiceError::InvalidTransition("cannot update a closed service request".into()));
    }
    let mut patch = if edit.close { close_patch(req, customer_id, now)? } else { RequestPatch::default() };
    patch.scheduled_date = edit.scheduled_date;
    patch.remarks = edit.remarks.clone();
    Ok(patch)
}

/// Parse an ISO-8601 schedule: full RFC 3339, a naive date-time (taken as
/// UTC) or a bare date (midnight UTC).
pub fn parse_schedule(raw: &str) -> Result<DateTime<FixedOffset>, ServiceError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    if let Some(naive) = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0)) {
        return Ok(naive.and_utc().fixed_offset());
    }
    Err(ServiceError::Validation("invalid scheduled date format".into()))
}

pub fn now() -> DateTime<FixedOffset> { Utc::now().fixed_offset() }
