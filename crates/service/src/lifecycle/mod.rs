//! Service-request lifecycle: transition rules, their persistence seam and
//! the read-side queries used by the customer, professional and admin views.

pub mod machine;
pub mod queries;
pub mod repository;
pub mod repo;
pub mod service;

pub use machine::{Action, Policy};
pub use service::LifecycleService;
