//! Service layer for the household services marketplace.
//! - Business rules sit here; entities and validators come from `models`.
//! - Every operation returns a typed error the HTTP layer maps to a status.

pub mod errors;
pub mod auth;
pub mod catalog;
pub mod profiles;
pub mod lifecycle;
pub mod rating;
pub mod admin;
pub mod cache;
pub mod notify;
pub mod jobs;
#[cfg(test)]
pub mod test_support;
