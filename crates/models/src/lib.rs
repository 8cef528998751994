//! SeaORM entities for the marketplace plus small create/lookup helpers.
//! Field validation lives next to each entity so every writer shares it.

pub mod errors;
pub mod db;
pub mod status;
pub mod user;
pub mod user_credentials;
pub mod admin;
pub mod customer;
pub mod professional;
pub mod service;
pub mod service_request;
pub mod review;

pub use status::RequestStatus;

#[cfg(test)]
mod tests;
