//! Auth module: three-layer architecture (domain, repository, service).
//!
//! Registration, login, bearer tokens and the startup admin account live here;
//! the HTTP layer only translates requests and errors.

pub mod domain;
pub mod errors;
pub mod repository;
pub mod service;
pub mod repo;
pub mod token;

pub use domain::AuthContext;
pub use service::AuthService;
