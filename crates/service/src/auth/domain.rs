use models::user::Role;
use serde::{Deserialize, Serialize};

/// Registration input. Only customers and professionals may self-register;
/// the professional fields are required for that role and ignored otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone_number: String,
    pub address: String,
    pub pin_code: String,
    pub role: Role,
    /// Name of the catalog service a professional offers.
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub experience: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Login input; `login` matches a username or an email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInput {
    #[serde(alias = "username", alias = "email")]
    pub login: String,
    pub password: String,
}

/// Domain user (business view)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
}

/// Domain credentials (hashed)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub user_id: i32,
    pub password_hash: String,
    pub password_algorithm: String,
}

/// Login result (session)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: AuthUser,
    pub token: String,
}

/// Role-specific profile written together with the user row.
#[derive(Debug, Clone, PartialEq)]
pub enum NewProfile {
    Customer,
    Professional { service_id: i32, experience: i32, description: String },
    Admin { department: String, access_level: String },
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub user: models::user::NewUser,
    pub profile: NewProfile,
    pub password_hash: String,
    pub password_algorithm: String,
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

/// Authenticated caller, resolved from a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: i32,
    pub role: Role,
}
