use async_trait::async_trait;

use super::domain::{AuthUser, Credentials, NewAccount};
use super::errors::AuthError;

/// Repository abstraction for auth-related persistence.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    /// Match on username first, then email.
    async fn find_user_by_login(&self, login: &str) -> Result<Option<AuthUser>, AuthError>;
    async fn username_exists(&self, username: &str) -> Result<bool, AuthError>;
    async fn email_exists(&self, email: &str) -> Result<bool, AuthError>;
    async fn find_service_id(&self, name: &str) -> Result<Option<i32>, AuthError>;

    /// Persist user, credentials and role profile atomically.
    async fn create_account(&self, account: NewAccount) -> Result<AuthUser, AuthError>;

    async fn get_credentials(&self, user_id: i32) -> Result<Option<Credentials>, AuthError>;
    async fn record_login(&self, user: &AuthUser) -> Result<(), AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use crate::auth::domain::NewProfile;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockAuthRepository {
        users: Mutex<HashMap<i32, AuthUser>>,     // key: user id
        creds: Mutex<HashMap<i32, Credentials>>,  // key: user_id
        profiles: Mutex<HashMap<i32, NewProfile>>,
        services: Mutex<HashMap<String, i32>>,    // key: service name
        logins: Mutex<Vec<i32>>,
    }

    impl MockAuthRepository {
        pub fn with_service(self, name: &str, id: i32) -> Self {
            self.services.lock().unwrap().insert(name.to_string(), id);
            self
        }

        pub fn profile_of(&self, user_id: i32) -> Option<NewProfile> {
            self.profiles.lock().unwrap().get(&user_id).cloned()
        }

        pub fn login_count(&self) -> usize { self.logins.lock().unwrap().len() }

        pub fn deactivate(&self, user_id: i32) {
            if let Some(u) = self.users.lock().unwrap().get_mut(&user_id) {
                u.is_active = false;
            }
        }
    }

    #[async_trait]
    impl AuthRepository for MockAuthRepository {
        async fn find_user_by_login(&self, login: &str) -> Result<Option<AuthUser>, AuthError> {
            let users = self.users.lock().unwrap();
            let by_name = users.values().find(|u| u.username == login);
            let lowered = login.to_lowercase();
            Ok(by_name.or_else(|| users.values().find(|u| u.email == lowered)).cloned())
        }

        async fn username_exists(&self, username: &str) -> Result<bool, AuthError> {
            Ok(self.users.lock().unwrap().values().any(|u| u.username == username))
        }

        async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
            let lowered = email.to_lowercase();
            Ok(self.users.lock().unwrap().values().any(|u| u.email == lowered))
        }

        async fn find_service_id(&self, name: &str) -> Result<Option<i32>, AuthError> {
            Ok(self.services.lock().unwrap().get(name.trim()).copied())
        }

        async fn create_account(&self, account: NewAccount) -> Result<AuthUser, AuthError> {
            let mut users = self.users.lock().unwrap();
            if users.values().any(|u| u.username == account.user.username) {
                return Err(AuthError::Conflict("username".into()));
            }
            let id = users.len() as i32 + 1;
            let user = AuthUser {
                id,
                username: account.user.username,
                email: account.user.email.to_lowercase(),
                full_name: account.user.full_name,
                role: account.user.role,
                is_active: true,
            };
            users.insert(id, user.clone());
            self.creds.lock().unwrap().insert(
                id,
                Credentials { user_id: id, password_hash: account.password_hash, password_algorithm: account.password_algorithm },
            );
            self.profiles.lock().unwrap().insert(id, account.profile);
            Ok(user)
        }

        async fn get_credentials(&self, user_id: i32) -> Result<Option<Credentials>, AuthError> {
            let creds = self.creds.lock().unwrap();
            Ok(creds.get(&user_id).cloned())
        }

        async fn record_login(&self, user: &AuthUser) -> Result<(), AuthError> {
            self.logins.lock().unwrap().push(user.id);
            Ok(())
        }
    }
}
