use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use rand::rngs::OsRng;
use tracing::{info, warn, instrument};

use models::user::{NewUser, Role};

use super::domain::{AuthContext, AuthSession, AuthUser, LoginInput, NewAccount, NewProfile, RegisterInput};
use super::errors::AuthError;
use super::repository::AuthRepository;
use super::token;

/// Auth service configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub password_algorithm: String,
}

impl AuthConfig {
    pub fn from_app(cfg: &configs::AuthConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            token_ttl_hours: cfg.token_ttl_hours,
            password_algorithm: "argon2".into(),
        }
    }
}

/// Auth business service independent of web framework
pub struct AuthService<R: AuthRepository> {
    repo: Arc<R>,
    cfg: AuthConfig,
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if !(6..=128).contains(&password.chars().count()) {
        return Err(AuthError::Validation("password must be 6 to 128 characters".into()));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::HashError(e.to_string()))?
        .to_string())
}

impl<R: AuthRepository> AuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AuthConfig) -> Self { Self { repo, cfg } }

    /// Register a customer or professional with a hashed password.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::RegisterInput;
    /// use models::user::Role;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo, AuthConfig { jwt_secret: "secret".into(), token_ttl_hours: 1, password_algorithm: "argon2".into() });
    /// let input = RegisterInput {
    ///     username: "jane_doe".into(), email: "jane@example.com".into(), password: "Secret123".into(),
    ///     full_name: "Jane Doe".into(), phone_number: "9876543210".into(), address: "12 Main Street".into(),
    ///     pin_code: "560001".into(), role: Role::Customer, service: None, experience: None, description: None,
    /// };
    /// let user = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(user.email, "jane@example.com");
    /// ```
    #[instrument(skip(self, input), fields(username = %input.username, role = %input.role))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthUser, AuthError> {
        validate_password(&input.password)?;
        let new_user = NewUser {
            username: input.username,
            email: input.email,
            full_name: input.full_name,
            phone_number: input.phone_number,
            address: input.address,
            pin_code: input.pin_code,
            role: input.role,
        };
        models::user::validate_new(&new_user)?;

        if self.repo.username_exists(&new_user.username).await? {
            warn!(event = "duplicate_username", username = %new_user.username, "registration refused");
            return Err(AuthError::Conflict(format!("username {}", new_user.username)));
        }
        if self.repo.email_exists(&new_user.email).await? {
            warn!(event = "duplicate_email", email = %new_user.email, "registration refused");
            return Err(AuthError::Conflict(format!("email {}", new_user.email)));
        }

        let profile = match input.role {
            Role::Customer => NewProfile::Customer,
            Role::Professional => {
                let name = input.service.unwrap_or_default();
                if name.trim().is_empty() {
                    return Err(AuthError::Validation("service is required for professionals".into()));
                }
                let service_id = self
                    .repo
                    .find_service_id(&name)
                    .await?
                    .ok_or_else(|| AuthError::Validation(format!("service {} not found", name.trim())))?;
                let experience = input.experience.unwrap_or(0);
                let description = input.description.unwrap_or_default();
                models::professional::validate_experience(experience)?;
                models::professional::validate_description(&description)?;
                NewProfile::Professional { service_id, experience, description }
            }
            Role::Admin => return Err(AuthError::Validation("role must be customer or professional".into())),
        };

        let password_hash = hash_password(&input.password)?;
        let user = self
            .repo
            .create_account(NewAccount {
                user: new_user,
                profile,
                password_hash,
                password_algorithm: self.cfg.password_algorithm.clone(),
            })
            .await?;
        info!(user_id = user.id, role = %user.role, "user_registered");
        Ok(user)
    }

    /// Authenticate a user and issue a bearer token.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::{RegisterInput, LoginInput};
    /// use models::user::Role;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo.clone(), AuthConfig { jwt_secret: "secret".into(), token_ttl_hours: 1, password_algorithm: "argon2".into() });
    /// let _ = tokio_test::block_on(svc.register(RegisterInput {
    ///     username: "jane_doe".into(), email: "u@e.com".into(), password: "Passw0rd".into(),
    ///     full_name: "Jane Doe".into(), phone_number: "9876543210".into(), address: "12 Main Street".into(),
    ///     pin_code: "560001".into(), role: Role::Customer, service: None, experience: None, description: None,
    /// }));
    /// let session = tokio_test::block_on(svc.login(LoginInput { login: "u@e.com".into(), password: "Passw0rd".into() })).unwrap();
    /// assert_eq!(session.user.username, "jane_doe");
    /// assert!(!session.token.is_empty());
    /// ```
    #[instrument(skip(self, input), fields(login = %input.login))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let Some(user) = self.repo.find_user_by_login(&input.login).await? else {
            warn!(event = "failed_login", reason = "unknown_user", "login refused");
            return Err(AuthError::Unauthorized);
        };
        if !user.is_active {
            warn!(event = "failed_login", reason = "inactive", user_id = user.id, "login refused");
            return Err(AuthError::Inactive);
        }

        let cred = self.repo
            .get_credentials(user.id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let parsed = PasswordHash::new(&cred.password_hash).map_err(|e| AuthError::HashError(e.to_string()))?;
        if Argon2::default().verify_password(input.password.as_bytes(), &parsed).is_err() {
            warn!(event = "failed_login", reason = "bad_password", user_id = user.id, "login refused");
            return Err(AuthError::Unauthorized);
        }

        let token = token::issue(&self.cfg.jwt_secret, self.cfg.token_ttl_hours, &user)?;
        self.repo.record_login(&user).await?;
        info!(user_id = user.id, role = %user.role, "user_logged_in");
        Ok(AuthSession { user, token })
    }

    pub fn verify_token(&self, token: &str) -> Result<AuthContext, AuthError> {
        token::verify(&self.cfg.jwt_secret, token)
    }

    /// Create the configured admin account unless the username is already taken.
    #[instrument(skip(self, admin), fields(username = %admin.username))]
    pub async fn ensure_admin(&self, admin: &configs::BootstrapAdmin) -> Result<Option<AuthUser>, AuthError> {
        if self.repo.username_exists(&admin.username).await? {
            return Ok(None);
        }
        validate_password(&admin.password)?;
        let new_user = NewUser {
            username: admin.username.clone(),
            email: admin.email.clone(),
            full_name: admin.full_name.clone(),
            phone_number: "0000000000".into(),
            address: "Head Office".into(),
            pin_code: "000000".into(),
            role: Role::Admin,
        };
        models::user::validate_new(&new_user)?;
        let password_hash = hash_password(&admin.password)?;
        let user = self
            .repo
            .create_account(NewAccount {
                user: new_user,
                profile: NewProfile::Admin { department: "Administration".into(), access_level: "full".into() },
                password_hash,
                password_algorithm: self.cfg.password_algorithm.clone(),
            })
            .await?;
        info!(user_id = user.id, "bootstrap_admin_created");
        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::mock::MockAuthRepository;

    fn svc(repo: Arc<MockAuthRepository>) -> AuthService<MockAuthRepository> {
        AuthService::new(repo, AuthConfig { jwt_secret: "secret".into(), token_ttl_hours: 1, password_algorithm: "argon2".into() })
    }

    fn input(username: &str, role: Role) -> RegisterInput {
        RegisterInput {
            username: username.into(),
            email: format!("{username}@example.com"),
            password: "Passw0rd".into(),
            full_name: "Test Person".into(),
            phone_number: "9876543210".into(),
            address: "12 Main Street".into(),
            pin_code: "560001".into(),
            role,
            service: None,
            experience: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn professional_gets_unverified_profile_for_named_service() {
        let repo = Arc::new(MockAuthRepository::default().with_service("Plumbing", 3));
        let s = svc(repo.clone());
        let mut i = input("pro_one", Role::Professional);
        i.service = Some("Plumbing".into());
        i.experience = Some(5);
        i.description = Some("Ten years fixing pipes".into());
        let user = s.register(i).await.unwrap();
        assert_eq!(
            repo.profile_of(user.id),
            Some(NewProfile::Professional { service_id: 3, experience: 5, description: "Ten years fixing pipes".into() })
        );
    }

    #[tokio::test]
    async fn professional_with_unknown_service_is_rejected() {
        let s = svc(Arc::new(MockAuthRepository::default()));
        let mut i = input("pro_one", Role::Professional);
        i.service = Some("Gardening".into());
        i.description = Some("Ten years of gardens".into());
        assert!(matches!(s.register(i).await, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn admin_cannot_self_register() {
        let s = svc(Arc::new(MockAuthRepository::default()));
        assert!(matches!(s.register(input("root_user", Role::Admin)).await, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn duplicate_username_or_email_conflicts() {
        let s = svc(Arc::new(MockAuthRepository::default()));
        s.register(input("jane_doe", Role::Customer)).await.unwrap();
        assert!(matches!(s.register(input("jane_doe", Role::Customer)).await, Err(AuthError::Conflict(_))));
        let mut other = input("john_doe", Role::Customer);
        other.email = "JANE_DOE@example.com".into();
        assert!(matches!(s.register(other).await, Err(AuthError::Conflict(_))));
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let s = svc(Arc::new(MockAuthRepository::default()));
        let mut i = input("jane_doe", Role::Customer);
        i.password = "12345".into();
        assert!(matches!(s.register(i).await, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn login_issues_verifiable_token_and_rejects_bad_password() {
        let repo = Arc::new(MockAuthRepository::default());
        let s = svc(repo.clone());
        let user = s.register(input("jane_doe", Role::Customer)).await.unwrap();

        let session = s.login(LoginInput { login: "jane_doe".into(), password: "Passw0rd".into() }).await.unwrap();
        let ctx = s.verify_token(&session.token).unwrap();
        assert_eq!(ctx, AuthContext { user_id: user.id, role: Role::Customer });
        assert_eq!(repo.login_count(), 1);

        let bad = s.login(LoginInput { login: "jane_doe".into(), password: "nope-nope".into() }).await;
        assert!(matches!(bad, Err(AuthError::Unauthorized)));
        let unknown = s.login(LoginInput { login: "ghost".into(), password: "Passw0rd".into() }).await;
        assert!(matches!(unknown, Err(AuthError::Unauthorized)));
    }

    #[tokio::test]
    async fn inactive_user_cannot_log_in() {
        let repo = Arc::new(MockAuthRepository::default());
        let s = svc(repo.clone());
        let user = s.register(input("jane_doe", Role::Customer)).await.unwrap();
        repo.deactivate(user.id);
        let res = s.login(LoginInput { login: "jane_doe".into(), password: "Passw0rd".into() }).await;
        assert!(matches!(res, Err(AuthError::Inactive)));
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let repo = Arc::new(MockAuthRepository::default());
        let s = svc(repo.clone());
        let cfg = configs::BootstrapAdmin {
            username: "root".into(),
            email: "root@example.com".into(),
            password: "changeme123".into(),
            full_name: "Administrator".into(),
        };
        let created = s.ensure_admin(&cfg).await.unwrap().unwrap();
        assert_eq!(created.role, Role::Admin);
        assert!(s.ensure_admin(&cfg).await.unwrap().is_none());
    }
}
