use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use tracing::warn;

use crate::auth::domain::{AuthUser, Credentials, NewAccount, NewProfile};
use crate::auth::errors::AuthError;
use crate::auth::repository::AuthRepository;
use models::user::Role;

pub struct SeaOrmAuthRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmAuthRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }

    async fn insert_account<C: ConnectionTrait>(conn: &C, account: NewAccount) -> Result<AuthUser, AuthError> {
        let user = models::user::create(conn, account.user).await?;
        models::user_credentials::upsert_password(conn, user.id, account.password_hash, &account.password_algorithm).await?;
        match account.profile {
            NewProfile::Customer => {
                models::customer::create(conn, user.id).await?;
            }
            NewProfile::Professional { service_id, experience, description } => {
                models::professional::create(
                    conn,
                    models::professional::NewProfessional { user_id: user.id, service_id, experience, description },
                )
                .await?;
            }
            NewProfile::Admin { department, access_level } => {
                models::admin::create(conn, user.id, &department, &access_level).await?;
            }
        }
        to_auth_user(user)
    }
}

fn to_auth_user(u: models::user::Model) -> Result<AuthUser, AuthError> {
    let role = u.role()?;
    Ok(AuthUser { id: u.id, username: u.username, email: u.email, full_name: u.full_name, role, is_active: u.is_active })
}

#[async_trait::async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    async fn find_user_by_login(&self, login: &str) -> Result<Option<AuthUser>, AuthError> {
        models::user::find_by_login(&self.db, login).await?.map(to_auth_user).transpose()
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AuthError> {
        Ok(models::user::find_by_username(&self.db, username).await?.is_some())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        Ok(models::user::find_by_email(&self.db, email).await?.is_some())
    }

    async fn find_service_id(&self, name: &str) -> Result<Option<i32>, AuthError> {
        Ok(models::service::find_by_name(&self.db, name).await?.map(|s| s.id))
    }

    async fn create_account(&self, account: NewAccount) -> Result<AuthUser, AuthError> {
        let txn = self.db.begin().await.map_err(|e| AuthError::Repository(e.to_string()))?;
        match Self::insert_account(&txn, account).await {
            Ok(user) => {
                txn.commit().await.map_err(|e| AuthError::Repository(e.to_string()))?;
                Ok(user)
            }
            Err(e) => {
                if let Err(rb) = txn.rollback().await {
                    warn!(error = %rb, "rollback after failed registration");
                }
                Err(e)
            }
        }
    }

    async fn get_credentials(&self, user_id: i32) -> Result<Option<Credentials>, AuthError> {
        let res = models::user_credentials::find_by_user(&self.db, user_id).await?;
        Ok(res.map(|c| Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm }))
    }

    async fn record_login(&self, user: &AuthUser) -> Result<(), AuthError> {
        if user.role == Role::Admin {
            models::admin::touch_last_login(&self.db, user.id).await?;
        }
        Ok(())
    }
}
