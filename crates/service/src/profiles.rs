use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use models::user::{self, Role};
use models::{admin, customer, professional};

use crate::errors::ServiceError;

/// A user with whichever role profile it owns.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub user: user::Model,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<customer::Model>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub professional: Option<professional::Model>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<admin::Model>,
}

/// Absent fields are left as they are. Role-specific fields are ignored for other roles.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub pin_code: Option<String>,
    pub preferences: Option<String>,
    pub experience: Option<i32>,
    pub description: Option<String>,
}

impl ProfileUpdate {
    fn validate(&self) -> Result<(), ServiceError> {
        if let Some(v) = &self.full_name { user::validate_full_name(v)?; }
        if let Some(v) = &self.phone_number { user::validate_phone_number(v)?; }
        if let Some(v) = &self.address { user::validate_address(v)?; }
        if let Some(v) = &self.pin_code { user::validate_pin_code(v)?; }
        if let Some(v) = self.experience { professional::validate_experience(v)?; }
        if let Some(v) = &self.description { professional::validate_description(v)?; }
        Ok(())
    }
}

pub async fn get_profile<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Profile, ServiceError> {
    let user = user::Entity::find_by_id(user_id)
        .one(db)
        .await
        .map_err(ServiceError::db)?
        .ok_or_else(|| ServiceError::not_found("user"))?;
    let mut profile = Profile { user, customer: None, professional: None, admin: None };
    match profile.user.role()? {
        Role::Customer => profile.customer = customer::find_by_user(db, user_id).await?,
        Role::Professional => profile.professional = professional::find_by_user(db, user_id).await?,
        Role::Admin => profile.admin = admin::find_by_user(db, user_id).await?,
    }
    Ok(profile)
}

async fn apply<C: ConnectionTrait>(conn: &C, user_id: i32, patch: ProfileUpdate) -> Result<Profile, ServiceError> {
    let current = get_profile(conn, user_id).await?;

    let mut am: user::ActiveModel = current.user.into();
    if let Some(v) = patch.full_name { am.full_name = Set(v.trim().to_string()); }
    if let Some(v) = patch.phone_number { am.phone_number = Set(v); }
    if let Some(v) = patch.address { am.address = Set(v.trim().to_string()); }
    if let Some(v) = patch.pin_code { am.pin_code = Set(v); }
    if am.is_changed() {
        am.update(conn).await.map_err(ServiceError::db)?;
    }

    if let (Some(c), Some(prefs)) = (current.customer, patch.preferences) {
        let mut am: customer::ActiveModel = c.into();
        am.preferences = Set(prefs);
        am.update(conn).await.map_err(ServiceError::db)?;
    }
    if let Some(p) = current.professional {
        if patch.experience.is_some() || patch.description.is_some() {
            let mut am: professional::ActiveModel = p.into();
            if let Some(v) = patch.experience { am.experience = Set(v); }
            if let Some(v) = patch.description { am.description = Set(v.trim().to_string()); }
            am.update(conn).await.map_err(ServiceError::db)?;
        }
    }
    get_profile(conn, user_id).await
}

#[instrument(skip(db, patch))]
pub async fn update_profile(db: &DatabaseConnection, user_id: i32, patch: ProfileUpdate) -> Result<Profile, ServiceError> {
    patch.validate()?;
    let txn = db.begin().await.map_err(ServiceError::db)?;
    match apply(&txn, user_id, patch).await {
        Ok(profile) => {
            txn.commit().await.map_err(ServiceError::db)?;
            info!("profile updated");
            Ok(profile)
        }
        Err(e) => {
            if let Err(rb) = txn.rollback().await {
                warn!(error = %rb, "rollback after failed profile update");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed, Seed};
    use models::errors::ModelError;

    #[tokio::test]
    async fn profile_carries_the_role_specific_row() -> anyhow::Result<()> {
        let Seed { db, customer_user, pro_user, .. } = seed().await?;
        let c = get_profile(&db, customer_user.id).await?;
        assert!(c.customer.is_some() && c.professional.is_none());
        let p = get_profile(&db, pro_user.id).await?;
        assert!(p.professional.is_some() && p.customer.is_none());
        assert!(matches!(get_profile(&db, 999).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn updates_user_and_role_fields_together() -> anyhow::Result<()> {
        let Seed { db, customer_user, pro_user, .. } = seed().await?;
        let updated = update_profile(
            &db,
            customer_user.id,
            ProfileUpdate {
                full_name: Some("Asha Rao".into()),
                preferences: Some("mornings only".into()),
                experience: Some(9),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.user.full_name, "Asha Rao");
        assert_eq!(updated.customer.map(|c| c.preferences).as_deref(), Some("mornings only"));

        let pro = update_profile(
            &db,
            pro_user.id,
            ProfileUpdate { experience: Some(12), pin_code: Some("110011".into()), ..Default::default() },
        )
        .await?;
        assert_eq!(pro.professional.map(|p| p.experience), Some(12));
        assert_eq!(pro.user.pin_code, "110011");
        Ok(())
    }

    #[tokio::test]
    async fn invalid_fields_change_nothing() -> anyhow::Result<()> {
        let Seed { db, customer_user, .. } = seed().await?;
        let err = update_profile(
            &db,
            customer_user.id,
            ProfileUpdate { full_name: Some("Valid Name".into()), pin_code: Some("12".into()), ..Default::default() },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Model(ModelError::Validation(_))));
        assert_eq!(get_profile(&db, customer_user.id).await?.user.full_name, "Test Person");
        Ok(())
    }
}
