//! Catalog offerings (e.g. plumbing) with price and duration.
use chrono::Utc;
use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(column_type = "Double")]
    pub price: f64,
    /// Hours
    pub time_required: i32,
    pub description: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServiceInput {
    pub name: String,
    pub price: f64,
    pub time_required: i32,
    #[serde(default)]
    pub description: String,
}

pub fn validate(input: &ServiceInput) -> Result<(), ModelError> {
    let len = input.name.trim().chars().count();
    if !(2..=100).contains(&len) {
        return Err(ModelError::Validation("service name must be 2 to 100 characters".into()));
    }
    if !input.price.is_finite() || input.price < 0.0 {
        return Err(ModelError::Validation("price must be a non-negative number".into()));
    }
    if input.time_required <= 0 {
        return Err(ModelError::Validation("time_required must be a positive number of hours".into()));
    }
    Ok(())
}

pub async fn create<C: ConnectionTrait>(db: &C, input: ServiceInput) -> Result<Model, ModelError> {
    validate(&input)?;
    let am = ActiveModel {
        name: Set(input.name.trim().to_string()),
        price: Set(input.price),
        time_required: Set(input.time_required),
        description: Set(input.description),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    };
    Ok(am.insert(db).await?)
}

pub async fn update<C: ConnectionTrait>(db: &C, id: i32, input: ServiceInput) -> Result<Model, ModelError> {
    validate(&input)?;
    let found = Entity::find_by_id(id).one(db).await?.ok_or(ModelError::NotFound("service"))?;
    let mut am: ActiveModel = found.into();
    am.name = Set(input.name.trim().to_string());
    am.price = Set(input.price);
    am.time_required = Set(input.time_required);
    am.description = Set(input.description);
    Ok(am.update(db).await?)
}

pub async fn find_by_name<C: ConnectionTrait>(db: &C, name: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::Name.eq(name.trim())).one(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, price: f64, hours: i32) -> ServiceInput {
        ServiceInput { name: name.into(), price, time_required: hours, description: String::new() }
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(validate(&input("Plumbing", 499.0, 2)).is_ok());
        assert!(validate(&input("P", 499.0, 2)).is_err());
        assert!(validate(&input("Plumbing", -1.0, 2)).is_err());
        assert!(validate(&input("Plumbing", f64::NAN, 2)).is_err());
        assert!(validate(&input("Plumbing", 10.0, 0)).is_err());
    }

    #[tokio::test]
    async fn create_update_and_find_by_name() {
        let db = crate::db::connect_in_memory().await.unwrap();
        let s = create(&db, input(" Plumbing ", 499.0, 2)).await.unwrap();
        assert_eq!(s.name, "Plumbing");

        let updated = update(&db, s.id, input("Plumbing Deluxe", 799.5, 3)).await.unwrap();
        assert_eq!(updated.price, 799.5);
        assert!(find_by_name(&db, "Plumbing Deluxe").await.unwrap().is_some());
        assert!(matches!(update(&db, 999, input("Nope", 1.0, 1)).await, Err(ModelError::NotFound("service"))));
    }
}
