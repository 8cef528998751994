use sea_orm::{entity::prelude::*, sea_query::Expr, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::{service, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "professional")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub user_id: i32,
    pub service_id: i32,
    /// Years
    pub experience: i32,
    pub description: String,
    pub is_verified: bool,
    /// Derived from reviews; only the rating recompute writes it.
    #[sea_orm(column_type = "Double")]
    pub avg_rating: f64,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    User,
    Service,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
            Relation::Service => Entity::belongs_to(service::Entity)
                .from(Column::ServiceId)
                .to(service::Column::Id)
                .into(),
        }
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef { Relation::User.def() }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Debug)]
pub struct NewProfessional {
    pub user_id: i32,
    pub service_id: i32,
    pub experience: i32,
    pub description: String,
}

pub fn validate_experience(years: i32) -> Result<(), ModelError> {
    if !(0..=50).contains(&years) {
        return Err(ModelError::Validation("experience must be between 0 and 50 years".into()));
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), ModelError> {
    let len = description.trim().chars().count();
    if !(10..=1000).contains(&len) {
        return Err(ModelError::Validation("description must be 10 to 1000 characters".into()));
    }
    Ok(())
}

/// New professionals start unverified with no rating.
pub async fn create<C: ConnectionTrait>(db: &C, input: NewProfessional) -> Result<Model, ModelError> {
    validate_experience(input.experience)?;
    validate_description(&input.description)?;
    let am = ActiveModel {
        user_id: Set(input.user_id),
        service_id: Set(input.service_id),
        experience: Set(input.experience),
        description: Set(input.description),
        is_verified: Set(false),
        avg_rating: Set(0.0),
        ..Default::default()
    };
    Ok(am.insert(db).await?)
}

pub async fn find_by_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::UserId.eq(user_id)).one(db).await?)
}

pub async fn toggle_verified<C: ConnectionTrait>(db: &C, id: i32) -> Result<Model, ModelError> {
    let found = Entity::find_by_id(id).one(db).await?.ok_or(ModelError::NotFound("professional"))?;
    let flipped = !found.is_verified;
    let mut am: ActiveModel = found.into();
    am.is_verified = Set(flipped);
    Ok(am.update(db).await?)
}

pub async fn set_avg_rating<C: ConnectionTrait>(db: &C, id: i32, avg: f64) -> Result<(), ModelError> {
    let res = Entity::update_many()
        .col_expr(Column::AvgRating, Expr::value(avg))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    if res.rows_affected == 0 {
        return Err(ModelError::NotFound("professional"));
    }
    Ok(())
}
