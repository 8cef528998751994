use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::user;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customer")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub user_id: i32,
    pub preferences: String,
    pub is_blocked: bool,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { User }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
        }
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef { Relation::User.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn create<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Model, ModelError> {
    let am = ActiveModel {
        user_id: Set(user_id),
        preferences: Set(String::new()),
        is_blocked: Set(false),
        ..Default::default()
    };
    Ok(am.insert(db).await?)
}

pub async fn find_by_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::UserId.eq(user_id)).one(db).await?)
}

pub async fn set_blocked<C: ConnectionTrait>(db: &C, id: i32, blocked: bool) -> Result<Model, ModelError> {
    let found = Entity::find_by_id(id).one(db).await?.ok_or(ModelError::NotFound("customer"))?;
    let mut am: ActiveModel = found.into();
    am.is_blocked = Set(blocked);
    Ok(am.update(db).await?)
}
