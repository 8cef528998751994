use chrono::Utc;
use sea_orm::{entity::prelude::*, sea_query::Expr, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::user;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "admin")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub user_id: i32,
    pub department: String,
    pub access_level: String,
    pub last_login: Option<DateTimeWithTimeZone>,
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

impl ActiveModelBehavior for ActiveModel {}

pub const ACCESS_LEVELS: [&str; 3] = ["full", "restricted", "read-only"];

pub async fn create<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    department: &str,
    access_level: &str,
) -> Result<Model, ModelError> {
    if !ACCESS_LEVELS.contains(&access_level) {
        return Err(ModelError::Validation(format!("invalid access level: {access_level}")));
    }
    let am = ActiveModel {
        user_id: Set(user_id),
        department: Set(department.to_string()),
        access_level: Set(access_level.to_string()),
        last_login: Set(None),
        ..Default::default()
    };
    Ok(am.insert(db).await?)
}

pub async fn find_by_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::UserId.eq(user_id)).one(db).await?)
}

pub async fn touch_last_login<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<(), ModelError> {
    Entity::update_many()
        .col_expr(Column::LastLogin, Expr::value(Some(DateTimeWithTimeZone::from(Utc::now()))))
        .filter(Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(())
}
