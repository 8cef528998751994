use chrono::Utc;
use sea_orm::{entity::prelude::*, ConnectionTrait, JoinType, QuerySelect, Set};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::service_request;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "review")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub service_request_id: i32,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { ServiceRequest }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::ServiceRequest => Entity::belongs_to(service_request::Entity)
                .from(Column::ServiceRequestId)
                .to(service_request::Column::Id)
                .into(),
        }
    }
}

impl Related<service_request::Entity> for Entity {
    fn to() -> RelationDef { Relation::ServiceRequest.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

pub fn validate(rating: i32, comment: &str) -> Result<(), ModelError> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ModelError::Validation(format!("rating must be between {MIN_RATING} and {MAX_RATING}")));
    }
    if comment.trim().is_empty() {
        return Err(ModelError::Validation("comment is required".into()));
    }
    Ok(())
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    service_request_id: i32,
    rating: i32,
    comment: &str,
) -> Result<Model, ModelError> {
    validate(rating, comment)?;
    let am = ActiveModel {
        service_request_id: Set(service_request_id),
        rating: Set(rating),
        comment: Set(comment.trim().to_string()),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    };
    Ok(am.insert(db).await?)
}

pub async fn find_by_request<C: ConnectionTrait>(db: &C, service_request_id: i32) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::ServiceRequestId.eq(service_request_id))
        .one(db)
        .await?)
}

/// Ratings of every review attached to a request the professional handled.
pub async fn ratings_for_professional<C: ConnectionTrait>(db: &C, professional_id: i32) -> Result<Vec<i32>, ModelError> {
    let rows = Entity::find()
        .join(JoinType::InnerJoin, Relation::ServiceRequest.def())
        .filter(service_request::Column::ProfessionalId.eq(professional_id))
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|r| r.rating).collect())
}

#[cfg(test)]
mod tests {
    use super::validate;

    #[test]
    fn rating_bounds_are_inclusive() {
        assert!(validate(1, "ok").is_ok());
        assert!(validate(5, "ok").is_ok());
        assert!(validate(0, "ok").is_err());
        assert!(validate(6, "ok").is_err());
    }

    #[test]
    fn comment_must_not_be_blank() {
        assert!(validate(3, "   ").is_err());
    }
}
