//! A customer's order for a catalog service.
//!
//! Every write after creation goes through [`update_if_version`], which only
//! touches the row when its `version` still matches what the caller read.

use chrono::Utc;
use sea_orm::{entity::prelude::*, sea_query::Expr, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::status::RequestStatus;
use crate::{customer, professional, service};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_request")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub service_id: i32,
    pub customer_id: i32,
    pub professional_id: Option<i32>,
    pub status: String,
    pub date_of_request: DateTimeWithTimeZone,
    pub scheduled_date: DateTimeWithTimeZone,
    pub date_of_completion: Option<DateTimeWithTimeZone>,
    pub remarks: String,
    pub address: String,
    pub pin_code: String,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Service,
    Customer,
    Professional,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Service => Entity::belongs_to(service::Entity)
                .from(Column::ServiceId)
                .to(service::Column::Id)
                .into(),
            Relation::Customer => Entity::belongs_to(customer::Entity)
                .from(Column::CustomerId)
                .to(customer::Column::Id)
                .into(),
            Relation::Professional => Entity::belongs_to(professional::Entity)
                .from(Column::ProfessionalId)
                .to(professional::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parsed status; legacy values are mapped to the canonical vocabulary.
    pub fn current_status(&self) -> Result<RequestStatus, ModelError> { self.status.parse() }
}

#[derive(Clone, Debug)]
pub struct NewServiceRequest {
    pub service_id: i32,
    pub customer_id: i32,
    pub scheduled_date: DateTimeWithTimeZone,
    pub remarks: String,
    pub address: String,
    pub pin_code: String,
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewServiceRequest) -> Result<Model, ModelError> {
    let am = ActiveModel {
        service_id: Set(input.service_id),
        customer_id: Set(input.customer_id),
        professional_id: Set(None),
        status: Set(RequestStatus::Requested.as_str().to_string()),
        date_of_request: Set(Utc::now().into()),
        scheduled_date: Set(input.scheduled_date),
        date_of_completion: Set(None),
        remarks: Set(input.remarks),
        address: Set(input.address),
        pin_code: Set(input.pin_code),
        version: Set(0),
        ..Default::default()
    };
    Ok(am.insert(db).await?)
}

/// Column changes produced by a lifecycle transition or a customer edit.
/// `None` leaves the column untouched; `Some(None)` clears a nullable column.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestPatch {
    pub status: Option<RequestStatus>,
    pub professional_id: Option<Option<i32>>,
    pub date_of_completion: Option<Option<DateTimeWithTimeZone>>,
    pub scheduled_date: Option<DateTimeWithTimeZone>,
    pub remarks: Option<String>,
}

/// Conditional update on `(id, version)` that also bumps `version`.
///
/// Returns `false` when no row matched, i.e. the row changed (or vanished)
/// since `expected_version` was read.
pub async fn update_if_version<C: ConnectionTrait>(
    db: &C,
    id: i32,
    expected_version: i32,
    patch: &RequestPatch,
) -> Result<bool, ModelError> {
    let mut update = Entity::update_many();
    if let Some(status) = patch.status {
        update = update.col_expr(Column::Status, Expr::value(status.as_str()));
    }
    if let Some(professional_id) = patch.professional_id {
        update = update.col_expr(Column::ProfessionalId, Expr::value(professional_id));
    }
    if let Some(done_at) = patch.date_of_completion {
        update = update.col_expr(Column::DateOfCompletion, Expr::value(done_at));
    }
    if let Some(scheduled) = patch.scheduled_date {
        update = update.col_expr(Column::ScheduledDate, Expr::value(scheduled));
    }
    if let Some(remarks) = &patch.remarks {
        update = update.col_expr(Column::Remarks, Expr::value(remarks.clone()));
    }
    let res = update
        .col_expr(Column::Version, Expr::value(expected_version + 1))
        .filter(Column::Id.eq(id))
        .filter(Column::Version.eq(expected_version))
        .exec(db)
        .await?;
    Ok(res.rows_affected == 1)
}
