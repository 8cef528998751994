#![cfg(test)]
use chrono::{Duration, Utc};
use sea_orm::{DatabaseConnection, EntityTrait};

use models::{customer, db::connect_in_memory, professional, service, service_request, user};

/// In-memory database seeded with one service, one customer and one verified professional.
pub struct Seed {
    pub db: DatabaseConnection,
    pub service: service::Model,
    pub customer_user: user::Model,
    pub customer: customer::Model,
    pub pro_user: user::Model,
    pub professional: professional::Model,
}

pub fn new_user(username: &str, role: user::Role) -> user::NewUser {
    user::NewUser {
        username: username.into(),
        email: format!("{username}@example.com"),
        full_name: "Test Person".into(),
        phone_number: "9876543210".into(),
        address: "12 Park Street".into(),
        pin_code: "560001".into(),
        role,
    }
}

pub async fn add_service(db: &DatabaseConnection, name: &str) -> anyhow::Result<service::Model> {
    Ok(service::create(
        db,
        service::ServiceInput {
            name: name.into(),
            price: 350.0,
            time_required: 2,
            description: format!("{name} at home"),
        },
    )
    .await?)
}

pub async fn add_customer(db: &DatabaseConnection, username: &str) -> anyhow::Result<(user::Model, customer::Model)> {
    let u = user::create(db, new_user(username, user::Role::Customer)).await?;
    let c = customer::create(db, u.id).await?;
    Ok((u, c))
}

pub async fn add_professional(
    db: &DatabaseConnection,
    username: &str,
    service_id: i32,
    verified: bool,
) -> anyhow::Result<(user::Model, professional::Model)> {
    let u = user::create(db, new_user(username, user::Role::Professional)).await?;
    let mut p = professional::create(
        db,
        professional::NewProfessional {
            user_id: u.id,
            service_id,
            experience: 5,
            description: "Ten years of household repairs".into(),
        },
    )
    .await?;
    if verified {
        p = professional::toggle_verified(db, p.id).await?;
    }
    Ok((u, p))
}

pub async fn seed() -> anyhow::Result<Seed> {
    let db = connect_in_memory().await?;
    let service = add_service(&db, "Plumbing").await?;
    let (customer_user, customer) = add_customer(&db, "cust_one").await?;
    let (pro_user, professional) = add_professional(&db, "pro_one", service.id, true).await?;
    Ok(Seed { db, service, customer_user, customer, pro_user, professional })
}

/// A fresh `requested` request by `customer_user` for the first catalog service.
pub async fn new_request(db: &DatabaseConnection, customer_user: &user::Model) -> anyhow::Result<service_request::Model> {
    let customer = customer::find_by_user(db, customer_user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no customer profile"))?;
    let service = service::Entity::find()
        .one(db)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no service"))?;
    Ok(service_request::create(
        db,
        service_request::NewServiceRequest {
            service_id: service.id,
            customer_id: customer.id,
            scheduled_date: (Utc::now() + Duration::days(1)).into(),
            remarks: String::new(),
            address: customer_user.address.clone(),
            pin_code: customer_user.pin_code.clone(),
        },
    )
    .await?)
}

/// Drive a request straight to `completed` by the given professional.
pub async fn complete_request(
    db: &DatabaseConnection,
    request: &service_request::Model,
    professional_id: i32,
) -> anyhow::Result<service_request::Model> {
    let patch = service_request::RequestPatch {
        status: Some(models::RequestStatus::Completed),
        professional_id: Some(Some(professional_id)),
        date_of_completion: Some(Some(Utc::now().into())),
        ..Default::default()
    };
    anyhow::ensure!(service_request::update_if_version(db, request.id, request.version, &patch).await?);
    service_request::Entity::find_by_id(request.id)
        .one(db)
        .await?
        .ok_or_else(|| anyhow::anyhow!("request vanished"))
}
