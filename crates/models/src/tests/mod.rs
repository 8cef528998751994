

use chrono::{Duration, Utc};
use sea_orm::DatabaseConnection;

use crate::{customer, professional, service, service_request, user};

/// Customer, verified professional and a service they both point at.
pub(crate) struct Fixture {
    pub db: DatabaseConnection,
    pub service: service::Model,
    pub customer: customer::Model,
    pub professional: professional::Model,
}

pub(crate) fn new_user(username: &str, role: user::Role) -> user::NewUser {
    user::NewUser {
        username: username.into(),
        email: format!("{username}@example.com"),
        full_name: "Test Person".into(),
        phone_number: "9876543210".into(),
        address: "221B Baker Street".into(),
        pin_code: "400001".into(),
        role,
    }
}

pub(crate) async fn fixture() -> anyhow::Result<Fixture> {
    let db = crate::db::connect_in_memory().await?;
    let service = service::create(
        &db,
        service::ServiceInput { name: "Plumbing".into(), price: 499.0, time_required: 2, description: String::new() },
    )
    .await?;
    let cu = user::create(&db, new_user("cust_one", user::Role::Customer)).await?;
    let customer = customer::create(&db, cu.id).await?;
    let pu = user::create(&db, new_user("pro_one", user::Role::Professional)).await?;
    let professional = professional::create(
        &db,
        professional::NewProfessional {
            user_id: pu.id,
            service_id: service.id,
            experience: 4,
            description: "Fixes leaking pipes".into(),
        },
    )
    .await?;
    Ok(Fixture { db, service, customer, professional })
}

pub(crate) async fn new_request(f: &Fixture) -> anyhow::Result<service_request::Model> {
    Ok(service_request::create(
        &f.db,
        service_request::NewServiceRequest {
            service_id: f.service.id,
            customer_id: f.customer.id,
            scheduled_date: (Utc::now() + Duration::days(2)).into(),
            remarks: String::new(),
            address: "221B Baker Street".into(),
            pin_code: "400001".into(),
        },
    )
    .await?)
}
