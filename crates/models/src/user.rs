use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    pub full_name: String,
    pub phone_number: String,
    pub address: String,
    pub pin_code: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// A user holds exactly one role for life.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Customer,
    Professional,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Customer => "customer",
            Role::Professional => "professional",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "customer" => Ok(Role::Customer),
            "professional" => Ok(Role::Professional),
            other => Err(ModelError::Validation(format!("invalid role: {other}"))),
        }
    }
}

impl Model {
    pub fn role(&self) -> Result<Role, ModelError> { self.role.parse() }
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub phone_number: String,
    pub address: String,
    pub pin_code: String,
    pub role: Role,
}

pub fn validate_username(username: &str) -> Result<(), ModelError> {
    let len = username.chars().count();
    if !(3..=30).contains(&len) {
        return Err(ModelError::Validation("username must be 3 to 30 characters".into()));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ModelError::Validation("username can only contain letters, numbers and underscores".into()));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ModelError> {
    let invalid = || ModelError::Validation("invalid email".into());
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()) => Ok(()),
        _ => Err(invalid()),
    }
}

pub fn validate_full_name(full_name: &str) -> Result<(), ModelError> {
    let len = full_name.chars().count();
    if !(2..=100).contains(&len) {
        return Err(ModelError::Validation("full name must be 2 to 100 characters".into()));
    }
    if !full_name.chars().all(|c| c.is_alphabetic() || c == ' ') {
        return Err(ModelError::Validation("full name can only contain letters and spaces".into()));
    }
    Ok(())
}

/// Separators (spaces, dashes, parentheses) are ignored when counting digits.
pub fn validate_phone_number(phone: &str) -> Result<(), ModelError> {
    if !phone.chars().all(|c| c.is_ascii_digit() || "+-() ".contains(c)) {
        return Err(ModelError::Validation("phone number contains invalid characters".into()));
    }
    let digits = phone.chars().filter(|c| !" -()".contains(*c)).count();
    if !(10..=15).contains(&digits) {
        return Err(ModelError::Validation("phone number must be 10 to 15 digits".into()));
    }
    Ok(())
}

pub fn validate_address(address: &str) -> Result<(), ModelError> {
    let len = address.trim().chars().count();
    if !(5..=200).contains(&len) {
        return Err(ModelError::Validation("address must be 5 to 200 characters".into()));
    }
    Ok(())
}

pub fn validate_pin_code(pin_code: &str) -> Result<(), ModelError> {
    if !(6..=10).contains(&pin_code.len()) || !pin_code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ModelError::Validation("pin code must be 6 to 10 digits".into()));
    }
    Ok(())
}

pub fn validate_new(input: &NewUser) -> Result<(), ModelError> {
    validate_username(&input.username)?;
    validate_email(&input.email)?;
    validate_full_name(&input.full_name)?;
    validate_phone_number(&input.phone_number)?;
    validate_address(&input.address)?;
    validate_pin_code(&input.pin_code)?;
    Ok(())
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewUser) -> Result<Model, ModelError> {
    validate_new(&input)?;
    let am = ActiveModel {
        username: Set(input.username),
        email: Set(input.email.to_lowercase()),
        full_name: Set(input.full_name),
        phone_number: Set(input.phone_number),
        address: Set(input.address),
        pin_code: Set(input.pin_code),
        role: Set(input.role.as_str().to_string()),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    };
    Ok(am.insert(db).await?)
}

pub async fn find_by_username<C: ConnectionTrait>(db: &C, username: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::Username.eq(username)).one(db).await?)
}

pub async fn find_by_email<C: ConnectionTrait>(db: &C, email: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::Email.eq(email.to_lowercase())).one(db).await?)
}

/// Look a user up by username, falling back to email.
pub async fn find_by_login<C: ConnectionTrait>(db: &C, login: &str) -> Result<Option<Model>, ModelError> {
    if let Some(user) = find_by_username(db, login).await? {
        return Ok(Some(user));
    }
    find_by_email(db, login).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewUser {
        NewUser {
            username: "jane_doe".into(),
            email: "jane@example.com".into(),
            full_name: "Jane Doe".into(),
            phone_number: "+91 98765-43210".into(),
            address: "12 Main Street".into(),
            pin_code: "560001".into(),
            role: Role::Customer,
        }
    }

    #[test]
    fn accepts_well_formed_user() {
        assert!(validate_new(&sample()).is_ok());
    }

    #[test]
    fn rejects_malformed_fields() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_full_name("R2D2").is_err());
        assert!(validate_phone_number("12345").is_err());
        assert!(validate_phone_number("98765x43210").is_err());
        assert!(validate_address("x").is_err());
        assert!(validate_pin_code("56A001").is_err());
    }

    #[test]
    fn role_parses_known_values_only() {
        assert_eq!("professional".parse::<Role>().unwrap(), Role::Professional);
        assert!("superuser".parse::<Role>().is_err());
    }

    #[tokio::test]
    async fn create_lowercases_email_and_finds_by_login() {
        let db = crate::db::connect_in_memory().await.unwrap();
        let mut input = sample();
        input.email = "Jane@Example.com".into();
        let u = create(&db, input).await.unwrap();
        assert_eq!(u.email, "jane@example.com");
        assert!(u.is_active);
        assert_eq!(u.role().unwrap(), Role::Customer);

        let by_name = find_by_login(&db, "jane_doe").await.unwrap().unwrap();
        let by_mail = find_by_login(&db, "JANE@example.com").await.unwrap().unwrap();
        assert_eq!(by_name.id, u.id);
        assert_eq!(by_mail.id, u.id);
    }

    #[tokio::test]
    async fn duplicate_username_is_a_db_error() {
        let db = crate::db::connect_in_memory().await.unwrap();
        create(&db, sample()).await.unwrap();
        let mut dup = sample();
        dup.email = "other@example.com".into();
        assert!(matches!(create(&db, dup).await, Err(ModelError::Db(_))));
    }
}
