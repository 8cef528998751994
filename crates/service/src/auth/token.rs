//! HS256 bearer tokens carrying the user id and role.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use super::domain::{AuthContext, AuthUser, Claims};
use super::errors::AuthError;

pub fn issue(secret: &str, ttl_hours: i64, user: &AuthUser) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role,
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(ttl_hours)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AuthError::TokenError(e.to_string()))
}

/// Verify signature and expiry, then resolve the caller.
pub fn verify(secret: &str, token: &str) -> Result<AuthContext, AuthError> {
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map_err(|_| AuthError::Unauthorized)?;
    let user_id = data.claims.sub.parse::<i32>().map_err(|_| AuthError::Unauthorized)?;
    Ok(AuthContext { user_id, role: data.claims.role })
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::user::Role;

    fn user() -> AuthUser {
        AuthUser {
            id: 7,
            username: "pro_one".into(),
            email: "pro@example.com".into(),
            full_name: "Pro One".into(),
            role: Role::Professional,
            is_active: true,
        }
    }

    #[test]
    fn issued_token_verifies_to_same_caller() {
        let token = issue("secret", 1, &user()).unwrap();
        let ctx = verify("secret", &token).unwrap();
        assert_eq!(ctx, AuthContext { user_id: 7, role: Role::Professional });
    }

    #[test]
    fn wrong_secret_or_expired_token_is_unauthorized() {
        let token = issue("secret", 1, &user()).unwrap();
        assert!(matches!(verify("other", &token), Err(AuthError::Unauthorized)));
        let expired = issue("secret", -2, &user()).unwrap();
        assert!(matches!(verify("secret", &expired), Err(AuthError::Unauthorized)));
    }
}
