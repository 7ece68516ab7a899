use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::error::Error;
use crate::schema::{Id, User, UserRole};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String, role: UserRole, lifetime_hours: i64) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(lifetime_hours)).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }
}

/// The requesting user, passed explicitly into every operation that needs one.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            username: value.username,
            is_admin: value.role == UserRole::Admin,
            role: value.role,
        }
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, Error> {
    Hmac::new_from_slice(secret.as_bytes())
        .map_err(|_| Error::Internal("Invalid session key".to_string()))
}

pub fn generate_jwt_session(user: &User, secret: &str, lifetime_hours: i64) -> Result<String, Error> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(
        user.id,
        user.username.to_owned(),
        user.role.to_owned(),
        lifetime_hours,
    );

    claims
        .sign_with_key(&key)
        .map_err(|e| Error::Internal(format!("Could not sign session: {e}")))
}

pub fn verify_jwt_session(token: &str, secret: &str) -> Result<JwtSessionData, Error> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| Error::Unauthorized("Invalid session; Invalid token".to_string()))?;

    let now = Local::now().timestamp();
    if (session.exp - now).is_negative() {
        return Err(Error::Unauthorized(
            "Invalid session; Token expired".to_string(),
        ));
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            email: "cook@example.com".to_string(),
            username: "cook".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Cook".to_string(),
            password: String::new(),
            role: UserRole::Admin,
            avatar: None,
        }
    }

    #[test]
    fn round_trip() {
        let token = generate_jwt_session(&user(), "secret", 1).unwrap();
        let session: SessionData = verify_jwt_session(&token, "secret").unwrap().into();
        assert_eq!(session.user_id, 7);
        assert!(session.is_admin);
    }

    #[test]
    fn wrong_key_and_expiry() {
        let token = generate_jwt_session(&user(), "secret", 1).unwrap();
        assert!(matches!(
            verify_jwt_session(&token, "other"),
            Err(Error::Unauthorized(_))
        ));

        let expired = generate_jwt_session(&user(), "secret", -1).unwrap();
        assert!(matches!(
            verify_jwt_session(&expired, "secret"),
            Err(Error::Unauthorized(_))
        ));
    }
}
