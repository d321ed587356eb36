use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;
use uuid::Uuid;

use crate::error::{Error, HttpError};
use crate::schema::{Id, User, UserRole};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub email: String,
    pub role: UserRole,
    pub jti: String,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, email: String, role: UserRole, lifetime: Duration) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            email,
            role,
            jti: Uuid::new_v4().to_string(),
            iat,
            exp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: Id,
    pub email: String,
    pub role: UserRole,
    pub jti: String,
    pub exp: i64,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(self) {
            return Err(
                HttpError::Forbidden.new("You don't have permission to perform this action")
            );
        }
        Ok(())
    }

    /// Seconds until the token expires, at least one.
    pub fn remaining_seconds(&self) -> u64 {
        (self.exp - Local::now().timestamp()).max(1) as u64
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            email: value.email,
            role: value.role,
            jti: value.jti,
            exp: value.exp,
        }
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, Error> {
    Hmac::new_from_slice(secret.as_bytes()).map_err(|e| {
        log::error!("Invalid signing key: {e}");
        HttpError::InternalServerError.default()
    })
}

pub fn generate_jwt_session(
    user: &User,
    secret: &str,
    lifetime_hours: i64,
) -> Result<String, Error> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(
        user.id,
        user.email.to_owned(),
        user.role,
        Duration::hours(lifetime_hours),
    );

    claims.sign_with_key(&key).map_err(|e| {
        log::error!("Failed to sign session: {e}");
        HttpError::InternalServerError.default()
    })
}

pub fn verify_jwt_session(token: &str, secret: &str) -> Result<JwtSessionData, Error> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| HttpError::Unauthorized.new("Invalid session; Invalid token"))?;

    let now = Local::now().timestamp();
    if (session.exp - now).is_negative() {
        return Err(HttpError::Unauthorized.new("Invalid session; Token expired"));
    }

    Ok(session)
}
