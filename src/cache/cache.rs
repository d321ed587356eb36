use std::fmt::{self, Display};

use chrono::Local;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    jwt::SessionData,
    schema::Id,
};

// Caching - keys

#[derive(Clone, Debug)]
pub struct CacheKey<T: Display> {
    _value: T,
    _type: CacheKeyType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheKeyType {
    RevokedSession,
}

impl CacheKeyType {
    pub fn new<T: Display>(self, key: T) -> CacheKey<T> {
        CacheKey {
            _value: key,
            _type: self,
        }
    }
}

impl<T: Display> Display for CacheKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self._type {
            CacheKeyType::RevokedSession => write!(f, "revoked-session-{}", self._value),
        }
    }
}

// Cache - values

#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone, Debug, PartialEq)]
pub struct RevokedSession {
    pub user_id: Id,
    pub revoked_at: i64,
}

async fn connect(cache: &Client) -> Result<MultiplexedConnection, Error> {
    Ok(cache.get_multiplexed_async_connection().await?)
}

/// Marks the session id as revoked until the token would have expired anyway.
pub async fn revoke_session(session: &SessionData, cache: &Client) -> Result<(), Error> {
    let mut connection = connect(cache).await?;
    let key = CacheKeyType::RevokedSession.new(&session.jti).to_string();
    let value = RevokedSession {
        user_id: session.user_id,
        revoked_at: Local::now().timestamp(),
    };

    connection
        .set_ex::<_, _, ()>(key, value, session.remaining_seconds())
        .await?;

    log::info!("Revoked session of user {}", session.user_id);
    Ok(())
}

pub async fn get_revoked_session(jti: &str, cache: &Client) -> Result<Option<RevokedSession>, Error> {
    let mut connection = connect(cache).await?;
    let key = CacheKeyType::RevokedSession.new(jti).to_string();

    Ok(connection.get::<_, Option<RevokedSession>>(key).await?)
}

pub async fn is_session_revoked(jti: &str, cache: &Client) -> Result<bool, Error> {
    Ok(get_revoked_session(jti, cache).await?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        let key = CacheKeyType::RevokedSession.new("0b7c");
        assert_eq!(key.to_string(), "revoked-session-0b7c");
    }
}
