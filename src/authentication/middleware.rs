use std::sync::Arc;

use warp::{reject::Rejection, Filter};

use crate::{
    cache::is_session_revoked,
    error::{Error, HttpError},
    state::{with_state, State},
};

use super::jwt::{verify_jwt_session, SessionData};

/// Accepts `Token <value>` and `Bearer <value>`.
pub fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    if token.is_empty() {
        return None;
    }
    if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
        Some(token)
    } else {
        None
    }
}

async fn authorize(header: &str, state: &State) -> Result<SessionData, Error> {
    let token = parse_authorization(header)
        .ok_or_else(|| HttpError::Unauthorized.new("Invalid authorization header"))?;
    let session = verify_jwt_session(token, &state.config.secret_key)?;

    if is_session_revoked(&session.jti, &state.cache).await? {
        return Err(HttpError::Unauthorized.new("Invalid session; Token revoked"));
    }

    Ok(session.into())
}

pub fn with_session(
    state: Arc<State>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_state(state))
        .and_then(|header: Option<String>, state: Arc<State>| async move {
            let header = header.ok_or_else(|| HttpError::Unauthorized.default())?;
            let session = authorize(&header, &state).await?;
            Ok::<_, Rejection>(session)
        })
}

/// Anonymous callers pass through as `None`; a present but invalid token is still rejected.
pub fn with_possible_session(
    state: Arc<State>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_state(state))
        .and_then(|header: Option<String>, state: Arc<State>| async move {
            match header {
                Some(header) => Ok::<_, Rejection>(Some(authorize(&header, &state).await?)),
                None => Ok(None),
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_token_and_bearer_schemes() {
        assert_eq!(parse_authorization("Token abc.def"), Some("abc.def"));
        assert_eq!(parse_authorization("bearer abc.def "), Some("abc.def"));
        assert_eq!(parse_authorization("Basic abc"), None);
        assert_eq!(parse_authorization("Token "), None);
        assert_eq!(parse_authorization("abc"), None);
    }
}
