use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use serde_json::{json, Value};
use warp::{
    http::StatusCode,
    reject::{Reject, Rejection},
};

/// Field name -> list of messages, rendered as the body of a 400 response.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, thiserror::Error)]
#[error("{code}: {}", .info.as_deref().unwrap_or("no details"))]
pub struct Error {
    pub code: u16,
    pub info: Option<String>,
    pub fields: Option<FieldErrors>,
}

impl Error {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn body(&self) -> Value {
        match &self.fields {
            Some(fields) => json!(fields),
            None => json!({ "detail": self.info.as_deref().unwrap_or("") }),
        }
    }
}

impl Reject for Error {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    InvalidRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    InternalServerError,
}

impl HttpError {
    pub fn code(self) -> u16 {
        match self {
            HttpError::InvalidRequest => 400,
            HttpError::Unauthorized => 401,
            HttpError::Forbidden => 403,
            HttpError::NotFound => 404,
            HttpError::InternalServerError => 500,
        }
    }

    pub fn new(self, info: &str) -> Error {
        Error {
            code: self.code(),
            info: Some(info.to_string()),
            fields: None,
        }
    }

    pub fn default(self) -> Error {
        self.new(match self {
            HttpError::InvalidRequest => "Invalid request",
            HttpError::Unauthorized => "Authentication credentials were not provided",
            HttpError::Forbidden => "You do not have permission to perform this action",
            HttpError::NotFound => "Not found",
            HttpError::InternalServerError => "Internal server error",
        })
    }

    /// Single field error, e.g. `{"email": ["..."]}`.
    pub fn field(self, field: &str, message: &str) -> Error {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![message.to_string()]);
        self.fields(fields)
    }

    pub fn fields(self, fields: FieldErrors) -> Error {
        Error {
            code: self.code(),
            info: Some(String::from("Validation failed")),
            fields: Some(fields),
        }
    }
}

pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => match e.constraint() {
                Some(constraint) => Self::new(format!("{e} ({constraint})")),
                None => Self::new(format!("{e}")),
            },
            sqlx::Error::RowNotFound => Self::new(String::from("RowNotFound")),
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            e => Self::new(format!("{e}")),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        log::error!("Query failed: {}", value.info);
        HttpError::InternalServerError.default()
    }
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        QueryError::from(value).into()
    }
}

pub struct CacheError {
    info: String,
}

impl From<redis::RedisError> for CacheError {
    fn from(value: redis::RedisError) -> Self {
        Self {
            info: format!("{:?} - {:?}", value.code(), value.detail()),
        }
    }
}

impl From<CacheError> for Error {
    fn from(value: CacheError) -> Self {
        log::error!("Cache operation failed: {}", value.info);
        HttpError::InternalServerError.default()
    }
}

impl From<redis::RedisError> for Error {
    fn from(value: redis::RedisError) -> Self {
        CacheError::from(value).into()
    }
}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }

    pub fn info(&self) -> &str {
        &self.info
    }
}

impl From<TypeError> for Error {
    fn from(value: TypeError) -> Self {
        HttpError::InvalidRequest.new(&value.info)
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

impl From<TypeError> for Rejection {
    fn from(value: TypeError) -> Self {
        Error::from(value).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_render_as_object() {
        let error = HttpError::InvalidRequest.field("tags", "This list may not be empty.");

        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.body(), json!({ "tags": ["This list may not be empty."] }));
    }

    #[test]
    fn plain_errors_render_detail() {
        let error = HttpError::NotFound.new("No recipe exists with specified id");

        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            error.body(),
            json!({ "detail": "No recipe exists with specified id" })
        );
    }

    #[test]
    fn errors_travel_inside_rejections() {
        let rejection: Rejection = HttpError::Forbidden.default().into();
        let error = rejection.find::<Error>().unwrap();

        assert_eq!(error.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn query_errors_hide_details() {
        let error: Error = QueryError::new(String::from("relation does not exist")).into();

        assert_eq!(error.code, 500);
        assert_eq!(error.body(), json!({ "detail": "Internal server error" }));
    }
}
