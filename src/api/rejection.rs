use std::convert::Infallible;

use serde_json::json;
use warp::{
    body::BodyDeserializeError,
    http::StatusCode,
    reject::{
        InvalidHeader, InvalidQuery, LengthRequired, MethodNotAllowed, PayloadTooLarge,
        UnsupportedMediaType,
    },
    reply::{self, Response},
    Rejection, Reply,
};

use crate::error::Error;

/// Renders every rejection as a JSON body. Domain errors come first so that a
/// route which matched but failed wins over sibling routes that did not match.
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, body) = if let Some(error) = err.find::<Error>() {
        (error.status(), error.body())
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, json!({ "detail": format!("Malformed request body: {e}") }))
    } else if err.find::<PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, json!({ "detail": "Request body is too large" }))
    } else if err.find::<LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, json!({ "detail": "Content-Length header is required" }))
    } else if err.find::<UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            json!({ "detail": "Expected an application/json body" }),
        )
    } else if err.find::<InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, json!({ "detail": "Invalid query string" }))
    } else if err.find::<InvalidHeader>().is_some() {
        (StatusCode::BAD_REQUEST, json!({ "detail": "Invalid request header" }))
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, json!({ "detail": "Not found" }))
    } else if err.find::<MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, json!({ "detail": "Method not allowed" }))
    } else {
        log::error!("Unhandled rejection: {err:?}");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "detail": "Internal server error" }))
    };

    Ok(reply::with_status(reply::json(&body), status).into_response())
}
