use serde::Serialize;
use warp::{
    filters::BoxedFilter,
    http::StatusCode,
    reply::{self, Response},
    Filter, Reply,
};

use crate::{constants::MAX_BODY_BYTES, form::FormData};

pub type Handled = Result<Response, warp::Rejection>;

pub fn ok<T: Serialize>(value: &T) -> Response {
    reply::json(value).into_response()
}

pub fn created<T: Serialize>(value: &T) -> Response {
    reply::with_status(reply::json(value), StatusCode::CREATED).into_response()
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// JSON object bodies up to `MAX_BODY_BYTES`.
pub fn form_body() -> BoxedFilter<(FormData,)> {
    warp::body::content_length_limit(MAX_BODY_BYTES)
        .and(warp::body::json::<FormData>())
        .boxed()
}

/// Raw query pairs, repeated keys kept in order.
pub fn query_pairs() -> BoxedFilter<(Vec<(String, String)>,)> {
    warp::query::<Vec<(String, String)>>().boxed()
}

pub fn find_param<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, value)| value.as_str())
}

/// `recipes_limit` query parameter; absent, negative or garbled values mean no limit.
pub fn recipes_limit(pairs: &[(String, String)]) -> Option<i64> {
    find_param(pairs, "recipes_limit")
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|limit| *limit >= 0)
}
