use std::sync::Arc;

use warp::{filters::BoxedFilter, http::Uri, reply::Response, Filter, Reply};

use crate::{
    actions::resolve_short_link,
    error::HttpError,
    state::{with_state, State},
};

use super::reply::Handled;

/// Short link redirects and uploaded media.
pub fn routes(state: Arc<State>) -> BoxedFilter<(Response,)> {
    let redirect = warp::path!("s" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(follow_short_link);

    let media = warp::path("media")
        .and(warp::get())
        .and(warp::fs::dir(state.config.media_root.clone()))
        .map(|file: warp::fs::File| file.into_response());

    redirect.or(media).unify().boxed()
}

async fn follow_short_link(code: String, state: Arc<State>) -> Handled {
    let id = resolve_short_link(&code, &state.pool)
        .await?
        .ok_or_else(|| HttpError::NotFound.default())?;

    let target: Uri = format!("{}/recipes/{id}/", state.config.public_url)
        .parse()
        .map_err(|e| {
            log::error!("PUBLIC_URL does not form a valid redirect target: {e}");
            HttpError::InternalServerError.default()
        })?;

    Ok(warp::redirect::found(target).into_response())
}
