use std::{convert::Infallible, sync::Arc};

use warp::{Filter, Reply};

use crate::state::State;

use super::{catalog, links, recipes, rejection::handle_rejection, users};

/// Every HTTP route of the service with JSON error recovery and request logging.
pub fn routes(state: Arc<State>) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    users::routes(state.clone())
        .or(catalog::routes(state.clone()))
        .unify()
        .or(recipes::routes(state.clone()))
        .unify()
        .or(links::routes(state))
        .unify()
        .recover(handle_rejection)
        .with(warp::log("foodgram::api"))
}
