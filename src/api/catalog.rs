use std::sync::Arc;

use warp::{filters::BoxedFilter, reply::Response, Filter};

use crate::{
    actions::{get_ingredient, get_tag, list_ingredients, list_tags},
    error::HttpError,
    schema::Id,
    state::{with_state, State},
};

use super::reply::{find_param, ok, query_pairs, Handled};

pub fn routes(state: Arc<State>) -> BoxedFilter<(Response,)> {
    let tags = warp::path!("api" / "tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(tag_list);

    let tag = warp::path!("api" / "tags" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(tag_detail);

    let ingredients = warp::path!("api" / "ingredients")
        .and(warp::get())
        .and(query_pairs())
        .and(with_state(state.clone()))
        .and_then(ingredient_list);

    let ingredient = warp::path!("api" / "ingredients" / Id)
        .and(warp::get())
        .and(with_state(state))
        .and_then(ingredient_detail);

    tags.or(tag)
        .unify()
        .or(ingredients)
        .unify()
        .or(ingredient)
        .unify()
        .boxed()
}

async fn tag_list(state: Arc<State>) -> Handled {
    Ok(ok(&list_tags(&state.pool).await?))
}

async fn tag_detail(id: Id, state: Arc<State>) -> Handled {
    let tag = get_tag(id, &state.pool)
        .await?
        .ok_or_else(|| HttpError::NotFound.default())?;

    Ok(ok(&tag))
}

async fn ingredient_list(pairs: Vec<(String, String)>, state: Arc<State>) -> Handled {
    let name = find_param(&pairs, "name");
    Ok(ok(&list_ingredients(name, &state.pool).await?))
}

async fn ingredient_detail(id: Id, state: Arc<State>) -> Handled {
    let ingredient = get_ingredient(id, &state.pool)
        .await?
        .ok_or_else(|| HttpError::NotFound.default())?;

    Ok(ok(&ingredient))
}
