use std::sync::Arc;

use serde_json::json;
use warp::{filters::BoxedFilter, reply::Response, Filter, Reply};

use crate::{
    actions::{
        add_to_favorites, add_to_shopping_cart, create_recipe, delete_recipe, fetch_recipes,
        get_or_create_short_link, get_recipe, get_recipe_mut, get_short_recipe, get_user_by_id,
        list_shopping_list_rows, load_recipes, remove_from_favorites, remove_from_shopping_cart,
        update_recipe, validate_references,
    },
    authentication::{
        middleware::{with_possible_session, with_session},
        permissions::ActionType,
    },
    constants::RECIPE_IMAGE_DIR,
    error::{Error, HttpError},
    form::{FormData, NewRecipe, RecipeUpdate},
    jwt::SessionData,
    media::{remove_image, store_image},
    pagination::{Page, PageContext},
    schema::{Id, Recipe, RecipeFilter},
    shopping_list,
    state::{with_state, State},
};

use super::reply::{created, form_body, no_content, ok, query_pairs, Handled};

pub fn routes(state: Arc<State>) -> BoxedFilter<(Response,)> {
    let list = warp::path!("api" / "recipes")
        .and(warp::get())
        .and(with_possible_session(state.clone()))
        .and(query_pairs())
        .and(with_state(state.clone()))
        .and_then(list_recipes);

    let create = warp::path!("api" / "recipes")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and(form_body())
        .and_then(create);

    let download = warp::path!("api" / "recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(download_shopping_cart);

    let detail = warp::path!("api" / "recipes" / Id)
        .and(warp::get())
        .and(with_possible_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(recipe_detail);

    let update = warp::path!("api" / "recipes" / Id)
        .and(warp::patch())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and(form_body())
        .and_then(update);

    let delete = warp::path!("api" / "recipes" / Id)
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(delete);

    let short_link = warp::path!("api" / "recipes" / Id / "get-link")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(short_link);

    let favorite = warp::path!("api" / "recipes" / Id / "favorite")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(favorite);

    let unfavorite = warp::path!("api" / "recipes" / Id / "favorite")
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(unfavorite);

    let add_to_cart = warp::path!("api" / "recipes" / Id / "shopping_cart")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(add_to_cart);

    let remove_from_cart = warp::path!("api" / "recipes" / Id / "shopping_cart")
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state))
        .and_then(remove_from_cart);

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(detail)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(short_link)
        .unify()
        .or(favorite)
        .unify()
        .or(unfavorite)
        .unify()
        .or(add_to_cart)
        .unify()
        .or(remove_from_cart)
        .unify()
        .boxed()
}

async fn list_recipes(
    session: Option<SessionData>,
    pairs: Vec<(String, String)>,
    state: Arc<State>,
) -> Handled {
    let filter = RecipeFilter::from_pairs(&pairs);
    let page = Page::from_pairs(&pairs);

    let query = filter.to_query();
    let base_url = if query.is_empty() {
        format!("{}/api/recipes/", state.config.public_url)
    } else {
        format!("{}/api/recipes/?{query}", state.config.public_url)
    };

    let viewer = session.map(|s| s.user_id);
    let rows = fetch_recipes(&filter, viewer, page, &base_url, &state.pool).await?;
    let results = load_recipes(rows.results, &state.config.public_url, &state.pool).await?;

    Ok(ok(&PageContext {
        count: rows.count,
        next: rows.next,
        previous: rows.previous,
        results,
    }))
}

async fn load_recipe(id: Id, viewer: Option<Id>, state: &State) -> Result<Recipe, Error> {
    get_recipe(id, viewer, &state.config.public_url, &state.pool)
        .await?
        .ok_or_else(|| HttpError::NotFound.new("No recipe exists with specified id"))
}

async fn recipe_detail(id: Id, session: Option<SessionData>, state: Arc<State>) -> Handled {
    let recipe = load_recipe(id, session.map(|s| s.user_id), &state).await?;
    Ok(ok(&recipe))
}

async fn create(session: SessionData, state: Arc<State>, data: FormData) -> Handled {
    session.authenticate(ActionType::CreateRecipes)?;

    let recipe = NewRecipe::parse(data)?;
    validate_references(&recipe.ingredients, &recipe.tags, &state.pool).await?;

    let media_root = &state.config.media_root;
    let image = store_image(media_root, RECIPE_IMAGE_DIR, &recipe.image).await?;

    let id = match create_recipe(session.user_id, &recipe, &image, &state.pool).await {
        Ok(id) => id,
        Err(e) => {
            remove_image(media_root, &image).await;
            return Err(e.into());
        }
    };

    Ok(created(&load_recipe(id, Some(session.user_id), &state).await?))
}

async fn update(id: Id, session: SessionData, state: Arc<State>, data: FormData) -> Handled {
    let owner = get_recipe_mut(id, &session, &state.pool).await?;

    let update = RecipeUpdate::parse(data)?;
    validate_references(&update.ingredients, &update.tags, &state.pool).await?;

    let media_root = &state.config.media_root;
    let image = match &update.image {
        Some(image) => Some(store_image(media_root, RECIPE_IMAGE_DIR, image).await?),
        None => None,
    };

    if let Err(e) = update_recipe(id, &update, image.as_deref(), &state.pool).await {
        if let Some(image) = &image {
            remove_image(media_root, image).await;
        }
        return Err(e.into());
    }
    if image.is_some() {
        remove_image(media_root, &owner.image).await;
    }

    Ok(ok(&load_recipe(id, Some(session.user_id), &state).await?))
}

async fn delete(id: Id, session: SessionData, state: Arc<State>) -> Handled {
    let owner = get_recipe_mut(id, &session, &state.pool).await?;

    delete_recipe(owner.id, &state.pool).await?;
    remove_image(&state.config.media_root, &owner.image).await;

    Ok(no_content())
}

async fn short_link(id: Id, state: Arc<State>) -> Handled {
    if get_short_recipe(id, &state.pool).await?.is_none() {
        return Err(HttpError::NotFound.new("No recipe exists with specified id").into());
    }

    let code = get_or_create_short_link(id, &state.pool).await?;
    Ok(ok(&json!({
        "short-link": format!("{}/s/{code}", state.config.public_url)
    })))
}

async fn favorite(id: Id, session: SessionData, state: Arc<State>) -> Handled {
    session.authenticate(ActionType::ManageOwnFavorites)?;

    let recipe = add_to_favorites(id, session.user_id, &state.pool).await?;
    Ok(created(&recipe.into_short(&state.config.public_url)))
}

async fn unfavorite(id: Id, session: SessionData, state: Arc<State>) -> Handled {
    session.authenticate(ActionType::ManageOwnFavorites)?;

    remove_from_favorites(id, session.user_id, &state.pool).await?;
    Ok(no_content())
}

async fn add_to_cart(id: Id, session: SessionData, state: Arc<State>) -> Handled {
    session.authenticate(ActionType::ManageOwnShoppingCart)?;

    let recipe = add_to_shopping_cart(id, session.user_id, &state.pool).await?;
    Ok(created(&recipe.into_short(&state.config.public_url)))
}

async fn remove_from_cart(id: Id, session: SessionData, state: Arc<State>) -> Handled {
    session.authenticate(ActionType::ManageOwnShoppingCart)?;

    remove_from_shopping_cart(id, session.user_id, &state.pool).await?;
    Ok(no_content())
}

async fn download_shopping_cart(session: SessionData, state: Arc<State>) -> Handled {
    session.authenticate(ActionType::ManageOwnShoppingCart)?;

    let user = get_user_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| HttpError::Unauthorized.new("User no longer exists"))?;

    let rows = list_shopping_list_rows(user.id, &state.pool).await?;
    let text = shopping_list::render(&shopping_list::aggregate(rows));

    Ok(warp::reply::with_header(
        text,
        "content-disposition",
        format!(
            "attachment; filename={}",
            shopping_list::file_name(&user.username)
        ),
    )
    .into_response())
}
