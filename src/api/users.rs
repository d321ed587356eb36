use std::sync::Arc;

use warp::{filters::BoxedFilter, reply::Response, Filter};

use crate::{
    actions::{
        fetch_subscriptions, fetch_users, get_user_by_id, get_user_row, load_subscriptions,
        login_user, register_user, set_avatar, set_password, subscribe, unsubscribe,
    },
    authentication::{
        cryptography::{hash_password, verify_password},
        middleware::{with_possible_session, with_session},
        permissions::ActionType,
    },
    cache::revoke_session,
    constants::AVATAR_IMAGE_DIR,
    error::{Error, HttpError},
    form::{AvatarForm, FormData, LoginForm, PasswordForm, UserForm},
    jwt::SessionData,
    media::{media_url, remove_image, store_image},
    pagination::{Page, PageContext},
    schema::{AuthToken, Avatar, Id},
    state::{with_state, State},
};

use super::reply::{created, form_body, no_content, ok, query_pairs, recipes_limit, Handled};

pub fn routes(state: Arc<State>) -> BoxedFilter<(Response,)> {
    let login = warp::path!("api" / "auth" / "token" / "login")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(form_body())
        .and_then(login);

    let logout = warp::path!("api" / "auth" / "token" / "logout")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(logout);

    let list = warp::path!("api" / "users")
        .and(warp::get())
        .and(with_possible_session(state.clone()))
        .and(query_pairs())
        .and(with_state(state.clone()))
        .and_then(list_users);

    let register = warp::path!("api" / "users")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(form_body())
        .and_then(register);

    let me = warp::path!("api" / "users" / "me")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(current_user);

    let put_avatar = warp::path!("api" / "users" / "me" / "avatar")
        .and(warp::put())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and(form_body())
        .and_then(update_avatar);

    let delete_avatar = warp::path!("api" / "users" / "me" / "avatar")
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(delete_avatar);

    let password = warp::path!("api" / "users" / "set_password")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and(form_body())
        .and_then(change_password);

    let subscriptions = warp::path!("api" / "users" / "subscriptions")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(query_pairs())
        .and(with_state(state.clone()))
        .and_then(list_subscriptions);

    let detail = warp::path!("api" / "users" / Id)
        .and(warp::get())
        .and(with_possible_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(user_detail);

    let post_subscribe = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(query_pairs())
        .and(with_state(state.clone()))
        .and_then(create_subscription);

    let delete_subscribe = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state))
        .and_then(delete_subscription);

    login
        .or(logout)
        .unify()
        .or(list)
        .unify()
        .or(register)
        .unify()
        .or(me)
        .unify()
        .or(put_avatar)
        .unify()
        .or(delete_avatar)
        .unify()
        .or(password)
        .unify()
        .or(subscriptions)
        .unify()
        .or(detail)
        .unify()
        .or(post_subscribe)
        .unify()
        .or(delete_subscribe)
        .unify()
        .boxed()
}

async fn login(state: Arc<State>, data: FormData) -> Handled {
    let form = LoginForm::parse(data)?;
    let token = login_user(
        &form,
        &state.config.secret_key,
        state.config.session_lifetime_hours,
        &state.pool,
    )
    .await?;

    Ok(ok(&AuthToken { auth_token: token }))
}

async fn logout(session: SessionData, state: Arc<State>) -> Handled {
    revoke_session(&session, &state.cache).await?;
    Ok(no_content())
}

async fn list_users(
    session: Option<SessionData>,
    pairs: Vec<(String, String)>,
    state: Arc<State>,
) -> Handled {
    let page = Page::from_pairs(&pairs);
    let base_url = format!("{}/api/users/", state.config.public_url);
    let viewer = session.map(|s| s.user_id);

    let users = fetch_users(viewer, page, &base_url, &state.pool).await?;
    Ok(ok(&users.map(|row| row.into_profile(&state.config.public_url))))
}

fn hash(password: &str) -> Result<String, Error> {
    hash_password(password).map_err(|e| {
        log::error!("Failed to hash password: {e}");
        HttpError::InternalServerError.default()
    })
}

async fn register(state: Arc<State>, data: FormData) -> Handled {
    let form = UserForm::parse(data)?;
    let password_hash = hash(&form.password)?;

    let user = register_user(&form, &password_hash, &state.pool).await?;
    Ok(created(&user))
}

async fn current_user(session: SessionData, state: Arc<State>) -> Handled {
    let user = get_user_row(session.user_id, Some(session.user_id), &state.pool)
        .await?
        .ok_or_else(|| HttpError::Unauthorized.new("User no longer exists"))?;

    Ok(ok(&user.into_profile(&state.config.public_url)))
}

async fn user_detail(id: Id, session: Option<SessionData>, state: Arc<State>) -> Handled {
    let user = get_user_row(id, session.map(|s| s.user_id), &state.pool)
        .await?
        .ok_or_else(|| HttpError::NotFound.default())?;

    Ok(ok(&user.into_profile(&state.config.public_url)))
}

async fn update_avatar(session: SessionData, state: Arc<State>, data: FormData) -> Handled {
    session.authenticate(ActionType::ManageOwnProfile)?;
    let form = AvatarForm::parse(data)?;

    let media_root = &state.config.media_root;
    let stored = store_image(media_root, AVATAR_IMAGE_DIR, &form.avatar).await?;

    let previous = match set_avatar(session.user_id, Some(&stored), &state.pool).await {
        Ok(previous) => previous,
        Err(e) => {
            remove_image(media_root, &stored).await;
            return Err(e.into());
        }
    };
    if let Some(previous) = previous {
        remove_image(media_root, &previous).await;
    }

    Ok(ok(&Avatar {
        avatar: media_url(&state.config.public_url, &stored),
    }))
}

async fn delete_avatar(session: SessionData, state: Arc<State>) -> Handled {
    session.authenticate(ActionType::ManageOwnProfile)?;

    if let Some(previous) = set_avatar(session.user_id, None, &state.pool).await? {
        remove_image(&state.config.media_root, &previous).await;
    }

    Ok(no_content())
}

async fn change_password(session: SessionData, state: Arc<State>, data: FormData) -> Handled {
    session.authenticate(ActionType::ManageOwnProfile)?;
    let form = PasswordForm::parse(data)?;

    let user = get_user_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| HttpError::Unauthorized.new("User no longer exists"))?;

    let matches = verify_password(&form.current_password, &user.password).map_err(|e| {
        log::error!("Stored password hash of user {} is unreadable: {e}", user.id);
        HttpError::InternalServerError.default()
    })?;
    if !matches {
        return Err(HttpError::InvalidRequest
            .field("current_password", "Wrong password.")
            .into());
    }

    set_password(user.id, &hash(&form.new_password)?, &state.pool).await?;
    log::info!("User {} changed password", user.id);
    Ok(no_content())
}

async fn list_subscriptions(
    session: SessionData,
    pairs: Vec<(String, String)>,
    state: Arc<State>,
) -> Handled {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    let page = Page::from_pairs(&pairs);
    let limit = recipes_limit(&pairs);
    let base_url = match limit {
        Some(limit) => format!(
            "{}/api/users/subscriptions/?recipes_limit={limit}",
            state.config.public_url
        ),
        None => format!("{}/api/users/subscriptions/", state.config.public_url),
    };

    let authors = fetch_subscriptions(session.user_id, page, &base_url, &state.pool).await?;
    let results =
        load_subscriptions(authors.results, limit, &state.config.public_url, &state.pool).await?;

    Ok(ok(&PageContext {
        count: authors.count,
        next: authors.next,
        previous: authors.previous,
        results,
    }))
}

async fn create_subscription(
    author_id: Id,
    session: SessionData,
    pairs: Vec<(String, String)>,
    state: Arc<State>,
) -> Handled {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    let author = subscribe(author_id, session.user_id, &state.pool).await?;
    let mut entries = load_subscriptions(
        vec![author],
        recipes_limit(&pairs),
        &state.config.public_url,
        &state.pool,
    )
    .await?;

    let entry = entries
        .pop()
        .ok_or_else(|| HttpError::InternalServerError.default())?;
    Ok(created(&entry))
}

async fn delete_subscription(author_id: Id, session: SessionData, state: Arc<State>) -> Handled {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    unsubscribe(author_id, session.user_id, &state.pool).await?;
    Ok(no_content())
}
