use crate::{
    authentication::{cryptography::verify_password, jwt::generate_jwt_session},
    error::{Error, FieldErrors, HttpError},
    form::{LoginForm, UserForm},
    pagination::{Page, PageContext},
    schema::{CreatedUser, Id, User, UserRow},
};

use sqlx::{Pool, Postgres};

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Id) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_user_by_email(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Profile of `user_id` as seen by `viewer`.
pub async fn get_user_row(
    user_id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Option<UserRow>, Error> {
    let row: Option<UserRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.avatar,
            EXISTS (
                SELECT 1 FROM subscriptions s WHERE s.author_id = u.id AND s.subscriber_id = $2
            ) AS is_subscribed,
            1::BIGINT AS count
        FROM users u
        WHERE u.id = $1
    ",
    )
    .bind(user_id)
    .bind(viewer)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn fetch_users(
    viewer: Option<Id>,
    page: Page,
    base_url: &str,
    pool: &Pool<Postgres>,
) -> Result<PageContext<UserRow>, Error> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.avatar,
            EXISTS (
                SELECT 1 FROM subscriptions s WHERE s.author_id = u.id AND s.subscriber_id = $1
            ) AS is_subscribed,
            COUNT(*) OVER() AS count
        FROM users u
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(viewer)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(pool)
    .await?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None if page.offset > 0 => {
            let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
                .fetch_one(pool)
                .await?;
            count.0
        }
        None => 0,
    };
    Ok(PageContext::from_rows(rows, total_count, page, base_url))
}

/// Creates a user; `password_hash` is the already hashed password.
pub async fn register_user(
    form: &UserForm,
    password_hash: &str,
    pool: &Pool<Postgres>,
) -> Result<CreatedUser, Error> {
    let taken: Vec<(String, String)> = sqlx::query_as(
        "SELECT email, username FROM users WHERE email = $1 OR LOWER(username) = LOWER($2)",
    )
    .bind(&form.email)
    .bind(&form.username)
    .fetch_all(pool)
    .await?;

    let mut errors = FieldErrors::new();
    for (email, username) in taken.iter() {
        if email == &form.email {
            errors
                .entry(String::from("email"))
                .or_default()
                .push(String::from("This email already taken"));
        }
        if username.to_lowercase() == form.username.to_lowercase() {
            errors
                .entry(String::from("username"))
                .or_default()
                .push(String::from("This username already taken"));
        }
    }
    if !errors.is_empty() {
        return Err(HttpError::InvalidRequest.fields(errors));
    }

    let user: Option<CreatedUser> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING
        RETURNING email, id, username, first_name, last_name
    ",
    )
    .bind(&form.email)
    .bind(&form.username)
    .bind(&form.first_name)
    .bind(&form.last_name)
    .bind(password_hash)
    .fetch_optional(pool)
    .await?;

    let user = user.ok_or_else(|| {
        HttpError::InvalidRequest.new("A user with that email or username already exists")
    })?;

    log::info!("Registered user {} ({})", user.username, user.id);
    Ok(user)
}

pub async fn login_user(
    form: &LoginForm,
    secret: &str,
    lifetime_hours: i64,
    pool: &Pool<Postgres>,
) -> Result<String, Error> {
    let invalid = || HttpError::InvalidRequest.new("Unable to log in with provided credentials");

    let user = get_user_by_email(pool, &form.email)
        .await?
        .ok_or_else(invalid)?;

    let authenticated = verify_password(&form.password, &user.password).map_err(|e| {
        log::error!("Stored password hash of user {} is unreadable: {e}", user.id);
        HttpError::InternalServerError.default()
    })?;
    if !authenticated {
        return Err(invalid());
    }

    generate_jwt_session(&user, secret, lifetime_hours)
}

pub async fn set_password(
    user_id: Id,
    password_hash: &str,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    sqlx::query("UPDATE users SET password = $2 WHERE id = $1")
        .bind(user_id)
        .bind(password_hash)
        .execute(pool)
        .await?;

    Ok(())
}

/// Replaces the avatar path and returns the previous one.
pub async fn set_avatar(
    user_id: Id,
    avatar: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Option<String>, Error> {
    let mut tr = pool.begin().await?;

    let previous: Option<(Option<String>,)> =
        sqlx::query_as("SELECT avatar FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tr)
            .await?;

    let previous = match previous {
        Some((previous,)) => previous,
        None => return Err(HttpError::NotFound.new("User not found")),
    };

    sqlx::query("UPDATE users SET avatar = $2 WHERE id = $1")
        .bind(user_id)
        .bind(avatar)
        .execute(&mut *tr)
        .await?;

    tr.commit().await?;
    Ok(previous)
}

/// Grants the admin role; false when no user has that email.
pub async fn promote_user(email: &str, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let result = sqlx::query("UPDATE users SET role = 'admin' WHERE email = LOWER($1)")
        .bind(email)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
