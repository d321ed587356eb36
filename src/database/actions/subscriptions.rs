use std::collections::HashMap;

use crate::{
    error::{Error, HttpError},
    pagination::{Page, PageContext},
    schema::{Id, Subscription, UserRow},
};

use super::{count_author_recipes, get_user_row, list_author_recipes};

use sqlx::{Pool, Postgres};

pub async fn subscribe(
    author_id: Id,
    subscriber_id: Id,
    pool: &Pool<Postgres>,
) -> Result<UserRow, Error> {
    if author_id == subscriber_id {
        return Err(HttpError::InvalidRequest.new("You can not subscribe to yourself"));
    }

    if get_user_row(author_id, Some(subscriber_id), pool).await?.is_none() {
        return Err(HttpError::NotFound.new("No user exists with specified id"));
    }

    let result = sqlx::query(
        "INSERT INTO subscriptions (subscriber_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(subscriber_id)
    .bind(author_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(HttpError::InvalidRequest.new("You are already subscribed to this user"));
    }

    get_user_row(author_id, Some(subscriber_id), pool)
        .await?
        .ok_or_else(|| HttpError::NotFound.new("No user exists with specified id"))
}

pub async fn unsubscribe(
    author_id: Id,
    subscriber_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    if get_user_row(author_id, None, pool).await?.is_none() {
        return Err(HttpError::NotFound.new("No user exists with specified id"));
    }

    let result =
        sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = $1 AND author_id = $2")
            .bind(subscriber_id)
            .bind(author_id)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(HttpError::InvalidRequest.new("You are not subscribed to this user"));
    }

    Ok(())
}

/// Authors followed by `subscriber_id`, oldest subscription first.
pub async fn fetch_subscriptions(
    subscriber_id: Id,
    page: Page,
    base_url: &str,
    pool: &Pool<Postgres>,
) -> Result<PageContext<UserRow>, Error> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.avatar,
            TRUE AS is_subscribed,
            COUNT(*) OVER() AS count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.subscriber_id = $1
        ORDER BY s.created_at, u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(subscriber_id)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(pool)
    .await?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None if page.offset > 0 => {
            let count: (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1")
                    .bind(subscriber_id)
                    .fetch_one(pool)
                    .await?;
            count.0
        }
        None => 0,
    };
    Ok(PageContext::from_rows(rows, total_count, page, base_url))
}

/// Attaches each author's newest recipes (at most `recipes_limit`) and total recipe count.
pub async fn load_subscriptions(
    authors: Vec<UserRow>,
    recipes_limit: Option<i64>,
    public_url: &str,
    pool: &Pool<Postgres>,
) -> Result<Vec<Subscription>, Error> {
    let ids: Vec<Id> = authors.iter().map(|author| author.id).collect();
    let counts = count_author_recipes(&ids, pool).await?;

    let mut recipes: HashMap<Id, Vec<_>> = HashMap::new();
    for row in list_author_recipes(&ids, recipes_limit, pool).await? {
        recipes
            .entry(row.author_id)
            .or_default()
            .push(row.into_short(public_url));
    }

    Ok(authors
        .into_iter()
        .map(|author| Subscription {
            recipes: recipes.remove(&author.id).unwrap_or_default(),
            recipes_count: counts.get(&author.id).copied().unwrap_or(0),
            author: author.into_profile(public_url),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use super::super::test_data::{add_simple_recipe, add_user};
    use super::*;

    const BASE: &str = "http://localhost/api/users/subscriptions/";

    #[sqlx::test(migrations = "./migrations")]
    async fn self_subscription_is_rejected(pool: PgPool) {
        let user = add_user("loner", &pool).await;

        let error = subscribe(user, user, &pool).await.unwrap_err();
        assert_eq!(error.code, 400);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn subscriptions_are_unique(pool: PgPool) {
        let author = add_user("author", &pool).await;
        let reader = add_user("reader", &pool).await;

        let row = subscribe(author, reader, &pool).await.unwrap();
        assert!(row.is_subscribed);
        assert_eq!(subscribe(author, reader, &pool).await.unwrap_err().code, 400);

        unsubscribe(author, reader, &pool).await.unwrap();
        assert_eq!(unsubscribe(author, reader, &pool).await.unwrap_err().code, 400);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn unknown_authors_are_not_found(pool: PgPool) {
        let reader = add_user("reader", &pool).await;

        assert_eq!(subscribe(4242, reader, &pool).await.unwrap_err().code, 404);
        assert_eq!(unsubscribe(4242, reader, &pool).await.unwrap_err().code, 404);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn subscriptions_carry_limited_recipes(pool: PgPool) {
        let author = add_user("author", &pool).await;
        let reader = add_user("reader", &pool).await;
        for name in ["Soup", "Stew", "Salad"] {
            add_simple_recipe(author, name, &pool).await;
        }
        subscribe(author, reader, &pool).await.unwrap();

        let page = Page { limit: 6, offset: 0 };
        let authors = fetch_subscriptions(reader, page, BASE, &pool).await.unwrap();
        assert_eq!(authors.count, 1);

        let entries = load_subscriptions(authors.results, Some(2), "http://localhost", &pool)
            .await
            .unwrap();
        assert_eq!(entries[0].recipes.len(), 2);
        assert_eq!(entries[0].recipes_count, 3);
        assert!(entries[0].author.is_subscribed);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn pages_past_the_end_keep_the_total(pool: PgPool) {
        let author = add_user("author", &pool).await;
        let reader = add_user("reader", &pool).await;
        subscribe(author, reader, &pool).await.unwrap();

        let page = Page { limit: 6, offset: 60 };
        let authors = fetch_subscriptions(reader, page, BASE, &pool).await.unwrap();

        assert!(authors.results.is_empty());
        assert_eq!(authors.count, 1);
    }
}
