use crate::{
    authentication::cryptography::generate_access_token,
    constants::{SHORT_LINK_ATTEMPTS, SHORT_LINK_LENGTH},
    error::{Error, HttpError},
    schema::Id,
};

use sqlx::{Pool, Postgres};

async fn find_short_link(recipe_id: Id, pool: &Pool<Postgres>) -> Result<Option<String>, Error> {
    let row: Option<(String,)> = sqlx::query_as("SELECT code FROM short_links WHERE recipe_id = $1")
        .bind(recipe_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| row.0))
}

/// Returns the recipe's code, creating one on first use. A code collision
/// just draws a new one.
pub async fn get_or_create_short_link(recipe_id: Id, pool: &Pool<Postgres>) -> Result<String, Error> {
    if let Some(code) = find_short_link(recipe_id, pool).await? {
        return Ok(code);
    }

    for _ in 0..SHORT_LINK_ATTEMPTS {
        let code = generate_access_token(SHORT_LINK_LENGTH);
        let inserted = sqlx::query(
            "INSERT INTO short_links (recipe_id, code) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(recipe_id)
        .bind(&code)
        .execute(pool)
        .await?;

        if inserted.rows_affected() > 0 {
            return Ok(code);
        }

        // Either another request linked this recipe first, or the code was taken.
        if let Some(code) = find_short_link(recipe_id, pool).await? {
            return Ok(code);
        }
    }

    log::error!("Could not allocate a short link for recipe {recipe_id}");
    Err(HttpError::InternalServerError.default())
}

pub async fn resolve_short_link(code: &str, pool: &Pool<Postgres>) -> Result<Option<Id>, Error> {
    let row: Option<(Id,)> = sqlx::query_as("SELECT recipe_id FROM short_links WHERE code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| row.0))
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use super::super::test_data::{add_simple_recipe, add_user};
    use super::*;

    #[sqlx::test(migrations = "./migrations")]
    async fn links_are_created_once(pool: PgPool) {
        let author = add_user("author", &pool).await;
        let recipe = add_simple_recipe(author, "Soup", &pool).await;

        let first = get_or_create_short_link(recipe, &pool).await.unwrap();
        let second = get_or_create_short_link(recipe, &pool).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), SHORT_LINK_LENGTH);
        assert_eq!(resolve_short_link(&first, &pool).await.unwrap(), Some(recipe));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn unknown_codes_resolve_to_nothing(pool: PgPool) {
        assert_eq!(resolve_short_link("nope00", &pool).await.unwrap(), None);
    }
}
