use crate::{
    error::Error,
    schema::{Id, LinkedRecipeTag, Tag},
};

use sqlx::{Pool, Postgres};

pub async fn create_tag(name: &str, slug: &str, pool: &Pool<Postgres>) -> Result<Option<Id>, Error> {
    let id: Option<(Id,)> = sqlx::query_as(
        "INSERT INTO tags (name, slug) VALUES ($1, $2) ON CONFLICT DO NOTHING RETURNING id",
    )
    .bind(name)
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    Ok(id.map(|tag| tag.0))
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT id, name, slug FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT id, name, slug FROM tags ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(list)
}

pub async fn list_recipe_tags(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<LinkedRecipeTag>, Error> {
    let list: Vec<LinkedRecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id, t.id, t.name, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.name
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    Ok(list)
}

/// Ids from `tag_ids` that do not exist.
pub async fn missing_tags(tag_ids: &[Id], pool: &Pool<Postgres>) -> Result<Vec<Id>, Error> {
    let existing: Vec<(Id,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(tag_ids)
        .fetch_all(pool)
        .await?;

    Ok(tag_ids
        .iter()
        .filter(|id| !existing.iter().any(|(existing,)| existing == *id))
        .copied()
        .collect())
}
