use crate::{
    error::{Error, HttpError},
    schema::{Id, ShortRecipeRow},
};

use super::get_short_recipe;

use sqlx::{Pool, Postgres};

pub async fn add_to_favorites(
    recipe_id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<ShortRecipeRow, Error> {
    let recipe = get_short_recipe(recipe_id, pool)
        .await?
        .ok_or_else(|| HttpError::NotFound.new("No recipe exists with specified id"))?;

    let result = sqlx::query(
        "INSERT INTO favorites (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(HttpError::InvalidRequest.new("Recipe is already in favorites"));
    }

    Ok(recipe)
}

pub async fn remove_from_favorites(
    recipe_id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    if get_short_recipe(recipe_id, pool).await?.is_none() {
        return Err(HttpError::NotFound.new("No recipe exists with specified id"));
    }

    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(HttpError::InvalidRequest.new("Recipe is not in favorites"));
    }

    Ok(())
}
