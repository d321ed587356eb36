use crate::{
    error::{Error, HttpError},
    schema::{Id, ShoppingListRow, ShortRecipeRow},
};

use super::get_short_recipe;

use sqlx::{Pool, Postgres};

pub async fn add_to_shopping_cart(
    recipe_id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<ShortRecipeRow, Error> {
    let recipe = get_short_recipe(recipe_id, pool)
        .await?
        .ok_or_else(|| HttpError::NotFound.new("No recipe exists with specified id"))?;

    let result = sqlx::query(
        "INSERT INTO shopping_cart (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(HttpError::InvalidRequest.new("Recipe is already in shopping cart"));
    }

    Ok(recipe)
}

pub async fn remove_from_shopping_cart(
    recipe_id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    if get_short_recipe(recipe_id, pool).await?.is_none() {
        return Err(HttpError::NotFound.new("No recipe exists with specified id"));
    }

    let result = sqlx::query("DELETE FROM shopping_cart WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(HttpError::InvalidRequest.new("Recipe not in shop list"));
    }

    Ok(())
}

/// Every ingredient line of every recipe in the user's cart, unaggregated.
pub async fn list_shopping_list_rows(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingListRow>, Error> {
    let rows: Vec<ShoppingListRow> = sqlx::query_as(
        "
        SELECT i.name AS name, u.title AS measurement_unit, ri.amount AS amount
        FROM shopping_cart sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        INNER JOIN units u ON u.id = i.unit_id
        WHERE sc.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
