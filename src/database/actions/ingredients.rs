use crate::{
    error::Error,
    schema::{Id, Ingredient, RecipeIngredient, Unit},
};

use sqlx::{Pool, Postgres};

/// Escapes LIKE wildcards so user input only matches literally.
fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Case-insensitive prefix search; all ingredients when `name` is empty.
pub async fn list_ingredients(
    name: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let pattern = format!("{}%", escape_like(name.unwrap_or("").trim()).to_lowercase());

    let list: Vec<Ingredient> = sqlx::query_as(
        "
        SELECT i.id, i.name, u.title AS measurement_unit
        FROM ingredients i
        INNER JOIN units u ON u.id = i.unit_id
        WHERE LOWER(i.name) LIKE $1
        ORDER BY i.name
    ",
    )
    .bind(pattern)
    .fetch_all(pool)
    .await?;

    Ok(list)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as(
        "
        SELECT i.id, i.name, u.title AS measurement_unit
        FROM ingredients i
        INNER JOIN units u ON u.id = i.unit_id
        WHERE i.id = $1
    ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn find_or_create_unit(title: &str, pool: &Pool<Postgres>) -> Result<Unit, Error> {
    let unit: Unit = sqlx::query_as(
        "
        INSERT INTO units (title) VALUES ($1)
        ON CONFLICT (title) DO UPDATE SET title = EXCLUDED.title
        RETURNING id, title
    ",
    )
    .bind(title)
    .fetch_one(pool)
    .await?;

    Ok(unit)
}

/// Returns false when the (name, unit) pair already exists.
pub async fn create_ingredient(
    name: &str,
    unit_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let result = sqlx::query(
        "INSERT INTO ingredients (name, unit_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(name)
    .bind(unit_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_recipe_ingredients(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeIngredient>, Error> {
    let rows: Vec<RecipeIngredient> = sqlx::query_as(
        "
        SELECT ri.recipe_id, i.id, i.name, u.title AS measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        INNER JOIN units u ON u.id = i.unit_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY i.name
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Ids from `ingredient_ids` that do not exist.
pub async fn missing_ingredients(
    ingredient_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<Id>, Error> {
    let existing: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ingredient_ids)
        .fetch_all(pool)
        .await?;

    Ok(ingredient_ids
        .iter()
        .filter(|id| !existing.iter().any(|(existing,)| existing == *id))
        .copied()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("мука"), "мука");
    }
}
