use std::collections::HashMap;

use crate::{
    authentication::permissions::ActionType,
    error::{Error, FieldErrors, HttpError},
    form::{IngredientAmount, NewRecipe, RecipeUpdate},
    jwt::SessionData,
    media::media_url,
    pagination::{Page, PageContext},
    schema::{
        Id, LinkedRecipeTag, Recipe, RecipeFilter, RecipeIngredient, RecipeOwner, RecipeRow,
        ShortRecipeRow,
    },
};

use super::{list_recipe_ingredients, list_recipe_tags, missing_ingredients, missing_tags};

use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

/// Selects `RecipeRow` columns; `viewer` is bound three times for the flags.
fn select_recipe_rows(viewer: Option<Id>) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(
        "SELECT r.id, r.name, r.image, r.text, r.cooking_time, ",
    );

    query
        .push("EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
        .push_bind(viewer)
        .push(") AS is_favorited, ")
        .push("EXISTS (SELECT 1 FROM shopping_cart sc WHERE sc.recipe_id = r.id AND sc.user_id = ")
        .push_bind(viewer)
        .push(") AS is_in_shopping_cart, ")
        .push(
            "u.id AS author_id, u.email AS author_email, u.username AS author_username, \
             u.first_name AS author_first_name, u.last_name AS author_last_name, \
             u.avatar AS author_avatar, ",
        )
        .push("EXISTS (SELECT 1 FROM subscriptions s WHERE s.author_id = u.id AND s.subscriber_id = ")
        .push_bind(viewer)
        .push(") AS author_is_subscribed, ")
        .push("COUNT(*) OVER() AS count ")
        .push("FROM recipes r INNER JOIN users u ON u.id = r.author_id WHERE TRUE");

    query
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<Id>,
    page: Page,
    base_url: &str,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeRow>, Error> {
    // Personal filters mean nothing to anonymous callers.
    if viewer.is_none() && (filter.is_favorited || filter.is_in_shopping_cart) {
        return Ok(PageContext::no_rows());
    }

    let mut query = select_recipe_rows(viewer);
    push_filters(&mut query, filter, viewer);

    query
        .push(" ORDER BY r.created_at DESC, r.id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);

    let rows: Vec<RecipeRow> = query.build_query_as().fetch_all(pool).await?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None if page.offset > 0 => count_recipes(filter, viewer, pool).await?,
        None => 0,
    };
    Ok(PageContext::from_rows(rows, total_count, page, base_url))
}

/// Total for pages past the end, where the window count has no row to ride on.
async fn count_recipes(
    filter: &RecipeFilter,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<i64, Error> {
    let mut query = QueryBuilder::new("SELECT COUNT(*) FROM recipes r WHERE TRUE");
    push_filters(&mut query, filter, viewer);

    let count: i64 = query.build_query_scalar().fetch_one(pool).await?;
    Ok(count)
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &RecipeFilter, viewer: Option<Id>) {
    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        query
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }
    if filter.is_favorited {
        query
            .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
            .push_bind(viewer)
            .push(")");
    }
    if filter.is_in_shopping_cart {
        query
            .push(
                " AND EXISTS (SELECT 1 FROM shopping_cart sc WHERE sc.recipe_id = r.id AND sc.user_id = ",
            )
            .push_bind(viewer)
            .push(")");
    }
}

pub async fn get_recipe_row(
    id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeRow>, Error> {
    let mut query = select_recipe_rows(viewer);
    query.push(" AND r.id = ").push_bind(id);

    let row: Option<RecipeRow> = query.build_query_as().fetch_optional(pool).await?;
    Ok(row)
}

/// Attaches tags and ingredients to each row, keeping the row order.
pub async fn load_recipes(
    rows: Vec<RecipeRow>,
    public_url: &str,
    pool: &Pool<Postgres>,
) -> Result<Vec<Recipe>, Error> {
    let ids: Vec<Id> = rows.iter().map(|row| row.id).collect();
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let mut tags: HashMap<Id, Vec<LinkedRecipeTag>> = HashMap::new();
    list_recipe_tags(&ids, pool)
        .await?
        .into_iter()
        .for_each(|tag| tags.entry(tag.recipe_id).or_default().push(tag));

    let mut ingredients: HashMap<Id, Vec<RecipeIngredient>> = HashMap::new();
    list_recipe_ingredients(&ids, pool)
        .await?
        .into_iter()
        .for_each(|part| ingredients.entry(part.recipe_id).or_default().push(part));

    Ok(rows
        .into_iter()
        .map(|row| Recipe {
            id: row.id,
            tags: tags.remove(&row.id).unwrap_or_default(),
            author: row.author(public_url),
            ingredients: ingredients.remove(&row.id).unwrap_or_default(),
            is_favorited: row.is_favorited,
            is_in_shopping_cart: row.is_in_shopping_cart,
            image: media_url(public_url, &row.image),
            name: row.name,
            text: row.text,
            cooking_time: row.cooking_time,
        })
        .collect())
}

pub async fn get_recipe(
    id: Id,
    viewer: Option<Id>,
    public_url: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<Recipe>, Error> {
    let row = match get_recipe_row(id, viewer, pool).await? {
        Some(row) => row,
        None => return Ok(None),
    };

    Ok(load_recipes(vec![row], public_url, pool).await?.pop())
}

pub async fn get_recipe_owner(id: Id, pool: &Pool<Postgres>) -> Result<Option<RecipeOwner>, Error> {
    let row: Option<RecipeOwner> =
        sqlx::query_as("SELECT id, author_id, image FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    Ok(row)
}

/// Authors manage their own recipes; roles allowed to manage all recipes manage any.
pub fn may_modify(session: &SessionData, author_id: Id) -> bool {
    session.user_id == author_id || ActionType::ManageAllRecipes.authenticate(session)
}

/// Loads the recipe if `session` may modify it.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<RecipeOwner, Error> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    let recipe = get_recipe_owner(id, pool)
        .await?
        .ok_or_else(|| HttpError::NotFound.new("No recipe exists with specified id"))?;

    if !may_modify(session, recipe.author_id) {
        return Err(HttpError::Forbidden.default());
    }

    Ok(recipe)
}

/// Reports unknown ingredient and tag ids as field errors.
pub async fn validate_references(
    ingredients: &[IngredientAmount],
    tags: &[Id],
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let ingredient_ids: Vec<Id> = ingredients.iter().map(|part| part.id).collect();
    let unknown_ingredients = missing_ingredients(&ingredient_ids, pool).await?;
    let unknown_tags = missing_tags(tags, pool).await?;

    let mut errors = FieldErrors::new();
    if !unknown_ingredients.is_empty() {
        errors.insert(
            String::from("ingredients"),
            vec![format!("Unknown ingredient ids: {}", join_ids(&unknown_ingredients))],
        );
    }
    if !unknown_tags.is_empty() {
        errors.insert(
            String::from("tags"),
            vec![format!("Unknown tag ids: {}", join_ids(&unknown_tags))],
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(HttpError::InvalidRequest.fields(errors))
    }
}

fn join_ids(ids: &[Id]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}

async fn replace_parts(
    recipe_id: Id,
    ingredients: &[IngredientAmount],
    tags: &[Id],
    tr: &mut Transaction<'_, Postgres>,
) -> Result<(), Error> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tr)
        .await?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tr)
        .await?;

    if !ingredients.is_empty() {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ",
        );
        query.push_values(ingredients, |mut row, part| {
            row.push_bind(recipe_id)
                .push_bind(part.id)
                .push_bind(part.amount);
        });
        query.build().execute(&mut **tr).await?;
    }

    if !tags.is_empty() {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
        query.push_values(tags, |mut row, tag| {
            row.push_bind(recipe_id).push_bind(*tag);
        });
        query.build().execute(&mut **tr).await?;
    }

    Ok(())
}

/// `image` is the stored path of the already written image.
pub async fn create_recipe(
    author_id: Id,
    recipe: &NewRecipe,
    image: &str,
    pool: &Pool<Postgres>,
) -> Result<Id, Error> {
    let mut tr = pool.begin().await?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&recipe.name)
    .bind(image)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .fetch_one(&mut *tr)
    .await?;

    replace_parts(id.0, &recipe.ingredients, &recipe.tags, &mut tr).await?;
    tr.commit().await?;

    log::info!("User {author_id} created recipe {}", id.0);
    Ok(id.0)
}

pub async fn update_recipe(
    id: Id,
    update: &RecipeUpdate,
    image: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let mut tr = pool.begin().await?;

    sqlx::query(
        "
        UPDATE recipes SET
            name = COALESCE($2, name),
            text = COALESCE($3, text),
            cooking_time = COALESCE($4, cooking_time),
            image = COALESCE($5, image)
        WHERE id = $1
    ",
    )
    .bind(id)
    .bind(update.name.as_deref())
    .bind(update.text.as_deref())
    .bind(update.cooking_time)
    .bind(image)
    .execute(&mut *tr)
    .await?;

    replace_parts(id, &update.ingredients, &update.tags, &mut tr).await?;
    tr.commit().await?;

    Ok(())
}

pub async fn delete_recipe(id: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    log::info!("Deleted recipe {id}");
    Ok(())
}

pub async fn get_short_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<ShortRecipeRow>, Error> {
    let row: Option<ShortRecipeRow> = sqlx::query_as(
        "SELECT id, author_id, name, image, cooking_time FROM recipes WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Newest recipes of each author, at most `limit` per author when given.
pub async fn list_author_recipes(
    author_ids: &[Id],
    limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShortRecipeRow>, Error> {
    let rows: Vec<ShortRecipeRow> = sqlx::query_as(
        "
        SELECT id, author_id, name, image, cooking_time
        FROM (
            SELECT r.id, r.author_id, r.name, r.image, r.cooking_time,
                ROW_NUMBER() OVER (PARTITION BY r.author_id ORDER BY r.created_at DESC, r.id DESC) AS position
            FROM recipes r
            WHERE r.author_id = ANY($1)
        ) ranked
        WHERE $2::BIGINT IS NULL OR position <= $2
        ORDER BY author_id, position
    ",
    )
    .bind(author_ids)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn count_author_recipes(
    author_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Id, i64>, Error> {
    let rows: Vec<(Id, i64)> = sqlx::query_as(
        "SELECT author_id, COUNT(*) FROM recipes WHERE author_id = ANY($1) GROUP BY author_id",
    )
    .bind(author_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use super::super::test_data::{add_recipe, add_simple_recipe, add_tag, add_user, session};
    use super::super::add_to_favorites;
    use super::*;
    use crate::schema::UserRole;

    const BASE: &str = "http://localhost/api/recipes/";

    fn first_page() -> Page {
        Page { limit: 6, offset: 0 }
    }

    fn names(page: &PageContext<RecipeRow>) -> Vec<&str> {
        page.results.iter().map(|row| row.name.as_str()).collect()
    }

    #[test]
    fn authors_and_admins_may_modify() {
        assert!(may_modify(&session(7, UserRole::User), 7));
        assert!(!may_modify(&session(8, UserRole::User), 7));
        assert!(may_modify(&session(8, UserRole::Admin), 7));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn only_authors_and_admins_get_recipes_mut(pool: PgPool) {
        let author = add_user("author", &pool).await;
        let stranger = add_user("stranger", &pool).await;
        let admin = add_user("admin", &pool).await;
        let recipe = add_simple_recipe(author, "Soup", &pool).await;

        let owned = get_recipe_mut(recipe, &session(author, UserRole::User), &pool)
            .await
            .unwrap();
        assert_eq!(owned.author_id, author);

        let error = get_recipe_mut(recipe, &session(stranger, UserRole::User), &pool)
            .await
            .unwrap_err();
        assert_eq!(error.code, 403);

        assert!(get_recipe_mut(recipe, &session(admin, UserRole::Admin), &pool)
            .await
            .is_ok());

        let error = get_recipe_mut(4242, &session(author, UserRole::User), &pool)
            .await
            .unwrap_err();
        assert_eq!(error.code, 404);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn recipes_are_filtered(pool: PgPool) {
        let alice = add_user("alice", &pool).await;
        let bob = add_user("bob", &pool).await;
        let breakfast = add_tag("breakfast", &pool).await;
        let dinner = add_tag("dinner", &pool).await;

        let pancakes = add_recipe(alice, "Pancakes", &[], &[breakfast], &pool).await;
        add_recipe(alice, "Roast", &[], &[dinner], &pool).await;
        add_recipe(bob, "Porridge", &[], &[breakfast], &pool).await;
        add_to_favorites(pancakes, bob, &pool).await.unwrap();

        let by_author = RecipeFilter {
            author: Some(alice),
            ..RecipeFilter::default()
        };
        let page = fetch_recipes(&by_author, None, first_page(), BASE, &pool)
            .await
            .unwrap();
        assert_eq!(page.count, 2);
        assert_eq!(names(&page), ["Roast", "Pancakes"]);

        let by_tag = RecipeFilter {
            tags: vec![String::from("breakfast")],
            ..RecipeFilter::default()
        };
        let page = fetch_recipes(&by_tag, None, first_page(), BASE, &pool)
            .await
            .unwrap();
        assert_eq!(names(&page), ["Porridge", "Pancakes"]);

        let favorites = RecipeFilter {
            is_favorited: true,
            ..RecipeFilter::default()
        };
        let page = fetch_recipes(&favorites, Some(bob), first_page(), BASE, &pool)
            .await
            .unwrap();
        assert_eq!(names(&page), ["Pancakes"]);
        assert!(page.results[0].is_favorited);

        let page = fetch_recipes(&favorites, None, first_page(), BASE, &pool)
            .await
            .unwrap();
        assert_eq!(page.count, 0);
        assert!(page.results.is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn pages_past_the_end_keep_the_total(pool: PgPool) {
        let author = add_user("author", &pool).await;
        add_simple_recipe(author, "Soup", &pool).await;
        add_simple_recipe(author, "Stew", &pool).await;

        let page = Page { limit: 6, offset: 12 };
        let recipes = fetch_recipes(&RecipeFilter::default(), None, page, BASE, &pool)
            .await
            .unwrap();

        assert!(recipes.results.is_empty());
        assert_eq!(recipes.count, 2);
        assert!(recipes.next.is_none());
    }
}
