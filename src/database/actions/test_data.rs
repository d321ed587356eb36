use sqlx::{Pool, Postgres};

use crate::{
    form::{IngredientAmount, NewRecipe, UserForm},
    jwt::SessionData,
    media::DecodedImage,
    schema::{Id, UserRole},
};

use super::{create_ingredient, create_recipe, create_tag, find_or_create_unit, register_user};

pub async fn add_user(username: &str, pool: &Pool<Postgres>) -> Id {
    let form = UserForm {
        email: format!("{username}@example.org"),
        username: username.to_string(),
        first_name: String::from("Test"),
        last_name: String::from("Cook"),
        password: String::from("unused"),
    };

    register_user(&form, "not-a-real-hash", pool).await.unwrap().id
}

pub fn session(user_id: Id, role: UserRole) -> SessionData {
    SessionData {
        user_id,
        email: format!("user{user_id}@example.org"),
        role,
        jti: String::from("test-session"),
        exp: 0,
    }
}

pub async fn add_tag(slug: &str, pool: &Pool<Postgres>) -> Id {
    create_tag(&slug.to_uppercase(), slug, pool)
        .await
        .unwrap()
        .unwrap()
}

pub async fn add_ingredient(name: &str, unit: &str, pool: &Pool<Postgres>) -> Id {
    let unit = find_or_create_unit(unit, pool).await.unwrap();
    create_ingredient(name, unit.id, pool).await.unwrap();

    let id: (Id,) = sqlx::query_as("SELECT id FROM ingredients WHERE name = $1 AND unit_id = $2")
        .bind(name)
        .bind(unit.id)
        .fetch_one(pool)
        .await
        .unwrap();
    id.0
}

pub async fn add_recipe(
    author_id: Id,
    name: &str,
    ingredients: &[(Id, i32)],
    tags: &[Id],
    pool: &Pool<Postgres>,
) -> Id {
    let recipe = NewRecipe {
        ingredients: ingredients
            .iter()
            .map(|(id, amount)| IngredientAmount {
                id: *id,
                amount: *amount,
            })
            .collect(),
        tags: tags.to_vec(),
        image: DecodedImage {
            extension: "png",
            bytes: vec![0],
        },
        name: name.to_string(),
        text: String::from("Mix everything."),
        cooking_time: 10,
    };

    create_recipe(author_id, &recipe, "recipes/test.png", pool)
        .await
        .unwrap()
}

/// A recipe with one ingredient and no tags.
pub async fn add_simple_recipe(author_id: Id, name: &str, pool: &Pool<Postgres>) -> Id {
    let salt = add_ingredient("salt", "g", pool).await;
    add_recipe(author_id, name, &[(salt, 5)], &[], pool).await
}
