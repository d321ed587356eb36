use serde::{Deserialize, Serialize};

use crate::media::media_url;

pub type Id = i32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub avatar: Option<String>,
    pub role: UserRole,
}

/// Returned by registration; never carries the password hash.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct CreatedUser {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct UserRow {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub is_subscribed: bool,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserProfile {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

impl UserRow {
    pub fn into_profile(self, public_url: &str) -> UserProfile {
        UserProfile {
            email: self.email,
            id: self.id,
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            is_subscribed: self.is_subscribed,
            avatar: self.avatar.map(|path| media_url(public_url, &path)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Avatar {
    pub avatar: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthToken {
    pub auth_token: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq)]
pub struct Unit {
    pub id: Id,
    pub title: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq)]
pub struct Ingredient {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: Id,
    pub name: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct LinkedRecipeTag {
    #[serde(skip_serializing)]
    pub recipe_id: Id,
    pub id: Id,
    pub name: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeIngredient {
    #[serde(skip_serializing)]
    pub recipe_id: Id,
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// One recipe joined with its author and the viewer's flags.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeRow {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,

    pub author_id: Id,
    pub author_email: String,
    pub author_username: String,
    pub author_first_name: String,
    pub author_last_name: String,
    pub author_avatar: Option<String>,
    pub author_is_subscribed: bool,

    pub count: i64,
}

impl RecipeRow {
    pub fn author(&self, public_url: &str) -> UserProfile {
        UserProfile {
            email: self.author_email.to_owned(),
            id: self.author_id,
            username: self.author_username.to_owned(),
            first_name: self.author_first_name.to_owned(),
            last_name: self.author_last_name.to_owned(),
            is_subscribed: self.author_is_subscribed,
            avatar: self
                .author_avatar
                .as_ref()
                .map(|path| media_url(public_url, path)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: Id,
    pub tags: Vec<LinkedRecipeTag>,
    pub author: UserProfile,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Ownership data needed to authorize a mutation.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeOwner {
    pub id: Id,
    pub author_id: Id,
    pub image: String,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct ShortRecipeRow {
    pub id: Id,
    pub author_id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ShortRecipe {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl ShortRecipeRow {
    pub fn into_short(self, public_url: &str) -> ShortRecipe {
        ShortRecipe {
            id: self.id,
            name: self.name,
            image: media_url(public_url, &self.image),
            cooking_time: self.cooking_time,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    #[serde(flatten)]
    pub author: UserProfile,
    pub recipes: Vec<ShortRecipe>,
    pub recipes_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeFilter {
    /// Reads `author`, repeated `tags` and the two boolean flags from query pairs.
    /// Unknown keys are ignored so pagination parameters can share the list.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut filter = Self::default();

        for (key, value) in pairs {
            match key.as_str() {
                "author" => filter.author = value.parse().ok(),
                "tags" if !value.is_empty() => filter.tags.push(value.to_owned()),
                "is_favorited" => filter.is_favorited = is_truthy(value),
                "is_in_shopping_cart" => filter.is_in_shopping_cart = is_truthy(value),
                _ => {}
            }
        }

        filter
    }

    /// Query string used as the base of pagination links.
    pub fn to_query(&self) -> String {
        let mut pairs: Vec<(&str, String)> = vec![];
        if let Some(author) = self.author {
            pairs.push(("author", author.to_string()));
        }
        pairs.extend(self.tags.iter().map(|tag| ("tags", tag.to_owned())));
        if self.is_favorited {
            pairs.push(("is_favorited", String::from("1")));
        }
        if self.is_in_shopping_cart {
            pairs.push(("is_in_shopping_cart", String::from("1")));
        }

        serde_urlencoded::to_string(&pairs).unwrap_or_default()
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value, "1" | "true" | "True")
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct ShoppingListRow {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn filter_collects_repeated_tags() {
        let filter = RecipeFilter::from_pairs(&pairs(&[
            ("tags", "breakfast"),
            ("limit", "6"),
            ("tags", "lunch"),
            ("author", "3"),
            ("is_favorited", "1"),
        ]));

        assert_eq!(filter.author, Some(3));
        assert_eq!(filter.tags, vec!["breakfast", "lunch"]);
        assert!(filter.is_favorited);
        assert!(!filter.is_in_shopping_cart);
        assert_eq!(
            filter.to_query(),
            "author=3&tags=breakfast&tags=lunch&is_favorited=1"
        );
    }

    #[test]
    fn filter_query_escapes_slugs() {
        let filter = RecipeFilter {
            tags: vec![String::from("fish & chips"), String::from("#1")],
            ..RecipeFilter::default()
        };

        assert_eq!(filter.to_query(), "tags=fish+%26+chips&tags=%231");
    }

    #[test]
    fn filter_ignores_malformed_author() {
        let filter = RecipeFilter::from_pairs(&pairs(&[("author", "me"), ("is_in_shopping_cart", "0")]));

        assert_eq!(filter, RecipeFilter::default());
    }

    #[test]
    fn short_recipe_resolves_image_url() {
        let row = ShortRecipeRow {
            id: 4,
            author_id: 1,
            name: String::from("Borscht"),
            image: String::from("recipes/a.png"),
            cooking_time: 90,
        };

        let short = row.into_short("http://localhost:8000");
        assert_eq!(short.image, "http://localhost:8000/media/recipes/a.png");
    }
}
