use std::{
    collections::{HashMap, HashSet},
    sync::LazyLock,
};

use regex::Regex;
use serde_json::Value;

use crate::{
    constants::{
        MAX_AMOUNT, MAX_COOKING_TIME, MAX_EMAIL_LENGTH, MAX_NAME_LENGTH, MAX_PASSWORD_LENGTH,
        MAX_RECIPE_NAME_LENGTH, MAX_USERNAME_LENGTH, MIN_AMOUNT, MIN_COOKING_TIME,
        RESERVED_USERNAMES,
    },
    error::{Error, FieldErrors, HttpError},
    media::{decode_data_uri, DecodedImage},
    schema::Id,
};

pub type FormData = HashMap<String, Value>;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const EMPTY_LIST: &str = "This list may not be empty.";

/// Reads fields out of a decoded JSON body, collecting every problem before
/// failing so the client gets all field errors at once.
pub struct Form {
    inner: FormData,
    errors: FieldErrors,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self {
            inner: data,
            errors: FieldErrors::new(),
        }
    }

    pub fn error(&mut self, key: &str, message: &str) {
        self.errors
            .entry(key.to_string())
            .or_default()
            .push(message.to_string());
    }

    fn present(&self, key: &str) -> Option<&Value> {
        self.inner.get(key).filter(|value| !value.is_null())
    }

    pub fn get_str(&mut self, key: &str, max_length: usize) -> Option<String> {
        if self.present(key).is_none() {
            self.error(key, REQUIRED);
            return None;
        }
        self.get_optional_str(key, max_length)
    }

    pub fn get_optional_str(&mut self, key: &str, max_length: usize) -> Option<String> {
        let value = match self.present(key) {
            Some(Value::String(value)) => value.trim().to_string(),
            Some(_) => {
                self.error(key, "Not a valid string.");
                return None;
            }
            None => return None,
        };

        if value.is_empty() {
            self.error(key, BLANK);
            return None;
        }
        if value.chars().count() > max_length {
            self.error(
                key,
                &format!("Ensure this field has no more than {max_length} characters."),
            );
            return None;
        }
        Some(value)
    }

    pub fn get_number(&mut self, key: &str, min: i64, max: i64) -> Option<i64> {
        if self.present(key).is_none() {
            self.error(key, REQUIRED);
            return None;
        }
        self.get_optional_number(key, min, max)
    }

    pub fn get_optional_number(&mut self, key: &str, min: i64, max: i64) -> Option<i64> {
        let value = self.present(key)?;
        match parse_number(value) {
            Some(number) => match check_range(number, min, max) {
                Ok(number) => Some(number),
                Err(message) => {
                    self.error(key, &message);
                    None
                }
            },
            None => {
                self.error(key, "A valid integer is required.");
                None
            }
        }
    }

    /// Required, non-empty JSON array.
    pub fn get_list(&mut self, key: &str) -> Option<Vec<Value>> {
        match self.present(key) {
            Some(Value::Array(items)) if items.is_empty() => {
                self.error(key, EMPTY_LIST);
                None
            }
            Some(Value::Array(items)) => Some(items.to_owned()),
            Some(_) => {
                self.error(key, "Expected a list of items.");
                None
            }
            None => {
                self.error(key, REQUIRED);
                None
            }
        }
    }

    pub fn get_image(&mut self, key: &str) -> Option<DecodedImage> {
        if self.present(key).is_none() {
            self.error(key, REQUIRED);
            return None;
        }
        self.get_optional_image(key)
    }

    pub fn get_optional_image(&mut self, key: &str) -> Option<DecodedImage> {
        let raw = match self.present(key) {
            Some(Value::String(raw)) => raw.to_owned(),
            Some(_) => {
                self.error(key, "Image must be a base64 encoded data URI");
                return None;
            }
            None => return None,
        };

        match decode_data_uri(&raw) {
            Ok(image) => Some(image),
            Err(e) => {
                self.error(key, e.info());
                None
            }
        }
    }

    pub fn finish(self) -> Result<(), Error> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(HttpError::InvalidRequest.fields(self.errors))
        }
    }
}

fn parse_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn check_range(number: i64, min: i64, max: i64) -> Result<i64, String> {
    if number < min {
        return Err(format!(
            "Ensure this value is greater than or equal to {min}."
        ));
    }
    if number > max {
        return Err(format!("Ensure this value is less than or equal to {max}."));
    }
    Ok(number)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: Id,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Id>,
    pub image: DecodedImage,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
}

/// PATCH payload: ingredients and tags are always replaced, the rest is optional.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeUpdate {
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Id>,
    pub image: Option<DecodedImage>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
}

impl NewRecipe {
    pub fn parse(data: FormData) -> Result<Self, Error> {
        let mut form = Form::from_data(data);

        let ingredients = read_ingredients(&mut form);
        let tags = read_tags(&mut form);
        let image = form.get_image("image");
        let name = form.get_str("name", MAX_RECIPE_NAME_LENGTH);
        let text = form.get_str("text", usize::MAX);
        let cooking_time = form.get_number("cooking_time", MIN_COOKING_TIME, MAX_COOKING_TIME);

        form.finish()?;

        match (ingredients, tags, image, name, text, cooking_time) {
            (Some(ingredients), Some(tags), Some(image), Some(name), Some(text), Some(cooking_time)) => {
                Ok(Self {
                    ingredients,
                    tags,
                    image,
                    name,
                    text,
                    cooking_time: cooking_time as i32,
                })
            }
            _ => Err(HttpError::InvalidRequest.default()),
        }
    }
}

impl RecipeUpdate {
    pub fn parse(data: FormData) -> Result<Self, Error> {
        let mut form = Form::from_data(data);

        let ingredients = read_ingredients(&mut form);
        let tags = read_tags(&mut form);
        let image = form.get_optional_image("image");
        let name = form.get_optional_str("name", MAX_RECIPE_NAME_LENGTH);
        let text = form.get_optional_str("text", usize::MAX);
        let cooking_time =
            form.get_optional_number("cooking_time", MIN_COOKING_TIME, MAX_COOKING_TIME);

        form.finish()?;

        match (ingredients, tags) {
            (Some(ingredients), Some(tags)) => Ok(Self {
                ingredients,
                tags,
                image,
                name,
                text,
                cooking_time: cooking_time.map(|time| time as i32),
            }),
            _ => Err(HttpError::InvalidRequest.default()),
        }
    }
}

fn read_ingredients(form: &mut Form) -> Option<Vec<IngredientAmount>> {
    let items = form.get_list("ingredients")?;

    let mut seen = HashSet::new();
    let mut ingredients = Vec::with_capacity(items.len());
    for item in items.iter() {
        let id = item.get("id").and_then(parse_number);
        let amount = item.get("amount").and_then(parse_number);

        let (id, amount) = match (id, amount) {
            (Some(id), Some(amount)) => (id, amount),
            _ => {
                form.error("ingredients", "Each ingredient needs an integer id and amount.");
                return None;
            }
        };

        if let Err(message) = check_range(amount, MIN_AMOUNT, MAX_AMOUNT) {
            form.error("ingredients", &message);
            return None;
        }
        if !seen.insert(id) {
            form.error("ingredients", "Ingredients must not repeat.");
            return None;
        }

        match Id::try_from(id) {
            Ok(id) => ingredients.push(IngredientAmount {
                id,
                amount: amount as i32,
            }),
            Err(_) => {
                form.error("ingredients", "Invalid ingredient id.");
                return None;
            }
        }
    }

    Some(ingredients)
}

fn read_tags(form: &mut Form) -> Option<Vec<Id>> {
    let items = form.get_list("tags")?;

    let mut seen = HashSet::new();
    let mut tags = Vec::with_capacity(items.len());
    for item in items.iter() {
        let id = match parse_number(item).and_then(|id| Id::try_from(id).ok()) {
            Some(id) => id,
            None => {
                form.error("tags", "Tags must be referenced by integer id.");
                return None;
            }
        };
        if !seen.insert(id) {
            form.error("tags", "Tags must not repeat.");
            return None;
        }
        tags.push(id);
    }

    Some(tags)
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserForm {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl UserForm {
    pub fn parse(data: FormData) -> Result<Self, Error> {
        let mut form = Form::from_data(data);

        let email = form.get_str("email", MAX_EMAIL_LENGTH);
        let username = form.get_str("username", MAX_USERNAME_LENGTH);
        let first_name = form.get_str("first_name", MAX_NAME_LENGTH);
        let last_name = form.get_str("last_name", MAX_NAME_LENGTH);
        let password = form.get_str("password", MAX_PASSWORD_LENGTH);

        if let Some(email) = &email {
            if !is_valid_email(email) {
                form.error("email", "Enter a valid email address.");
            }
        }
        if let Some(username) = &username {
            if !is_valid_username(username) {
                form.error("username", "Invalid characters in username");
            } else if RESERVED_USERNAMES.contains(&username.to_lowercase().as_str()) {
                form.error("username", "This username is reserved.");
            }
        }

        form.finish()?;

        match (email, username, first_name, last_name, password) {
            (Some(email), Some(username), Some(first_name), Some(last_name), Some(password)) => {
                Ok(Self {
                    email: email.to_lowercase(),
                    username,
                    first_name,
                    last_name,
                    password,
                })
            }
            _ => Err(HttpError::InvalidRequest.default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn parse(data: FormData) -> Result<Self, Error> {
        let mut form = Form::from_data(data);

        let email = form.get_str("email", MAX_EMAIL_LENGTH);
        let password = form.get_str("password", MAX_PASSWORD_LENGTH);

        form.finish()?;

        match (email, password) {
            (Some(email), Some(password)) => Ok(Self {
                email: email.to_lowercase(),
                password,
            }),
            _ => Err(HttpError::InvalidRequest.default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PasswordForm {
    pub current_password: String,
    pub new_password: String,
}

impl PasswordForm {
    pub fn parse(data: FormData) -> Result<Self, Error> {
        let mut form = Form::from_data(data);

        let current_password = form.get_str("current_password", MAX_PASSWORD_LENGTH);
        let new_password = form.get_str("new_password", MAX_PASSWORD_LENGTH);

        form.finish()?;

        match (current_password, new_password) {
            (Some(current_password), Some(new_password)) => Ok(Self {
                current_password,
                new_password,
            }),
            _ => Err(HttpError::InvalidRequest.default()),
        }
    }
}

#[derive(Debug)]
pub struct AvatarForm {
    pub avatar: DecodedImage,
}

impl AvatarForm {
    pub fn parse(data: FormData) -> Result<Self, Error> {
        let mut form = Form::from_data(data);
        let avatar = form.get_image("avatar");
        form.finish()?;

        avatar
            .map(|avatar| Self { avatar })
            .ok_or_else(|| HttpError::InvalidRequest.field("avatar", REQUIRED))
    }
}

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern compiles"));

pub fn is_valid_username(username: &str) -> bool {
    USERNAME_PATTERN.is_match(username)
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}
