pub const DEFAULT_PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const SHORT_LINK_LENGTH: usize = 6;
pub const SHORT_LINK_ATTEMPTS: usize = 8;

pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_USERNAME_LENGTH: usize = 150;
pub const MAX_NAME_LENGTH: usize = 150;
pub const MAX_PASSWORD_LENGTH: usize = 128;
pub const MAX_RECIPE_NAME_LENGTH: usize = 256;

pub const MIN_AMOUNT: i64 = 1;
pub const MAX_AMOUNT: i64 = 32_000;
pub const MIN_COOKING_TIME: i64 = 1;
pub const MAX_COOKING_TIME: i64 = 32_000;

/// Usernames that collide with fixed routes under `/api/users/`.
pub const RESERVED_USERNAMES: &[&str] = &["me", "subscriptions", "set_password"];

pub const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("png", "png"),
    ("jpeg", "jpg"),
    ("jpg", "jpg"),
    ("gif", "gif"),
    ("webp", "webp"),
];

pub const RECIPE_IMAGE_DIR: &str = "recipes";
pub const AVATAR_IMAGE_DIR: &str = "avatars";

pub const MAX_BODY_BYTES: u64 = 10 * 1024 * 1024;
