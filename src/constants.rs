use std::sync::OnceLock;

use regex::Regex;

pub const PAGE_SIZE: i64 = 6;

pub const RECIPE_NAME_MAX_LENGTH: usize = 256;
pub const TAG_NAME_MAX_LENGTH: usize = 32;
pub const INGREDIENT_NAME_MAX_LENGTH: usize = 128;
pub const MEASUREMENT_UNIT_MAX_LENGTH: usize = 64;
pub const USERNAME_MAX_LENGTH: usize = 150;

pub const COOKING_TIME_MIN: i32 = 1;
pub const INGREDIENT_AMOUNT_MIN: i32 = 1;

pub const RECIPE_MEDIA_FOLDER: &str = "recipes";
pub const AVATAR_MEDIA_FOLDER: &str = "avatars";

/// Largest accepted request body; base64 images make up most of it.
pub const BODY_LIMIT: u64 = 1024 * 1024 * 16;

pub fn slug_pattern() -> &'static Regex {
    static SLUG: OnceLock<Regex> = OnceLock::new();
    SLUG.get_or_init(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("slug pattern compiles"))
}

pub fn username_pattern() -> &'static Regex {
    static USERNAME: OnceLock<Regex> = OnceLock::new();
    USERNAME.get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern compiles"))
}
