use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};

use crate::constants::{
    COOKING_TIME_MIN, INGREDIENT_AMOUNT_MIN, RECIPE_NAME_MAX_LENGTH, TAG_NAME_MAX_LENGTH,
};

use super::{error::ValidationError, media::Base64Image};

pub type Id = i64;

#[derive(Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize)]
#[sqlx(rename_all = "lowercase")]
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
    pub role: UserRole,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserView {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

impl UserView {
    pub fn from_user(user: User, is_subscribed: bool) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
            avatar: user.avatar,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChange {
    pub new_password: String,
    pub current_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvatarInput {
    pub avatar: Option<String>,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ingredient {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: Id,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeRow {
    pub id: Id,
    pub author_id: Id,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: String,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct RecipeRowCounted {
    #[sqlx(flatten)]
    pub recipe: RecipeRow,
    pub count: i64,
}

/// An ingredient link as it appears inside a recipe.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeIngredientView {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Read shape of the recipe aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeView {
    pub id: Id,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<RecipeIngredientView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShortRecipe {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionView {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub recipes: Vec<ShortRecipe>,
    pub recipes_count: i64,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: Id,
    pub amount: i32,
}

/// Write shape of the recipe aggregate. Every field is optional at the
/// type level; create and update each decide what is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeInput {
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
}

/// The full tag and ingredient sets of a recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeLinks {
    pub tags: Vec<Id>,
    pub ingredients: Vec<IngredientAmount>,
}

impl RecipeLinks {
    /// Checks everything that can be checked without the database.
    pub fn check(&self) -> Result<(), ValidationError> {
        if self.tags.is_empty() {
            return Err(ValidationError::EmptyTags);
        }
        if self.tags.iter().collect::<HashSet<_>>().len() != self.tags.len() {
            return Err(ValidationError::DuplicateTags);
        }

        if self.ingredients.is_empty() {
            return Err(ValidationError::EmptyIngredients);
        }
        let ids: HashSet<Id> = self.ingredients.iter().map(|i| i.id).collect();
        if ids.len() != self.ingredients.len() {
            return Err(ValidationError::DuplicateIngredients);
        }
        if self
            .ingredients
            .iter()
            .any(|i| i.amount < INGREDIENT_AMOUNT_MIN)
        {
            return Err(ValidationError::AmountTooSmall);
        }

        Ok(())
    }

    pub fn ingredient_ids(&self) -> Vec<Id> {
        self.ingredients.iter().map(|i| i.id).collect()
    }
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: Base64Image,
    pub links: RecipeLinks,
}

#[derive(Debug, Clone)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<Base64Image>,
    pub links: RecipeLinks,
}

fn check_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::MissingField("name"));
    }
    if name.chars().count() > RECIPE_NAME_MAX_LENGTH {
        return Err(ValidationError::FieldTooLong("name", RECIPE_NAME_MAX_LENGTH));
    }
    Ok(())
}

fn check_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::MissingField("text"));
    }
    Ok(())
}

fn check_cooking_time(cooking_time: i32) -> Result<(), ValidationError> {
    if cooking_time < COOKING_TIME_MIN {
        return Err(ValidationError::CookingTimeTooSmall);
    }
    Ok(())
}

impl RecipeInput {
    pub fn into_new(self) -> Result<NewRecipe, crate::error::Error> {
        let tags = self.tags.ok_or(ValidationError::MissingField("tags"))?;
        let ingredients = self
            .ingredients
            .ok_or(ValidationError::MissingField("ingredients"))?;
        let name = self.name.ok_or(ValidationError::MissingField("name"))?;
        let text = self.text.ok_or(ValidationError::MissingField("text"))?;
        let cooking_time = self
            .cooking_time
            .ok_or(ValidationError::MissingField("cooking_time"))?;
        let image = self.image.ok_or(ValidationError::MissingField("image"))?;

        let links = RecipeLinks { tags, ingredients };
        links.check()?;
        check_name(&name)?;
        check_text(&text)?;
        check_cooking_time(cooking_time)?;

        Ok(NewRecipe {
            name,
            text,
            cooking_time,
            image: Base64Image::try_from(image.as_str())?,
            links,
        })
    }

    /// Updates replace both link sets, so both must be present.
    pub fn into_changes(self) -> Result<RecipeChanges, crate::error::Error> {
        use crate::error::Error;

        let tags = self.tags.ok_or(Error::IncompleteUpdate("tags"))?;
        let ingredients = self.ingredients.ok_or(Error::IncompleteUpdate("ingredients"))?;

        let links = RecipeLinks { tags, ingredients };
        links.check()?;
        if let Some(name) = &self.name {
            check_name(name)?;
        }
        if let Some(text) = &self.text {
            check_text(text)?;
        }
        if let Some(cooking_time) = self.cooking_time {
            check_cooking_time(cooking_time)?;
        }
        let image = match self.image {
            Some(image) => Some(Base64Image::try_from(image.as_str())?),
            None => None,
        };

        Ok(RecipeChanges {
            name: self.name,
            text: self.text,
            cooking_time: self.cooking_time,
            image,
            links,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    pub tags: Vec<String>,
    pub is_favorited: Option<bool>,
    pub is_in_shopping_cart: Option<bool>,
}

impl NewTag {
    pub fn check(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.name.chars().count() > TAG_NAME_MAX_LENGTH {
            return Err(ValidationError::FieldTooLong("name", TAG_NAME_MAX_LENGTH));
        }
        if !crate::constants::slug_pattern().is_match(&self.slug) {
            return Err(ValidationError::InvalidSlug);
        }
        Ok(())
    }
}

/// One grouped line of the shopping list export.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShoppingListLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

impl fmt::Display for ShoppingListLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} ({})", self.name, self.amount, self.measurement_unit)
    }
}
