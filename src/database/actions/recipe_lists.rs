use sqlx::{Executor, Pool, Sqlite};

use crate::{
    error::{Error, QueryError},
    schema::{Id, ShortRecipe},
};

use super::recipes::get_recipe;

/// The two per-user recipe lists. Both are plain (user, recipe) edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    fn table(&self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping_cart",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping list",
        }
    }

    pub async fn contains<'e, E>(&self, user_id: Id, recipe_id: Id, executor: E) -> Result<bool, Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row: Option<(Id,)> = sqlx::query_as(&format!(
            "SELECT id FROM {} WHERE user_id = $1 AND recipe_id = $2",
            self.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .fetch_optional(executor)
        .await
        .map_err(QueryError::from)?;

        Ok(row.is_some())
    }

    pub async fn add(
        &self,
        user_id: Id,
        recipe_id: Id,
        pool: &Pool<Sqlite>,
    ) -> Result<ShortRecipe, Error> {
        let recipe = get_recipe(recipe_id, pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Recipe {recipe_id} does not exist")))?;

        let result = sqlx::query(&format!(
            "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            self.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

        if result.rows_affected() == 0 {
            return Err(Error::Conflict(format!(
                "Recipe \"{}\" was already added to {}.",
                recipe.name,
                self.label()
            )));
        }
        log::debug!("User {user_id} added recipe {recipe_id} to {}", self.label());

        Ok(ShortRecipe {
            id: recipe.id,
            name: recipe.name,
            image: recipe.image,
            cooking_time: recipe.cooking_time,
        })
    }

    pub async fn remove(&self, user_id: Id, recipe_id: Id, pool: &Pool<Sqlite>) -> Result<(), Error> {
        let recipe = get_recipe(recipe_id, pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Recipe {recipe_id} does not exist")))?;

        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
            self.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

        if result.rows_affected() == 0 {
            return Err(Error::EdgeNotFound(format!(
                "Recipe \"{}\" is not in {}.",
                recipe.name,
                self.label()
            )));
        }
        log::debug!("User {user_id} removed recipe {recipe_id} from {}", self.label());

        Ok(())
    }
}
