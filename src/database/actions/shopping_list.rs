use sqlx::{Pool, Sqlite};

use crate::{
    error::{Error, QueryError},
    schema::{Id, ShoppingListLine},
};

/// Sums every ingredient of the recipes in the user's shopping cart,
/// one line per (name, unit) pair.
pub async fn list_shopping_list(
    user_id: Id,
    pool: &Pool<Sqlite>,
) -> Result<Vec<ShoppingListLine>, Error> {
    let lines: Vec<ShoppingListLine> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, SUM(ri.amount) AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        INNER JOIN shopping_cart sc ON sc.recipe_id = ri.recipe_id
        WHERE sc.user_id = $1
        GROUP BY i.name, i.measurement_unit
        ORDER BY i.name, i.measurement_unit
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(lines)
}

pub fn render_shopping_list(lines: &[ShoppingListLine]) -> String {
    lines
        .iter()
        .map(|line| line.to_string())
        .collect::<Vec<String>>()
        .join("\n")
}

pub async fn export_shopping_list(user_id: Id, pool: &Pool<Sqlite>) -> Result<String, Error> {
    let lines = list_shopping_list(user_id, pool).await?;
    log::debug!("Exporting {} shopping list lines for user {user_id}", lines.len());

    Ok(render_shopping_list(&lines))
}
