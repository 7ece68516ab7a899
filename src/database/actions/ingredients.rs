use std::collections::BTreeSet;

use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    constants::{INGREDIENT_NAME_MAX_LENGTH, MEASUREMENT_UNIT_MAX_LENGTH},
    error::{Error, QueryError, ValidationError},
    schema::{Id, Ingredient, NewIngredient},
};

/// Lists the catalog, optionally narrowed to names starting with `name`
/// (case-insensitive).
pub async fn list_ingredients(
    name: Option<&str>,
    pool: &Pool<Sqlite>,
) -> Result<Vec<Ingredient>, Error> {
    let rows: Vec<Ingredient> = match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => {
            let pattern = format!("{}%", name.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_"));
            sqlx::query_as(
                "SELECT * FROM ingredients WHERE name LIKE $1 ESCAPE '\\' ORDER BY name, measurement_unit",
            )
            .bind(pattern)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?
        }
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY name, measurement_unit")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?,
    };

    Ok(rows)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Sqlite>) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn create_ingredient(
    ingredient: NewIngredient,
    pool: &Pool<Sqlite>,
) -> Result<Ingredient, Error> {
    let name = ingredient.name.trim();
    let unit = ingredient.measurement_unit.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingField("name").into());
    }
    if unit.is_empty() {
        return Err(ValidationError::MissingField("measurement_unit").into());
    }
    if name.chars().count() > INGREDIENT_NAME_MAX_LENGTH {
        return Err(ValidationError::FieldTooLong("name", INGREDIENT_NAME_MAX_LENGTH).into());
    }
    if unit.chars().count() > MEASUREMENT_UNIT_MAX_LENGTH {
        return Err(
            ValidationError::FieldTooLong("measurement_unit", MEASUREMENT_UNIT_MAX_LENGTH).into(),
        );
    }

    let row: Option<Ingredient> = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) ON CONFLICT DO NOTHING RETURNING *",
    )
    .bind(name)
    .bind(unit)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match row {
        Some(row) => {
            log::info!("Created ingredient {} ({})", row.name, row.measurement_unit);
            Ok(row)
        }
        None => Err(Error::Conflict(format!(
            "Ingredient {name} ({unit}) already exists"
        ))),
    }
}

/// Returns the ids out of `ids` that have no catalog entry, sorted.
pub async fn find_missing_ingredients(
    ids: &[Id],
    conn: &mut SqliteConnection,
) -> Result<Vec<Id>, Error> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let mut query = QueryBuilder::<Sqlite>::new("SELECT id FROM ingredients WHERE id IN (");
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let found: Vec<(Id,)> = query
        .build_query_as()
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;
    let found: BTreeSet<Id> = found.into_iter().map(|row| row.0).collect();

    Ok(ids
        .iter()
        .copied()
        .filter(|id| !found.contains(id))
        .collect::<BTreeSet<Id>>()
        .into_iter()
        .collect())
}
