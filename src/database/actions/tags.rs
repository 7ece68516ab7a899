use std::collections::BTreeSet;

use sqlx::{Executor, Pool, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    error::{Error, QueryError},
    schema::{Id, NewTag, Tag},
};

pub async fn create_tag(tag: NewTag, pool: &Pool<Sqlite>) -> Result<Tag, Error> {
    tag.check()?;

    let row: Option<Tag> = sqlx::query_as(
        "INSERT INTO tags (name, slug) VALUES ($1, $2) ON CONFLICT DO NOTHING RETURNING *",
    )
    .bind(tag.name.trim())
    .bind(&tag.slug)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match row {
        Some(row) => {
            log::info!("Created tag {}", row.slug);
            Ok(row)
        }
        None => Err(Error::Conflict(format!(
            "Tag with slug {} already exists",
            tag.slug
        ))),
    }
}

pub async fn get_tag(id: Id, pool: &Pool<Sqlite>) -> Result<Option<Tag>, Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Sqlite>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn list_recipe_tags<'e, E>(recipe_id: Id, executor: E) -> Result<Vec<Tag>, Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let list: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.*
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(executor)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}

/// Returns the ids out of `ids` that name no tag, sorted.
pub async fn find_missing_tags(ids: &[Id], conn: &mut SqliteConnection) -> Result<Vec<Id>, Error> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let mut query = QueryBuilder::<Sqlite>::new("SELECT id FROM tags WHERE id IN (");
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
