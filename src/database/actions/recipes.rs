use sqlx::{Executor, Pool, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    authentication::{jwt::SessionData, permissions::ActionType},
    constants::RECIPE_MEDIA_FOLDER,
    error::{Error, QueryError, ValidationError},
    media::MediaStore,
    pagination::{PageContext, PageRequest},
    schema::{
        Id, NewRecipe, RecipeChanges, RecipeFilter, RecipeIngredientView, RecipeInput,
        RecipeLinks, RecipeRow, RecipeRowCounted, RecipeView,
    },
};

use super::{
    ingredients::find_missing_ingredients,
    recipe_lists::RecipeList,
    tags::{find_missing_tags, list_recipe_tags},
    users::get_user_view,
};

pub async fn get_recipe(id: Id, pool: &Pool<Sqlite>) -> Result<Option<RecipeRow>, Error> {
    let row: Option<RecipeRow> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Fetches a recipe the session is allowed to change: its author's, or any for admins.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Sqlite>,
) -> Result<RecipeRow, Error> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    match get_recipe(id, pool).await? {
        Some(recipe) => {
            session.authenticate_owner(recipe.author_id, ActionType::ManageAllRecipes)?;
            Ok(recipe)
        }
        None => Err(Error::NotFound(format!("Recipe {id} does not exist"))),
    }
}

pub async fn list_recipe_ingredients<'e, E>(
    recipe_id: Id,
    executor: E,
) -> Result<Vec<RecipeIngredientView>, Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows: Vec<RecipeIngredientView> = sqlx::query_as(
        "
        SELECT i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY ri.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(executor)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

async fn compose_recipe_view(
    recipe: RecipeRow,
    viewer: Option<Id>,
    pool: &Pool<Sqlite>,
) -> Result<RecipeView, Error> {
    let author = get_user_view(recipe.author_id, viewer, pool).await?;
    let tags = list_recipe_tags(recipe.id, pool).await?;
    let ingredients = list_recipe_ingredients(recipe.id, pool).await?;

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(user_id) => (
            RecipeList::Favorites
                .contains(user_id, recipe.id, pool)
                .await?,
            RecipeList::ShoppingCart
                .contains(user_id, recipe.id, pool)
                .await?,
        ),
        None => (false, false),
    };

    Ok(RecipeView {
        id: recipe.id,
        tags,
        author,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    })
}

pub async fn get_recipe_view(
    id: Id,
    viewer: Option<Id>,
    pool: &Pool<Sqlite>,
) -> Result<RecipeView, Error> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Recipe {id} does not exist")))?;

    compose_recipe_view(recipe, viewer, pool).await
}

/// Appends the `AND …` clauses for `filter` to a query over `recipes r`.
fn push_recipe_filter(
    query: &mut QueryBuilder<'_, Sqlite>,
    filter: &RecipeFilter,
    viewer: Option<Id>,
) {
    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        query.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug IN (",
        );
        let mut separated = query.separated(", ");
        for slug in &filter.tags {
            separated.push_bind(slug.to_owned());
        }
        separated.push_unseparated("))");
    }

    for (flag, table) in [
        (filter.is_favorited, "favorites"),
        (filter.is_in_shopping_cart, "shopping_cart"),
    ] {
        match (flag, viewer) {
            (Some(wanted), Some(user_id)) => {
                query.push(if wanted { " AND EXISTS" } else { " AND NOT EXISTS" });
                query
                    .push(format!(
                        " (SELECT 1 FROM {table} e WHERE e.recipe_id = r.id AND e.user_id = "
                    ))
                    .push_bind(user_id)
                    .push(")");
            }
            // nobody has anything listed
            (Some(true), None) => {
                query.push(" AND 0");
            }
            _ => {}
        }
    }
}

async fn count_recipes(
    filter: &RecipeFilter,
    viewer: Option<Id>,
    pool: &Pool<Sqlite>,
) -> Result<i64, Error> {
    let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM recipes r WHERE 1 = 1");
    push_recipe_filter(&mut query, filter, viewer);

    let count: (i64,) = query
        .build_query_as()
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0)
}

pub async fn list_recipes(
    filter: &RecipeFilter,
    viewer: Option<Id>,
    page: PageRequest,
    pool: &Pool<Sqlite>,
) -> Result<PageContext<RecipeView>, Error> {
    let mut query =
        QueryBuilder::<Sqlite>::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE 1 = 1");
    push_recipe_filter(&mut query, filter, viewer);
    query
        .push(" ORDER BY r.id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows: Vec<RecipeRowCounted> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    // past the last page the window count is gone with the rows
    let total_count = match rows.first() {
        Some(row) => row.count,
        None => count_recipes(filter, viewer, pool).await?,
    };
    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        views.push(compose_recipe_view(row.recipe, viewer, pool).await?);
    }

    Ok(PageContext::from_rows(views, total_count, page))
}

/// Fails with every id of `links` that is not in the catalogs.
async fn check_link_references(links: &RecipeLinks, conn: &mut SqliteConnection) -> Result<(), Error> {
    let missing = find_missing_tags(&links.tags, &mut *conn).await?;
    if !missing.is_empty() {
        return Err(ValidationError::UnknownTags(missing).into());
    }

    let missing = find_missing_ingredients(&links.ingredient_ids(), &mut *conn).await?;
    if !missing.is_empty() {
        return Err(ValidationError::UnknownIngredients(missing).into());
    }

    Ok(())
}

/// Deletes every tag and ingredient link of the recipe and inserts `links` in their place.
async fn replace_recipe_links(
    recipe_id: Id,
    links: &RecipeLinks,
    conn: &mut SqliteConnection,
) -> Result<(), Error> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    let mut query = QueryBuilder::<Sqlite>::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    query.push_values(&links.tags, |mut row, tag_id| {
        row.push_bind(recipe_id).push_bind(*tag_id);
    });
    query
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    let mut query = QueryBuilder::<Sqlite>::new(
        "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ",
    );
    query.push_values(&links.ingredients, |mut row, ingredient| {
        row.push_bind(recipe_id)
            .push_bind(ingredient.id)
            .push_bind(ingredient.amount);
    });
    query
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

async fn insert_recipe(
    author_id: Id,
    recipe: &NewRecipe,
    image: &str,
    pool: &Pool<Sqlite>,
) -> Result<Id, Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    check_link_references(&recipe.links, &mut *tr).await?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, cooking_time, image)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&recipe.name)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .bind(image)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    replace_recipe_links(id.0, &recipe.links, &mut *tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    Ok(id.0)
}

/// Creates the recipe together with all of its links, or nothing at all.
pub async fn create_recipe(
    author_id: Id,
    input: RecipeInput,
    media: &MediaStore,
    pool: &Pool<Sqlite>,
) -> Result<RecipeView, Error> {
    let recipe = input.into_new()?;

    let image = media.save(RECIPE_MEDIA_FOLDER, &recipe.image).await?;
    let id = match insert_recipe(author_id, &recipe, &image, pool).await {
        Ok(id) => id,
        Err(e) => {
            media.remove(&image).await;
            return Err(e);
        }
    };
    log::info!("User {author_id} created recipe {id}");

    get_recipe_view(id, Some(author_id), pool).await
}

async fn apply_recipe_changes(
    recipe_id: Id,
    changes: &RecipeChanges,
    image: Option<&str>,
    pool: &Pool<Sqlite>,
) -> Result<(), Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    check_link_references(&changes.links, &mut *tr).await?;

    sqlx::query(
        "
        UPDATE recipes SET
        name = COALESCE($1, name),
        text = COALESCE($2, text),
        cooking_time = COALESCE($3, cooking_time),
        image = COALESCE($4, image)
        WHERE id = $5
    ",
    )
    .bind(&changes.name)
    .bind(&changes.text)
    .bind(changes.cooking_time)
    .bind(image)
    .bind(recipe_id)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    replace_recipe_links(recipe_id, &changes.links, &mut *tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    Ok(())
}

/// Replaces the recipe's tag and ingredient sets, and whichever scalar fields are given.
pub async fn update_recipe(
    id: Id,
    session: &SessionData,
    input: RecipeInput,
    media: &MediaStore,
    pool: &Pool<Sqlite>,
) -> Result<RecipeView, Error> {
    let recipe = get_recipe_mut(id, session, pool).await?;
    let changes = input.into_changes()?;

    let image = match &changes.image {
        Some(image) => Some(media.save(RECIPE_MEDIA_FOLDER, image).await?),
        None => None,
    };

    if let Err(e) = apply_recipe_changes(recipe.id, &changes, image.as_deref(), pool).await {
        if let Some(image) = &image {
            media.remove(image).await;
        }
        return Err(e);
    }
    if image.is_some() {
        media.remove(&recipe.image).await;
    }
    log::info!("User {} updated recipe {id}", session.user_id);

    get_recipe_view(id, Some(session.user_id), pool).await
}

pub async fn delete_recipe(
    id: Id,
    session: &SessionData,
    media: &MediaStore,
    pool: &Pool<Sqlite>,
) -> Result<(), Error> {
    let recipe = get_recipe_mut(id, session, pool).await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    media.remove(&recipe.image).await;
    log::info!("User {} deleted recipe {id}", session.user_id);

    Ok(())
}

pub async fn short_link(id: Id, base_url: &str, pool: &Pool<Sqlite>) -> Result<String, Error> {
    if get_recipe(id, pool).await?.is_none() {
        return Err(Error::NotFound(format!("Recipe {id} does not exist")));
    }

    Ok(format!("{}/s/{id}", base_url.trim_end_matches('/')))
}
