use sqlx::{Executor, Pool, Sqlite};

use crate::{
    error::{Error, QueryError},
    pagination::{PageContext, PageRequest},
    schema::{Id, ShortRecipe, SubscriptionView, User},
};

use super::users::require_user;

#[derive(sqlx::FromRow)]
struct AuthorRowCounted {
    #[sqlx(flatten)]
    author: User,
    count: i64,
}

pub async fn is_following<'e, E>(user_id: Id, author_id: Id, executor: E) -> Result<bool, Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row: Option<(Id,)> =
        sqlx::query_as("SELECT id FROM follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .fetch_optional(executor)
            .await
            .map_err(QueryError::from)?;

    Ok(row.is_some())
}

/// Projection of `author` as seen by `viewer`, with at most `recipes_limit`
/// of the author's newest recipes.
pub async fn subscription_view(
    viewer: Id,
    author: User,
    recipes_limit: i64,
    pool: &Pool<Sqlite>,
) -> Result<SubscriptionView, Error> {
    let is_subscribed = is_following(viewer, author.id, pool).await?;

    let recipes: Vec<ShortRecipe> = sqlx::query_as(
        "SELECT id, name, image, cooking_time FROM recipes WHERE author_id = $1 ORDER BY id DESC LIMIT $2",
    )
    .bind(author.id)
    .bind(recipes_limit)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let recipes_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author.id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(SubscriptionView {
        email: author.email,
        id: author.id,
        username: author.username,
        first_name: author.first_name,
        last_name: author.last_name,
        is_subscribed,
        recipes,
        recipes_count: recipes_count.0,
        avatar: author.avatar,
    })
}

pub async fn follow(
    user_id: Id,
    author_id: Id,
    recipes_limit: i64,
    pool: &Pool<Sqlite>,
) -> Result<SubscriptionView, Error> {
    if user_id == author_id {
        return Err(Error::SelfReference);
    }
    let author = require_user(author_id, pool).await?;

    let result = sqlx::query(
        "INSERT INTO follows (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(Error::Conflict("You already follow this user".to_string()));
    }
    log::debug!("User {user_id} follows {author_id}");

    subscription_view(user_id, author, recipes_limit, pool).await
}

pub async fn unfollow(user_id: Id, author_id: Id, pool: &Pool<Sqlite>) -> Result<(), Error> {
    if user_id == author_id {
        return Err(Error::SelfReference);
    }
    require_user(author_id, pool).await?;

    let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(Error::EdgeNotFound(
            "You are not subscribed to this user".to_string(),
        ));
    }
    log::debug!("User {user_id} unfollowed {author_id}");

    Ok(())
}

pub async fn list_subscriptions(
    user_id: Id,
    page: PageRequest,
    recipes_limit: i64,
    pool: &Pool<Sqlite>,
) -> Result<PageContext<SubscriptionView>, Error> {
    let rows: Vec<AuthorRowCounted> = sqlx::query_as(
        "
        SELECT u.*, COUNT(*) OVER() AS count
        FROM follows f
        INNER JOIN users u ON u.id = f.author_id
        WHERE f.user_id = $1
        ORDER BY f.id DESC
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None => {
            let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(pool)
                .await
                .map_err(QueryError::from)?;
            count.0
        }
    };
    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        views.push(subscription_view(user_id, row.author, recipes_limit, pool).await?);
    }

    Ok(PageContext::from_rows(views, total_count, page))
}
