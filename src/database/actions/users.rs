use sqlx::{Pool, Sqlite};

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::generate_jwt_session,
    },
    constants::{AVATAR_MEDIA_FOLDER, USERNAME_MAX_LENGTH},
    error::{Error, QueryError, ValidationError},
    media::{Base64Image, MediaStore},
    pagination::{PageContext, PageRequest},
    schema::{AvatarInput, Id, LoginForm, NewUser, PasswordChange, User, UserView},
};

use super::follows::is_following;

#[derive(sqlx::FromRow)]
struct UserRowCounted {
    #[sqlx(flatten)]
    user: User,
    count: i64,
}

pub async fn get_user(id: Id, pool: &Pool<Sqlite>) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_email(email: &str, pool: &Pool<Sqlite>) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email.trim())
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Looks a user up or fails with a not-found error.
pub async fn require_user(id: Id, pool: &Pool<Sqlite>) -> Result<User, Error> {
    get_user(id, pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User {id} does not exist")))
}

pub async fn user_view(user: User, viewer: Option<Id>, pool: &Pool<Sqlite>) -> Result<UserView, Error> {
    let is_subscribed = match viewer {
        Some(viewer) => is_following(viewer, user.id, pool).await?,
        None => false,
    };

    Ok(UserView::from_user(user, is_subscribed))
}

pub async fn get_user_view(
    id: Id,
    viewer: Option<Id>,
    pool: &Pool<Sqlite>,
) -> Result<UserView, Error> {
    let user = require_user(id, pool).await?;
    user_view(user, viewer, pool).await
}

pub async fn list_users(
    viewer: Option<Id>,
    page: PageRequest,
    pool: &Pool<Sqlite>,
) -> Result<PageContext<UserView>, Error> {
    let rows: Vec<UserRowCounted> = sqlx::query_as(
        "SELECT u.*, COUNT(*) OVER() AS count FROM users u ORDER BY u.username LIMIT $1 OFFSET $2",
    )
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = match rows.first() {
        Some(row) => row.count,
        None => {
            let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
                .fetch_one(pool)
                .await
                .map_err(QueryError::from)?;
            count.0
        }
    };
    let mut users = Vec::with_capacity(rows.len());
    for row in rows {
        users.push(user_view(row.user, viewer, pool).await?);
    }

    Ok(PageContext::from_rows(users, total_count, page))
}

fn check_new_user(user: &NewUser) -> Result<(), ValidationError> {
    let email = user.email.trim();
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && domain.contains('.')
                && !email.chars().any(char::is_whitespace) => {}
        _ => return Err(ValidationError::InvalidEmail),
    }

    if user.username.chars().count() > USERNAME_MAX_LENGTH {
        return Err(ValidationError::FieldTooLong("username", USERNAME_MAX_LENGTH));
    }
    if !crate::constants::username_pattern().is_match(&user.username) {
        return Err(ValidationError::InvalidUsername);
    }
    if user.first_name.trim().is_empty() {
        return Err(ValidationError::MissingField("first_name"));
    }
    if user.last_name.trim().is_empty() {
        return Err(ValidationError::MissingField("last_name"));
    }
    if user.password.is_empty() {
        return Err(ValidationError::MissingField("password"));
    }

    Ok(())
}

/// Creates a user; the password is stored as an argon2 hash.
pub async fn register_user(user: NewUser, pool: &Pool<Sqlite>) -> Result<UserView, Error> {
    check_new_user(&user)?;

    let password = hash_password(&user.password)?;

    let row: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING *
    ",
    )
    .bind(user.email.trim())
    .bind(&user.username)
    .bind(user.first_name.trim())
    .bind(user.last_name.trim())
    .bind(password)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match row {
        Some(row) => {
            log::info!("Registered user {} ({})", row.username, row.id);
            Ok(UserView::from_user(row, false))
        }
        None => Err(Error::Conflict(
            "A user with that email or username already exists".to_string(),
        )),
    }
}

pub async fn login_user(
    form: LoginForm,
    secret: &str,
    lifetime_hours: i64,
    pool: &Pool<Sqlite>,
) -> Result<String, Error> {
    let user = get_user_by_email(&form.email, pool)
        .await?
        .ok_or(ValidationError::InvalidCredentials)?;

    let authenticated = verify_password(&form.password, &user.password)?;
    if !authenticated {
        return Err(ValidationError::InvalidCredentials.into());
    }

    generate_jwt_session(&user, secret, lifetime_hours)
}

pub async fn change_password(
    user_id: Id,
    form: PasswordChange,
    pool: &Pool<Sqlite>,
) -> Result<(), Error> {
    if form.new_password.is_empty() {
        return Err(ValidationError::MissingField("new_password").into());
    }
    let user = require_user(user_id, pool).await?;

    let authenticated = verify_password(&form.current_password, &user.password)?;
    if !authenticated {
        return Err(ValidationError::InvalidCredentials.into());
    }

    let password = hash_password(&form.new_password)?;
    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;
    log::info!("User {user_id} changed their password");

    Ok(())
}

/// Replaces the avatar; the previous file is removed once the row points at the new one.
pub async fn set_avatar(
    user_id: Id,
    input: AvatarInput,
    media: &MediaStore,
    pool: &Pool<Sqlite>,
) -> Result<Option<String>, Error> {
    let avatar = input.avatar.ok_or(ValidationError::MissingField("avatar"))?;
    let image = Base64Image::try_from(avatar.as_str())?;

    let user = require_user(user_id, pool).await?;
    let url = media.save(AVATAR_MEDIA_FOLDER, &image).await?;

    let result = sqlx::query("UPDATE users SET avatar = $1 WHERE id = $2")
        .bind(&url)
        .bind(user_id)
        .execute(pool)
        .await;
    if let Err(e) = result {
        media.remove(&url).await;
        return Err(QueryError::from(e).into());
    }

    if let Some(previous) = user.avatar {
        media.remove(&previous).await;
    }

    Ok(Some(url))
}

pub async fn delete_avatar(
    user_id: Id,
    media: &MediaStore,
    pool: &Pool<Sqlite>,
) -> Result<(), Error> {
    let user = require_user(user_id, pool).await?;

    sqlx::query("UPDATE users SET avatar = NULL WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if let Some(previous) = user.avatar {
        media.remove(&previous).await;
    }

    Ok(())
}
