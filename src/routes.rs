use std::{collections::HashMap, convert::Infallible, sync::Arc};

use serde::de::DeserializeOwned;
use serde_json::json;
use warp::{
    http::{StatusCode, Uri},
    reject::Rejection,
    reply::Reply,
    Filter,
};

use crate::{
    actions::{self, RecipeList},
    constants::BODY_LIMIT,
    error::Error,
    form::{Form, QueryData},
    jwt::SessionData,
    middleware::{with_possible_session, with_session, with_state},
    permissions::ActionType,
    schema::{
        AvatarInput, Id, LoginForm, NewIngredient, NewTag, NewUser, PasswordChange, RecipeFilter,
        RecipeInput,
    },
    state::State,
};

const SESSION_COOKIE: &str = "session";

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(BODY_LIMIT).and(warp::body::json())
}

fn query() -> impl Filter<Extract = (Form,), Error = Rejection> + Clone {
    warp::query::<QueryData>().map(Form::from_data)
}

fn created<T: serde::Serialize>(value: &T) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(value), StatusCode::CREATED)
}

fn no_content() -> impl Reply {
    warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT)
}

fn viewer(session: &Option<SessionData>) -> Option<Id> {
    session.as_ref().map(|s| s.user_id)
}

/// Every route of the service, without the rejection handler.
pub fn routes(
    state: Arc<State>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let media = warp::path("media").and(warp::fs::dir(state.config.media_root.clone()));

    tag_routes(state.clone())
        .or(ingredient_routes(state.clone()))
        .or(recipe_routes(state.clone()))
        .or(recipe_list_routes(state.clone()))
        .or(user_routes(state.clone()))
        .or(auth_routes(state.clone()))
        .or(short_link_redirect(state))
        .or(media)
}

fn tag_routes(state: Arc<State>) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::get()
        .and(warp::path!("api" / "tags"))
        .and(with_state(state.clone()))
        .and_then(|state: Arc<State>| async move {
            let tags = actions::list_tags(&state.pool).await?;
            Ok::<_, Rejection>(warp::reply::json(&tags))
        });

    let get = warp::get()
        .and(warp::path!("api" / "tags" / Id))
        .and(with_state(state.clone()))
        .and_then(|id: Id, state: Arc<State>| async move {
            let tag = actions::get_tag(id, &state.pool)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Tag {id} does not exist")))?;
            Ok::<_, Rejection>(warp::reply::json(&tag))
        });

    let create = warp::post()
        .and(warp::path!("api" / "tags"))
        .and(with_session(state.clone()))
        .and(json_body::<NewTag>())
        .and(with_state(state))
        .and_then(
            |session: SessionData, tag: NewTag, state: Arc<State>| async move {
                session.authenticate(ActionType::ManageCatalog)?;
                let tag = actions::create_tag(tag, &state.pool).await?;
                Ok::<_, Rejection>(created(&tag))
            },
        );

    list.or(get).or(create)
}

fn ingredient_routes(
    state: Arc<State>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::get()
        .and(warp::path!("api" / "ingredients"))
        .and(query())
        .and(with_state(state.clone()))
        .and_then(|form: Form, state: Arc<State>| async move {
            let ingredients = actions::list_ingredients(form.get_str("name"), &state.pool).await?;
            Ok::<_, Rejection>(warp::reply::json(&ingredients))
        });

    let get = warp::get()
        .and(warp::path!("api" / "ingredients" / Id))
        .and(with_state(state.clone()))
        .and_then(|id: Id, state: Arc<State>| async move {
            let ingredient = actions::get_ingredient(id, &state.pool)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Ingredient {id} does not exist")))?;
            Ok::<_, Rejection>(warp::reply::json(&ingredient))
        });

    let create = warp::post()
        .and(warp::path!("api" / "ingredients"))
        .and(with_session(state.clone()))
        .and(json_body::<NewIngredient>())
        .and(with_state(state))
        .and_then(
            |session: SessionData, ingredient: NewIngredient, state: Arc<State>| async move {
                session.authenticate(ActionType::ManageCatalog)?;
                let ingredient = actions::create_ingredient(ingredient, &state.pool).await?;
                Ok::<_, Rejection>(created(&ingredient))
            },
        );

    list.or(get).or(create)
}

fn recipe_filter(form: &Form) -> RecipeFilter {
    RecipeFilter {
        author: form.get_number("author"),
        tags: form.get_all("tags"),
        is_favorited: form.get_flag("is_favorited"),
        is_in_shopping_cart: form.get_flag("is_in_shopping_cart"),
    }
}

fn recipe_routes(
    state: Arc<State>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::get()
        .and(warp::path!("api" / "recipes"))
        .and(with_possible_session(state.clone()))
        .and(query())
        .and(with_state(state.clone()))
        .and_then(
            |session: Option<SessionData>, form: Form, state: Arc<State>| async move {
                let page = actions::list_recipes(
                    &recipe_filter(&form),
                    viewer(&session),
                    form.page_request(),
                    &state.pool,
                )
                .await?;
                Ok::<_, Rejection>(warp::reply::json(&page))
            },
        );

    let create = warp::post()
        .and(warp::path!("api" / "recipes"))
        .and(with_session(state.clone()))
        .and(json_body::<RecipeInput>())
        .and(with_state(state.clone()))
        .and_then(
            |session: SessionData, input: RecipeInput, state: Arc<State>| async move {
                session.authenticate(ActionType::CreateRecipes)?;
                let recipe =
                    actions::create_recipe(session.user_id, input, &state.media, &state.pool)
                        .await?;
                Ok::<_, Rejection>(created(&recipe))
            },
        );

    let get = warp::get()
        .and(warp::path!("api" / "recipes" / Id))
        .and(with_possible_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(
            |id: Id, session: Option<SessionData>, state: Arc<State>| async move {
                let recipe = actions::get_recipe_view(id, viewer(&session), &state.pool).await?;
                Ok::<_, Rejection>(warp::reply::json(&recipe))
            },
        );

    let update = warp::patch()
        .and(warp::path!("api" / "recipes" / Id))
        .and(with_session(state.clone()))
        .and(json_body::<RecipeInput>())
        .and(with_state(state.clone()))
        .and_then(
            |id: Id, session: SessionData, input: RecipeInput, state: Arc<State>| async move {
                let recipe =
                    actions::update_recipe(id, &session, input, &state.media, &state.pool)
                        .await?;
                Ok::<_, Rejection>(warp::reply::json(&recipe))
            },
        );

    let delete = warp::delete()
        .and(warp::path!("api" / "recipes" / Id))
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(
            |id: Id, session: SessionData, state: Arc<State>| async move {
                actions::delete_recipe(id, &session, &state.media, &state.pool).await?;
                Ok::<_, Rejection>(no_content())
            },
        );

    let get_link = warp::get()
        .and(warp::path!("api" / "recipes" / Id / "get-link"))
        .and(with_state(state))
        .and_then(|id: Id, state: Arc<State>| async move {
            let link = actions::short_link(id, &state.config.base_url, &state.pool).await?;
            Ok::<_, Rejection>(warp::reply::json(&json!({ "short-link": link })))
        });

    list.or(create)
        .or(get)
        .or(update)
        .or(delete)
        .or(get_link)
}

/// `/api/recipes/{id}/<segment>`
fn list_path(segment: &'static str) -> impl Filter<Extract = (Id,), Error = Rejection> + Clone {
    warp::path!("api" / "recipes" / Id / ..)
        .and(warp::path(segment))
        .and(warp::path::end())
}

fn recipe_list_route(
    list: RecipeList,
    segment: &'static str,
    state: Arc<State>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let add = warp::post()
        .and(list_path(segment))
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(
            move |id: Id, session: SessionData, state: Arc<State>| async move {
                session.authenticate(ActionType::ManageOwnLists)?;
                let recipe = list.add(session.user_id, id, &state.pool).await?;
                Ok::<_, Rejection>(created(&recipe))
            },
        );

    let remove = warp::delete()
        .and(list_path(segment))
        .and(with_session(state.clone()))
        .and(with_state(state))
        .and_then(
            move |id: Id, session: SessionData, state: Arc<State>| async move {
                session.authenticate(ActionType::ManageOwnLists)?;
                list.remove(session.user_id, id, &state.pool).await?;
                Ok::<_, Rejection>(no_content())
            },
        );

    add.or(remove)
}

fn recipe_list_routes(
    state: Arc<State>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let download = warp::get()
        .and(warp::path!("api" / "recipes" / "download_shopping_cart"))
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(|session: SessionData, state: Arc<State>| async move {
            session.authenticate(ActionType::ManageOwnLists)?;
            let text = actions::export_shopping_list(session.user_id, &state.pool).await?;
            Ok::<_, Rejection>(warp::reply::with_header(
                text,
                "content-disposition",
                "attachment; filename=\"shopping_list.txt\"",
            ))
        });

    download
        .or(recipe_list_route(
            RecipeList::Favorites,
            "favorite",
            state.clone(),
        ))
        .or(recipe_list_route(
            RecipeList::ShoppingCart,
            "shopping_cart",
            state,
        ))
}

fn user_routes(
    state: Arc<State>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list = warp::get()
        .and(warp::path!("api" / "users"))
        .and(with_possible_session(state.clone()))
        .and(query())
        .and(with_state(state.clone()))
        .and_then(
            |session: Option<SessionData>, form: Form, state: Arc<State>| async move {
                let page =
                    actions::list_users(viewer(&session), form.page_request(), &state.pool)
                        .await?;
                Ok::<_, Rejection>(warp::reply::json(&page))
            },
        );

    let register = warp::post()
        .and(warp::path!("api" / "users"))
        .and(json_body::<NewUser>())
        .and(with_state(state.clone()))
        .and_then(|user: NewUser, state: Arc<State>| async move {
            let user = actions::register_user(user, &state.pool).await?;
            Ok::<_, Rejection>(created(&user))
        });

    let me = warp::get()
        .and(warp::path!("api" / "users" / "me"))
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(|session: SessionData, state: Arc<State>| async move {
            let user =
                actions::get_user_view(session.user_id, Some(session.user_id), &state.pool)
                    .await?;
            Ok::<_, Rejection>(warp::reply::json(&user))
        });

    let get = warp::get()
        .and(warp::path!("api" / "users" / Id))
        .and(with_possible_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(
            |id: Id, session: Option<SessionData>, state: Arc<State>| async move {
                let user = actions::get_user_view(id, viewer(&session), &state.pool).await?;
                Ok::<_, Rejection>(warp::reply::json(&user))
            },
        );

    let set_avatar = warp::put()
        .and(warp::path!("api" / "users" / "me" / "avatar"))
        .and(with_session(state.clone()))
        .and(json_body::<AvatarInput>())
        .and(with_state(state.clone()))
        .and_then(
            |session: SessionData, input: AvatarInput, state: Arc<State>| async move {
                let avatar =
                    actions::set_avatar(session.user_id, input, &state.media, &state.pool)
                        .await?;
                Ok::<_, Rejection>(warp::reply::json(&json!({ "avatar": avatar })))
            },
        );

    let delete_avatar = warp::delete()
        .and(warp::path!("api" / "users" / "me" / "avatar"))
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(|session: SessionData, state: Arc<State>| async move {
            actions::delete_avatar(session.user_id, &state.media, &state.pool).await?;
            Ok::<_, Rejection>(no_content())
        });

    let set_password = warp::post()
        .and(warp::path!("api" / "users" / "set_password"))
        .and(with_session(state.clone()))
        .and(json_body::<PasswordChange>())
        .and(with_state(state.clone()))
        .and_then(
            |session: SessionData, form: PasswordChange, state: Arc<State>| async move {
                actions::change_password(session.user_id, form, &state.pool).await?;
                Ok::<_, Rejection>(no_content())
            },
        );

    let subscriptions = warp::get()
        .and(warp::path!("api" / "users" / "subscriptions"))
        .and(with_session(state.clone()))
        .and(query())
        .and(with_state(state.clone()))
        .and_then(
            |session: SessionData, form: Form, state: Arc<State>| async move {
                session.authenticate(ActionType::ManageSubscriptions)?;
                let page = actions::list_subscriptions(
                    session.user_id,
                    form.page_request(),
                    form.recipes_limit(),
                    &state.pool,
                )
                .await?;
                Ok::<_, Rejection>(warp::reply::json(&page))
            },
        );

    let subscribe = warp::post()
        .and(warp::path!("api" / "users" / Id / "subscribe"))
        .and(with_session(state.clone()))
        .and(query())
        .and(with_state(state.clone()))
        .and_then(
            |id: Id, session: SessionData, form: Form, state: Arc<State>| async move {
                session.authenticate(ActionType::ManageSubscriptions)?;
                let author =
                    actions::follow(session.user_id, id, form.recipes_limit(), &state.pool)
                        .await?;
                Ok::<_, Rejection>(created(&author))
            },
        );

    let unsubscribe = warp::delete()
        .and(warp::path!("api" / "users" / Id / "subscribe"))
        .and(with_session(state.clone()))
        .and(with_state(state))
        .and_then(
            |id: Id, session: SessionData, state: Arc<State>| async move {
                session.authenticate(ActionType::ManageSubscriptions)?;
                actions::unfollow(session.user_id, id, &state.pool).await?;
                Ok::<_, Rejection>(no_content())
            },
        );

    list.or(register)
        .or(me)
        .or(get)
        .or(set_avatar)
        .or(delete_avatar)
        .or(set_password)
        .or(subscriptions)
        .or(subscribe)
        .or(unsubscribe)
}

fn auth_routes(state: Arc<State>) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let login = warp::post()
        .and(warp::path!("api" / "auth" / "token" / "login"))
        .and(json_body::<LoginForm>())
        .and(with_state(state.clone()))
        .and_then(|form: LoginForm, state: Arc<State>| async move {
            let token = actions::login_user(
                form,
                &state.config.session_secret,
                state.config.session_lifetime_hours,
                &state.pool,
            )
            .await?;
            let cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
            Ok::<_, Rejection>(warp::reply::with_header(
                warp::reply::json(&json!({ "auth_token": token })),
                "set-cookie",
                cookie,
            ))
        });

    let logout = warp::post()
        .and(warp::path!("api" / "auth" / "token" / "logout"))
        .and(with_session(state))
        .map(|session: SessionData| {
            log::debug!("User {} logged out", session.user_id);
            warp::reply::with_header(
                no_content(),
                "set-cookie",
                format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0"),
            )
        });

    login.or(logout)
}

fn short_link_redirect(
    state: Arc<State>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::get()
        .and(warp::path!("s" / Id))
        .and(with_state(state))
        .and_then(|id: Id, state: Arc<State>| async move {
            actions::get_recipe(id, &state.pool)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Recipe {id} does not exist")))?;
            let uri: Uri = format!("/recipes/{id}/")
                .parse()
                .map_err(|e| Error::Internal(format!("Invalid redirect target: {e}")))?;
            Ok::<_, Rejection>(warp::redirect::found(uri))
        })
}

/// Renders every rejection as a single-key JSON body.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, key, message) = if let Some(e) = err.find::<Error>() {
        match e {
            Error::Query(q) => log::error!("Query failed: {q}"),
            Error::Internal(info) => log::error!("Internal error: {info}"),
            _ => {}
        }
        (e.status(), e.body_key(), e.to_string())
    } else if let Some(e) = err.find::<warp::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, "errors", e.to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "detail",
            "Request body must be application/json".to_string(),
        )
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, "errors", e.to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "detail",
            "Request body is too large".to_string(),
        )
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "detail", "Not found".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "detail",
            "Method not allowed".to_string(),
        )
    } else {
        log::error!("Unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "detail",
            "Internal server error".to_string(),
        )
    };

    let body = HashMap::from([(key, message)]);
    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}
