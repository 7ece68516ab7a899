use std::{convert::Infallible, sync::Arc};

use warp::{reject::Rejection, Filter};

use crate::{error::Error, state::State};

use super::jwt::{verify_jwt_session, SessionData};

pub fn with_state(
    state: Arc<State>,
) -> impl Filter<Extract = (Arc<State>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// `Authorization: Token <jwt>` wins over the `session` cookie.
fn session_token() -> impl Filter<Extract = (Option<String>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::cookie::optional::<String>("session"))
        .map(|header: Option<String>, cookie: Option<String>| {
            header
                .and_then(|value| value.strip_prefix("Token ").map(|t| t.trim().to_owned()))
                .or(cookie)
        })
}

pub fn with_session(
    state: Arc<State>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    session_token().and(with_state(state)).and_then(
        |token: Option<String>, state: Arc<State>| async move {
            let token = token.ok_or_else(|| {
                Error::Unauthorized("Authentication credentials were not provided".to_string())
            })?;
            let session = verify_jwt_session(&token, &state.config.session_secret)?;
            Ok::<SessionData, Rejection>(session.into())
        },
    )
}

pub fn with_possible_session(
    state: Arc<State>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    session_token()
        .and(with_state(state))
        .map(|token: Option<String>, state: Arc<State>| {
            token.and_then(|token| {
                verify_jwt_session(&token, &state.config.session_secret)
                    .ok()
                    .map(SessionData::from)
            })
        })
}
