use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::{session, utils::cookie_value},
    config::Config,
    db::{errors::DbError, handlers::Users},
    errors::{Error, Result},
    types::UserId,
};
use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use sqlx::PgPool;
use tracing::{debug, instrument, trace};

/// Read the user id out of the session cookie, if there is a valid one.
///
/// Expired, tampered or otherwise unverifiable tokens count as "no session". Only server-side
/// problems (e.g. a missing signing key) are errors.
fn session_user_id(parts: &Parts, config: &Config) -> Result<Option<UserId>> {
    let Some(token) = cookie_value(&parts.headers, &config.auth.session.cookie_name) else {
        trace!("No session cookie present");
        return Ok(None);
    };

    match session::verify_session_token(&token, config) {
        Ok(claims) => Ok(Some(claims.sub)),
        Err(Error::Unauthenticated { .. }) => {
            trace!("Ignoring invalid session token");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Resolve the logged-in user for a request.
#[instrument(skip(parts, config, db))]
async fn authenticate(parts: &Parts, config: &Config, db: &PgPool) -> Result<Option<CurrentUser>> {
    let Some(user_id) = session_user_id(parts, config)? else {
        return Ok(None);
    };

    let mut conn = db.acquire().await.map_err(DbError::from)?;
    let user = Users::new(&mut conn).get_by_id(user_id).await?;

    match user {
        Some(user) => {
            debug!("Found session authenticated user: {}", user.id);
            Ok(Some(user.into()))
        }
        None => {
            debug!("Session refers to a user that no longer exists: {}", user_id);
            Ok(None)
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        authenticate(parts, &state.config, &state.db)
            .await?
            .ok_or(Error::Unauthenticated { message: None })
    }
}

impl OptionalFromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Option<Self>> {
        authenticate(parts, &state.config, &state.db).await
    }
}
