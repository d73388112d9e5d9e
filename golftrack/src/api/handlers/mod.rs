//! Page handlers.
//!
//! Handlers that accept forms re-render the form on client errors, with the problem shown as a
//! flash message and the matching status code. Everything else goes through [`Error`]'s
//! `IntoResponse`.

use axum::http::StatusCode;

use crate::db::errors::DbError;
use crate::errors::{Error, Result};

pub mod auth;
pub mod home;
pub mod news;
pub mod rounds;
pub mod static_assets;

/// Split errors a form can show back to the user from ones it can't.
///
/// Returns the status and message to re-render the form with, or the original error when it
/// should propagate.
pub(crate) fn shown_on_form(err: Error) -> Result<(StatusCode, String)> {
    match err {
        Error::BadRequest { .. }
        | Error::Conflict { .. }
        | Error::InvalidCredentials
        | Error::Database(DbError::UniqueViolation { .. })
        | Error::Database(DbError::CheckViolation { .. }) => Ok((err.status_code(), err.user_message())),
        other => Err(other),
    }
}
