use axum::{
    extract::{Form, State},
    http::{StatusCode, header},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    AppState,
    api::handlers::shown_on_form,
    api::models::users::{CurrentUser, LoginForm, SignupForm},
    auth::{
        password, session,
        utils::{clear_session_cookie, create_session_cookie},
    },
    config::{Config, PasswordConfig},
    db::{
        errors::DbError,
        handlers::Users,
        models::users::{UserCreateDBRequest, UserDBResponse},
    },
    errors::{Error, Result},
    flash::{FlashMessage, Flashes, flash_cookie},
};

const MAX_USERNAME_LENGTH: usize = 50;
const MAX_EMAIL_LENGTH: usize = 120;

#[derive(Serialize)]
struct SignupPage<'a> {
    form: &'a SignupForm,
    allow_registration: bool,
    password: &'a PasswordConfig,
}

#[derive(Serialize)]
struct LoginPage<'a> {
    form: &'a LoginForm,
}

fn render_signup(state: &AppState, flashes: &Flashes, form: &SignupForm, status: StatusCode) -> Result<Response> {
    let page = state.templates.page(
        "signup.html",
        None,
        flashes,
        SignupPage {
            form,
            allow_registration: state.config.auth.allow_registration,
            password: &state.config.auth.password,
        },
    )?;
    Ok(page.with_status(status).into_response())
}

fn render_login(state: &AppState, flashes: &Flashes, form: &LoginForm, status: StatusCode) -> Result<Response> {
    let page = state.templates.page("login.html", None, flashes, LoginPage { form })?;
    Ok(page.with_status(status).into_response())
}

/// Issue a session cookie for `user` and send them to the dashboard
fn start_session(user: &CurrentUser, config: &Config, greeting: FlashMessage) -> Result<Response> {
    let token = session::create_session_token(user, config)?;
    Ok((
        AppendHeaders([
            (header::SET_COOKIE, create_session_cookie(&token, config)),
            (header::SET_COOKIE, flash_cookie(&[greeting])),
        ]),
        Redirect::to("/"),
    )
        .into_response())
}

fn validate_signup(form: &SignupForm, password: &PasswordConfig) -> Result<()> {
    let bad_request = |message: String| Err(Error::BadRequest { message });

    let username = form.username.trim();
    if username.is_empty() {
        return bad_request("Username is required".to_string());
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return bad_request(format!("Username must be at most {MAX_USERNAME_LENGTH} characters"));
    }

    let email = form.email.trim();
    if !email.contains('@') {
        return bad_request("Please enter a valid email address".to_string());
    }
    if email.chars().count() > MAX_EMAIL_LENGTH {
        return bad_request(format!("Email must be at most {MAX_EMAIL_LENGTH} characters"));
    }

    let length = form.password.chars().count();
    if length < password.min_length {
        return bad_request(format!("Password must be at least {} characters", password.min_length));
    }
    if length > password.max_length {
        return bad_request(format!("Password must be no more than {} characters", password.max_length));
    }

    Ok(())
}

/// Report a unique violation on `users` the same way as the up-front duplicate checks
fn signup_conflict(err: DbError) -> Error {
    if err.is_duplicate_user() {
        Error::Conflict {
            message: Error::Database(err).user_message(),
        }
    } else {
        err.into()
    }
}

/// Create the account, failing with a conflict if the username or email is taken
async fn register_user(state: &AppState, form: &SignupForm) -> Result<UserDBResponse> {
    if !state.config.auth.allow_registration {
        return Err(Error::BadRequest {
            message: "User registration is disabled".to_string(),
        });
    }
    validate_signup(form, &state.config.auth.password)?;

    let username = form.username.trim().to_string();
    let email = form.email.trim().to_string();

    let mut tx = state.db.begin().await.map_err(DbError::from)?;
    let mut users = Users::new(&mut tx);

    if users.get_user_by_username(&username).await?.is_some() {
        return Err(Error::Conflict {
            message: "Username already taken".to_string(),
        });
    }
    if users.get_user_by_email(&email).await?.is_some() {
        return Err(Error::Conflict {
            message: "Email already registered".to_string(),
        });
    }

    // Hash the password on a blocking thread to avoid blocking async runtime
    let password = form.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })??;

    // A concurrent signup can still win the race; the unique constraints turn that into a conflict
    let user = users
        .create(&UserCreateDBRequest {
            username,
            email,
            password_hash,
        })
        .await
        .map_err(signup_conflict)?;

    tx.commit().await.map_err(DbError::from)?;
    Ok(user)
}

#[instrument(skip_all)]
pub async fn signup_page(State(state): State<AppState>, user: Option<CurrentUser>, flashes: Flashes) -> Result<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    render_signup(&state, &flashes, &SignupForm::default(), StatusCode::OK)
}

#[instrument(skip_all, fields(username = %form.username))]
pub async fn signup(State(state): State<AppState>, mut flashes: Flashes, Form(form): Form<SignupForm>) -> Result<Response> {
    match register_user(&state, &form).await {
        Ok(user) => {
            info!("Registered new user {}", user.username);
            let user = CurrentUser::from(user);
            let greeting = FlashMessage::success(format!("Hello, {}!", user.username));
            start_session(&user, &state.config, greeting)
        }
        Err(err) => {
            let (status, message) = shown_on_form(err)?;
            flashes.push(FlashMessage::danger(message));
            render_signup(&state, &flashes, &form, status)
        }
    }
}

#[instrument(skip_all)]
pub async fn login_page(State(state): State<AppState>, user: Option<CurrentUser>, flashes: Flashes) -> Result<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    render_login(&state, &flashes, &LoginForm::default(), StatusCode::OK)
}

/// Check a username/password pair against the stored hash
async fn authenticate(state: &AppState, form: &LoginForm) -> Result<CurrentUser> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let user = Users::new(&mut conn)
        .get_user_by_username(form.username.trim())
        .await?
        .ok_or(Error::InvalidCredentials)?;

    // Verify password on a blocking thread to avoid blocking async runtime
    let password = form.password.clone();
    let hash = user.password_hash.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(Error::InvalidCredentials);
    }
    Ok(user.into())
}

#[instrument(skip_all, fields(username = %form.username))]
pub async fn login(State(state): State<AppState>, mut flashes: Flashes, Form(form): Form<LoginForm>) -> Result<Response> {
    match authenticate(&state, &form).await {
        Ok(user) => {
            info!("User {} logged in", user.username);
            let greeting = FlashMessage::success(format!("Hello, {}!", user.username));
            start_session(&user, &state.config, greeting)
        }
        Err(err) => {
            let (status, message) = shown_on_form(err)?;
            flashes.push(FlashMessage::danger(message));
            render_login(&state, &flashes, &form, status)
        }
    }
}

#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Response {
    (
        AppendHeaders([
            (header::SET_COOKIE, clear_session_cookie(&state.config)),
            (header::SET_COOKIE, flash_cookie(&[FlashMessage::success("You have successfully logged out")])),
        ]),
        Redirect::to("/login"),
    )
        .into_response()
}
