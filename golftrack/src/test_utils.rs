//! Shared fixtures for unit and HTTP tests.

use std::sync::Arc;

use axum_test::TestServer;
use sqlx::PgPool;
use url::Url;

use crate::{
    AppState, build_router,
    auth::{
        password::{Argon2Params, hash_password_with_params},
        session::create_session_token,
    },
    config::{Config, SportsDataConfig},
    db::{
        handlers::Users,
        models::{
            rounds::HoleScoreDBRequest,
            users::{UserCreateDBRequest, UserDBResponse},
        },
    },
    sportsdata::{SportsData, SportsDataReqwest},
    templates::Templates,
};

/// Password of every user made by [`create_test_user`]
pub const TEST_PASSWORD: &str = "correct-horse";

/// Cheap argon2 parameters; tests hash a lot of passwords
const FAST_ARGON2: Argon2Params = Argon2Params {
    memory_kib: 1024,
    iterations: 1,
    parallelism: 1,
};

pub fn create_test_config() -> Config {
    let mut config = Config {
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        sports_data: SportsDataConfig {
            // Nothing listens here, and there is no key, so real calls fail fast
            base_url: Url::parse("http://127.0.0.1:9/golf/v2/json/").unwrap(),
            api_key: None,
            ..Default::default()
        },
        ..Default::default()
    };
    config.auth.allow_registration = true;
    config.auth.session.cookie_secure = false;
    config
}

pub fn create_test_state(pool: PgPool) -> AppState {
    create_test_state_with_config(pool, create_test_config())
}

pub fn create_test_state_with_config(pool: PgPool, config: Config) -> AppState {
    let sports_data = Arc::new(SportsDataReqwest::new(&config.sports_data).unwrap());
    create_test_state_with(pool, config, sports_data)
}

pub fn create_test_state_with(pool: PgPool, config: Config, sports_data: Arc<dyn SportsData>) -> AppState {
    AppState::builder()
        .db(pool)
        .config(config)
        .templates(Templates::new().unwrap())
        .sports_data(sports_data)
        .build()
}

pub fn create_test_server(state: AppState) -> TestServer {
    TestServer::new(build_router(&state).unwrap()).unwrap()
}

/// Insert a user named `username` with email `{username}@example.com` and [`TEST_PASSWORD`]
pub async fn create_test_user(pool: &PgPool, username: &str) -> UserDBResponse {
    let mut conn = pool.acquire().await.unwrap();
    Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: hash_password_with_params(TEST_PASSWORD, FAST_ARGON2).unwrap(),
        })
        .await
        .unwrap()
}

/// `Cookie` header value carrying a valid session for `user`
pub fn session_cookie(user: &UserDBResponse, config: &Config) -> String {
    let token = create_session_token(&user.clone().into(), config).unwrap();
    format!("{}={}", config.auth.session.cookie_name, token)
}

/// `count` valid holes with a mix of pars, results and fairway/green flags
pub fn sample_holes(count: usize) -> Vec<HoleScoreDBRequest> {
    const PARS: [i32; 9] = [4, 3, 5, 4, 4, 3, 4, 5, 4];
    const OVER_PAR: [i32; 9] = [0, 1, -1, 2, 0, 0, 1, -2, 3];

    (0..count)
        .map(|index| {
            let par = PARS[index % PARS.len()];
            HoleScoreDBRequest {
                par,
                fairway_hit: par != 3 && index % 2 == 0,
                green_in_regulation: index % 3 == 0,
                putts: if index % 4 == 0 { 1 } else { 2 },
                score: par + OVER_PAR[index % OVER_PAR.len()],
            }
        })
        .collect()
}
