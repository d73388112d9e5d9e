//! Server-rendered HTML pages.
//!
//! Templates are compiled into the binary and registered once at startup. Every page gets the
//! current user and the pending flash messages alongside its own data.

use std::sync::Arc;

use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;
use tracing::error;

use crate::api::models::users::CurrentUser;
use crate::errors::{Error, Result};
use crate::flash::{FlashMessage, Flashes, clear_flash_cookie};

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("welcome.html", include_str!("../templates/welcome.html")),
    ("dashboard.html", include_str!("../templates/dashboard.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("signup.html", include_str!("../templates/signup.html")),
    ("golf_round/form.html", include_str!("../templates/golf_round/form.html")),
    ("golf_round/history.html", include_str!("../templates/golf_round/history.html")),
    ("golf_round/details.html", include_str!("../templates/golf_round/details.html")),
    ("golf_news/home.html", include_str!("../templates/golf_news/home.html")),
    ("golf_news/schedule.html", include_str!("../templates/golf_news/schedule.html")),
    ("golf_news/leaderboard.html", include_str!("../templates/golf_news/leaderboard.html")),
    ("golf_news/world_rankings.html", include_str!("../templates/golf_news/world_rankings.html")),
    ("golf_news/player.html", include_str!("../templates/golf_news/player.html")),
];

/// Context shared by every page
#[derive(Serialize)]
struct PageContext<'a, T: Serialize> {
    current_user: Option<&'a CurrentUser>,
    flashes: &'a [FlashMessage],
    #[serde(flatten)]
    data: T,
}

#[derive(Clone)]
pub struct Templates {
    env: Arc<Environment<'static>>,
}

impl Templates {
    pub fn new() -> anyhow::Result<Self> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env: Arc::new(env) })
    }

    /// Render a template with an arbitrary context
    pub fn render<T: Serialize>(&self, name: &str, context: T) -> Result<String> {
        self.env
            .get_template(name)
            .and_then(|template| template.render(context))
            .map_err(|e| {
                error!("Failed to render {name}: {e:#}");
                Error::Internal {
                    operation: format!("render {name}"),
                }
            })
    }

    /// Render a full page for `user`, consuming the request's flash messages
    pub fn page<T: Serialize>(&self, name: &str, user: Option<&CurrentUser>, flashes: &Flashes, data: T) -> Result<Page> {
        let html = self.render(
            name,
            PageContext {
                current_user: user,
                flashes: flashes.messages(),
                data,
            },
        )?;

        Ok(Page {
            status: StatusCode::OK,
            html,
            clear_flash: flashes.consumed_cookie(),
        })
    }
}

/// A rendered page
#[derive(Debug)]
pub struct Page {
    status: StatusCode,
    html: String,
    clear_flash: bool,
}

impl Page {
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        let mut response = (self.status, Html(self.html)).into_response();
        let expire_flash = self
            .clear_flash
            .then(clear_flash_cookie)
            .and_then(|cookie| HeaderValue::from_str(&cookie).ok());
        if let Some(value) = expire_flash {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        response
    }
}
