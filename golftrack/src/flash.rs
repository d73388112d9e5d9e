//! One-shot flash messages carried between a redirect and the next rendered page.
//!
//! Messages are serialized to JSON, base64url encoded and stored in a short-lived cookie. The
//! [`Flashes`] extractor reads them back, and rendering a page with them clears the cookie.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::utils::cookie_value;

pub const FLASH_COOKIE_NAME: &str = "golftrack_flash";

/// How long an unread flash survives, in seconds
const FLASH_MAX_AGE: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Success,
    Info,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub category: FlashCategory,
    pub message: String,
}

impl FlashMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Info,
            message: message.into(),
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Danger,
            message: message.into(),
        }
    }
}

/// Build the `Set-Cookie` value that queues messages for the next page
pub fn flash_cookie(messages: &[FlashMessage]) -> String {
    let payload = serde_json::to_vec(messages).unwrap_or_default();
    format!(
        "{FLASH_COOKIE_NAME}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={FLASH_MAX_AGE}",
        URL_SAFE_NO_PAD.encode(payload)
    )
}

/// Build the `Set-Cookie` value that drops any queued messages
pub fn clear_flash_cookie() -> String {
    format!("{FLASH_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Redirect to `location`, queueing `messages` for the page it lands on
pub fn redirect_with_flash(location: &str, messages: &[FlashMessage]) -> Response {
    (AppendHeaders([(header::SET_COOKIE, flash_cookie(messages))]), Redirect::to(location)).into_response()
}

fn decode(value: &str) -> Option<Vec<FlashMessage>> {
    let bytes = URL_SAFE_NO_PAD.decode(value).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Flash messages queued for this request, plus any the handler adds while rendering.
#[derive(Debug, Clone, Default)]
pub struct Flashes {
    messages: Vec<FlashMessage>,
    from_cookie: bool,
}

impl Flashes {
    pub fn push(&mut self, message: FlashMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[FlashMessage] {
        &self.messages
    }

    /// Whether the response should expire the flash cookie
    pub fn consumed_cookie(&self) -> bool {
        self.from_cookie
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Flashes {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = cookie_value(&parts.headers, FLASH_COOKIE_NAME) else {
            return Ok(Self::default());
        };

        let messages = decode(&raw).unwrap_or_else(|| {
            debug!("Discarding undecodable flash cookie");
            Vec::new()
        });

        Ok(Self {
            messages,
            from_cookie: true,
        })
    }
}
