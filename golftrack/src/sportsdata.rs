//! Client for the sportsdata.io golf API.
//!
//! Responses are passed through as untyped JSON; templates pick out the fields they show. There
//! are no retries: a failed call surfaces as [`Error::Upstream`] and the page degrades.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rustls::crypto::CryptoProvider;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::config::SportsDataConfig;
use crate::errors::{Error, Result};
use crate::types::{PlayerId, TournamentId};

const SERVICE: &str = "sportsdata";
const API_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
/// Longest upstream error body kept in logs
const MAX_ERROR_BODY: usize = 256;

/// The golf data the news pages need.
///
/// In practice this is [`SportsDataReqwest`]; the trait keeps handlers independent of the HTTP
/// client.
#[async_trait]
pub trait SportsData: Send + Sync {
    /// Tour schedule for a season
    async fn tournaments(&self, season: i32) -> Result<Value>;
    /// Leaderboard of one tournament
    async fn leaderboard(&self, tournament_id: TournamentId) -> Result<Value>;
    /// Per-player season statistics, including world ranking
    async fn player_season_stats(&self, season: i32) -> Result<Value>;
    async fn player(&self, player_id: PlayerId) -> Result<Value>;
    async fn news_by_player(&self, player_id: PlayerId) -> Result<Value>;
    /// Latest golf news across all players
    async fn news(&self) -> Result<Value>;
}

pub struct SportsDataReqwest {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

/// Install the aws-lc-rs provider for rustls unless one is already in place.
///
/// reqwest is built without a default provider, so a client cannot be built before this runs.
fn ensure_crypto_provider() {
    if CryptoProvider::get_default().is_none() {
        // Another thread may have installed one in the meantime; either way a provider is set
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    }
}

impl SportsDataReqwest {
    pub fn new(config: &SportsDataConfig) -> anyhow::Result<Self> {
        ensure_crypto_provider();
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            base_url: ensure_slash(&config.base_url),
            api_key: config.api_key.clone(),
        })
    }

    #[instrument(skip(self), err)]
    async fn get_json(&self, path: &str) -> Result<Value> {
        let upstream = |message: String| Error::Upstream {
            service: SERVICE.to_string(),
            message,
        };

        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| upstream("no API key configured".to_string()))?;

        let url = self
            .base_url
            .join(path)
            .map_err(|e| upstream(format!("failed to construct URL for {path}: {e}")))?;
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, api_key)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    upstream(format!("request to {path} timed out"))
                } else {
                    upstream(format!("request to {path} failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(upstream(describe_status(status, path, &body)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| upstream(format!("invalid JSON from {path}: {e}")))
    }
}

fn describe_status(status: StatusCode, path: &str, body: &str) -> String {
    if body.is_empty() {
        format!("{path} returned {status}")
    } else {
        format!("{path} returned {status}: {body}")
    }
}

/// Makes sure a url has a trailing slash, so that `join` appends rather than replaces the last
/// path segment.
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        return url.clone();
    }
    let mut new_url = url.clone();
    let path = format!("{}/", new_url.path());
    new_url.set_path(&path);
    new_url
}

#[async_trait]
impl SportsData for SportsDataReqwest {
    async fn tournaments(&self, season: i32) -> Result<Value> {
        self.get_json(&format!("Tournaments/{season}")).await
    }

    async fn leaderboard(&self, tournament_id: TournamentId) -> Result<Value> {
        self.get_json(&format!("Leaderboard/{tournament_id}")).await
    }

    async fn player_season_stats(&self, season: i32) -> Result<Value> {
        self.get_json(&format!("PlayerSeasonStats/{season}")).await
    }

    async fn player(&self, player_id: PlayerId) -> Result<Value> {
        self.get_json(&format!("Player/{player_id}")).await
    }

    async fn news_by_player(&self, player_id: PlayerId) -> Result<Value> {
        self.get_json(&format!("NewsByPlayerID/{player_id}")).await
    }

    async fn news(&self) -> Result<Value> {
        self.get_json("News").await
    }
}
