//! Golf news pages backed by the sports-data API.
//!
//! These pages are public. When the upstream call fails the page still renders, with a notice in
//! place of the data.

use axum::extract::{Path, State};
use chrono::{Datelike, Utc};
use serde_json::{Value, json};
use tracing::{instrument, warn};

use crate::{
    AppState,
    api::models::users::CurrentUser,
    errors::{Error, Result},
    flash::Flashes,
    templates::Page,
    types::{PlayerId, TournamentId},
};

/// Turn an upstream failure into "no data", passing anything else through
fn degrade(result: Result<Value>) -> Result<Option<Value>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err @ Error::Upstream { .. }) => {
            warn!("Rendering without golf data: {err}");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn current_season() -> i32 {
    Utc::now().year()
}

/// The tournament flagged as in progress, if the schedule has one
fn in_progress_tournament(schedule: &Value) -> Option<TournamentId> {
    schedule
        .as_array()?
        .iter()
        .find(|t| t["IsInProgress"].as_bool().unwrap_or(false))
        .and_then(|t| t["TournamentID"].as_i64())
}

#[instrument(skip_all)]
pub async fn news_home(State(state): State<AppState>, user: Option<CurrentUser>, flashes: Flashes) -> Result<Page> {
    let news = degrade(state.sports_data.news().await)?;
    state.templates.page(
        "golf_news/home.html",
        user.as_ref(),
        &flashes,
        json!({ "news": news, "unavailable": news.is_none() }),
    )
}

#[instrument(skip_all)]
pub async fn schedule(State(state): State<AppState>, user: Option<CurrentUser>, flashes: Flashes) -> Result<Page> {
    let season = current_season();
    let tournaments = degrade(state.sports_data.tournaments(season).await)?;
    state.templates.page(
        "golf_news/schedule.html",
        user.as_ref(),
        &flashes,
        json!({ "season": season, "tournaments": tournaments, "unavailable": tournaments.is_none() }),
    )
}

fn render_leaderboard(state: &AppState, user: Option<&CurrentUser>, flashes: &Flashes, leaderboard: Option<Value>) -> Result<Page> {
    state.templates.page(
        "golf_news/leaderboard.html",
        user,
        flashes,
        json!({ "leaderboard": leaderboard, "unavailable": leaderboard.is_none() }),
    )
}

#[instrument(skip_all, fields(tournament_id = %tournament_id))]
pub async fn leaderboard(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    flashes: Flashes,
    Path(tournament_id): Path<TournamentId>,
) -> Result<Page> {
    let leaderboard = degrade(state.sports_data.leaderboard(tournament_id).await)?;
    render_leaderboard(&state, user.as_ref(), &flashes, leaderboard)
}

/// Leaderboard of the configured tournament, or of whichever one the schedule says is in progress
#[instrument(skip_all)]
pub async fn current_leaderboard(State(state): State<AppState>, user: Option<CurrentUser>, flashes: Flashes) -> Result<Page> {
    let tournament_id = match state.config.sports_data.current_tournament_id {
        Some(id) => Some(id),
        None => degrade(state.sports_data.tournaments(current_season()).await)?
            .as_ref()
            .and_then(in_progress_tournament),
    };

    let leaderboard = match tournament_id {
        Some(id) => degrade(state.sports_data.leaderboard(id).await)?,
        None => None,
    };
    render_leaderboard(&state, user.as_ref(), &flashes, leaderboard)
}

#[instrument(skip_all)]
pub async fn world_rankings(State(state): State<AppState>, user: Option<CurrentUser>, flashes: Flashes) -> Result<Page> {
    let season = current_season();
    let rankings = degrade(state.sports_data.player_season_stats(season).await)?;
    state.templates.page(
        "golf_news/world_rankings.html",
        user.as_ref(),
        &flashes,
        json!({ "season": season, "rankings": rankings, "unavailable": rankings.is_none() }),
    )
}

#[instrument(skip_all, fields(player_id = %player_id))]
pub async fn player(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    flashes: Flashes,
    Path(player_id): Path<PlayerId>,
) -> Result<Page> {
    let (player, news) = tokio::join!(state.sports_data.player(player_id), state.sports_data.news_by_player(player_id));
    let player = degrade(player)?;
    let news = degrade(news)?;

    state.templates.page(
        "golf_news/player.html",
        user.as_ref(),
        &flashes,
        json!({ "player": player, "news": news, "unavailable": player.is_none() }),
    )
}
