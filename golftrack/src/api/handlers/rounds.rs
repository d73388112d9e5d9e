use axum::{
    extract::{Form, Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    AppState,
    api::handlers::shown_on_form,
    api::models::{
        rounds::{HoleCount, RoundForm, RoundSummary},
        users::CurrentUser,
    },
    errors::Result,
    flash::{FlashMessage, Flashes, redirect_with_flash},
    recorder,
    templates::Page,
    types::{RoundId, abbrev_uuid},
};

const HISTORY_PATH: &str = "/golf_round/history";

/// `?holes=9` on the generic add page
#[derive(Debug, Deserialize)]
pub struct AddRoundQuery {
    pub holes: Option<usize>,
}

#[derive(Serialize)]
struct RoundFormPage<'a> {
    form: &'a RoundForm,
    /// Indices of the hole rows to render
    holes: Vec<usize>,
    hole_count: usize,
    action: &'a str,
    heading: &'a str,
    /// Whether the page may switch between 9 and 18 holes
    choose_hole_count: bool,
}

struct FormTarget<'a> {
    action: &'a str,
    heading: &'a str,
    choose_hole_count: bool,
}

const ADD: FormTarget<'static> = FormTarget {
    action: "/golf_round/add",
    heading: "Add a round",
    choose_hole_count: true,
};
const ADD_NINE: FormTarget<'static> = FormTarget {
    action: "/golf_round/add9",
    heading: "Add a 9-hole round",
    choose_hole_count: false,
};
const ADD_EIGHTEEN: FormTarget<'static> = FormTarget {
    action: "/golf_round/add18",
    heading: "Add an 18-hole round",
    choose_hole_count: false,
};

fn render_form(
    state: &AppState,
    user: &CurrentUser,
    flashes: &Flashes,
    form: &RoundForm,
    hole_count: HoleCount,
    target: &FormTarget<'_>,
) -> Result<Page> {
    state.templates.page(
        "golf_round/form.html",
        Some(user),
        flashes,
        RoundFormPage {
            form,
            holes: (0..hole_count.holes()).collect(),
            hole_count: hole_count.holes(),
            action: target.action,
            heading: target.heading,
            choose_hole_count: target.choose_hole_count,
        },
    )
}

/// Validate and store a new round, or show the form again with the problem
async fn submit_new_round(
    state: &AppState,
    user: &CurrentUser,
    mut flashes: Flashes,
    pairs: Vec<(String, String)>,
    expected: Option<HoleCount>,
    target: &FormTarget<'_>,
) -> Result<Response> {
    let form = RoundForm::from_pairs(pairs);
    let result = match form.validate(expected) {
        Ok(submission) => recorder::create_round(&state.db, user, submission).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(round) => Ok(redirect_with_flash(
            "/",
            &[FlashMessage::success(format!("Round at {} saved ({})", round.course_name, round.to_par))],
        )),
        Err(err) => {
            let (status, message) = shown_on_form(err)?;
            flashes.push(FlashMessage::danger(message));
            let hole_count = expected.or_else(|| form.requested_hole_count()).unwrap_or(HoleCount::Eighteen);
            Ok(render_form(state, user, &flashes, &form, hole_count, target)?
                .with_status(status)
                .into_response())
        }
    }
}

#[instrument(skip_all)]
pub async fn add_round_page(
    State(state): State<AppState>,
    user: CurrentUser,
    flashes: Flashes,
    Query(query): Query<AddRoundQuery>,
) -> Result<Page> {
    let hole_count = query.holes.and_then(HoleCount::from_len).unwrap_or(HoleCount::Eighteen);
    render_form(&state, &user, &flashes, &RoundForm::default(), hole_count, &ADD)
}

#[instrument(skip_all, fields(user_id = %abbrev_uuid(&user.id)))]
pub async fn add_round(
    State(state): State<AppState>,
    user: CurrentUser,
    flashes: Flashes,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    submit_new_round(&state, &user, flashes, pairs, None, &ADD).await
}

#[instrument(skip_all)]
pub async fn add_nine_page(State(state): State<AppState>, user: CurrentUser, flashes: Flashes) -> Result<Page> {
    render_form(&state, &user, &flashes, &RoundForm::default(), HoleCount::Nine, &ADD_NINE)
}

#[instrument(skip_all, fields(user_id = %abbrev_uuid(&user.id)))]
pub async fn add_nine(
    State(state): State<AppState>,
    user: CurrentUser,
    flashes: Flashes,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    submit_new_round(&state, &user, flashes, pairs, Some(HoleCount::Nine), &ADD_NINE).await
}

#[instrument(skip_all)]
pub async fn add_eighteen_page(State(state): State<AppState>, user: CurrentUser, flashes: Flashes) -> Result<Page> {
    render_form(&state, &user, &flashes, &RoundForm::default(), HoleCount::Eighteen, &ADD_EIGHTEEN)
}

#[instrument(skip_all, fields(user_id = %abbrev_uuid(&user.id)))]
pub async fn add_eighteen(
    State(state): State<AppState>,
    user: CurrentUser,
    flashes: Flashes,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    submit_new_round(&state, &user, flashes, pairs, Some(HoleCount::Eighteen), &ADD_EIGHTEEN).await
}

#[derive(Serialize)]
struct HistoryPage {
    rounds: Vec<RoundSummary>,
}

#[instrument(skip_all, fields(user_id = %abbrev_uuid(&user.id)))]
pub async fn history(State(state): State<AppState>, user: CurrentUser, flashes: Flashes) -> Result<Page> {
    let rounds = recorder::list_rounds(&state.db, user.id, None).await?;
    state
        .templates
        .page("golf_round/history.html", Some(&user), &flashes, HistoryPage { rounds })
}

#[instrument(skip_all, fields(round_id = %abbrev_uuid(&round_id)))]
pub async fn details(
    State(state): State<AppState>,
    user: CurrentUser,
    flashes: Flashes,
    Path(round_id): Path<RoundId>,
) -> Result<Page> {
    let details = recorder::get_round(&state.db, &user, round_id).await?;
    state.templates.page("golf_round/details.html", Some(&user), &flashes, details)
}

fn edit_target(round_id: RoundId) -> String {
    format!("/golf_round/{round_id}/edit")
}

#[instrument(skip_all, fields(round_id = %abbrev_uuid(&round_id)))]
pub async fn edit_round_page(
    State(state): State<AppState>,
    user: CurrentUser,
    flashes: Flashes,
    Path(round_id): Path<RoundId>,
) -> Result<Page> {
    let details = recorder::get_round(&state.db, &user, round_id).await?;
    let hole_count = HoleCount::from_len(details.holes.len()).unwrap_or(HoleCount::Eighteen);
    let action = edit_target(round_id);
    let target = FormTarget {
        action: &action,
        heading: "Edit round",
        choose_hole_count: false,
    };
    render_form(&state, &user, &flashes, &RoundForm::from_details(&details), hole_count, &target)
}

#[instrument(skip_all, fields(round_id = %abbrev_uuid(&round_id)))]
pub async fn edit_round(
    State(state): State<AppState>,
    user: CurrentUser,
    mut flashes: Flashes,
    Path(round_id): Path<RoundId>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let form = RoundForm::from_pairs(pairs);
    let result = match form.validate(None) {
        Ok(submission) => recorder::edit_round(&state.db, &user, round_id, submission).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => Ok(redirect_with_flash(
            &format!("/golf_round/{round_id}"),
            &[FlashMessage::success("Round updated")],
        )),
        Err(err) => {
            let (status, message) = shown_on_form(err)?;
            flashes.push(FlashMessage::danger(message));
            let hole_count = form.requested_hole_count().unwrap_or(HoleCount::Eighteen);
            let action = edit_target(round_id);
            let target = FormTarget {
                action: &action,
                heading: "Edit round",
                choose_hole_count: false,
            };
            Ok(render_form(&state, &user, &flashes, &form, hole_count, &target)?
                .with_status(status)
                .into_response())
        }
    }
}

#[instrument(skip_all, fields(round_id = %abbrev_uuid(&round_id)))]
pub async fn delete_round(State(state): State<AppState>, user: CurrentUser, Path(round_id): Path<RoundId>) -> Result<Response> {
    recorder::delete_round(&state.db, &user, round_id).await?;
    Ok(redirect_with_flash(HISTORY_PATH, &[FlashMessage::info("Round deleted")]))
}
