use axum::extract::State;
use serde::Serialize;
use serde_json::json;
use tracing::instrument;

use crate::{
    AppState,
    api::models::{rounds::RoundSummary, users::CurrentUser},
    db::errors::DbError,
    errors::Result,
    flash::Flashes,
    recorder,
    stats::{ScoreCategories, StatsSummary},
    templates::Page,
};

/// Rounds listed on the dashboard
const DASHBOARD_ROUNDS: i64 = 5;

#[derive(Serialize)]
struct Dashboard {
    rounds: Vec<RoundSummary>,
    stats: StatsSummary,
    /// Chart series for `static/app.js`, as a JSON document
    chart_data: String,
}

fn chart_data(stats: &StatsSummary) -> String {
    let ScoreCategories {
        eagles,
        birdies,
        pars,
        bogies,
        double_bogies,
        triples,
        double_pars,
    } = stats.categories;

    json!({
        "recent_scores": stats.recent_scores,
        "putts_per_round": stats.putts_per_round,
        "categories": {
            "labels": ["Eagles", "Birdies", "Pars", "Bogies", "Double bogies", "Triples", "Double pars"],
            "counts": [eagles, birdies, pars, bogies, double_bogies, triples, double_pars],
        },
    })
    .to_string()
}

/// Dashboard for logged-in users, welcome page for everyone else
#[instrument(skip_all)]
pub async fn home(State(state): State<AppState>, user: Option<CurrentUser>, flashes: Flashes) -> Result<Page> {
    let Some(user) = user else {
        return state.templates.page("welcome.html", None, &flashes, json!({}));
    };

    let rounds = recorder::list_rounds(&state.db, user.id, Some(DASHBOARD_ROUNDS)).await?;
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let stats = StatsSummary::for_user(&mut conn, user.id).await?;

    let chart_data = chart_data(&stats);
    state.templates.page(
        "dashboard.html",
        Some(&user),
        &flashes,
        Dashboard {
            rounds,
            stats,
            chart_data,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::rounds::RoundSubmission;
    use crate::test_utils::{create_test_server, create_test_state, create_test_user, sample_holes, session_cookie};
    use chrono::NaiveDate;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_anonymous_visitor_sees_welcome_page(pool: PgPool) {
        let server = create_test_server(create_test_state(pool));

        let response = server.get("/").await;

        response.assert_status_ok();
        assert!(response.text().contains("Sign up"));
    }

    #[sqlx::test]
    async fn test_dashboard_shows_recent_rounds_and_stats(pool: PgPool) {
        let state = create_test_state(pool.clone());
        let user = create_test_user(&pool, "annika").await;
        let cookie = session_cookie(&user, &state.config);
        let current: CurrentUser = user.into();
        for day in 1..=6 {
            recorder::create_round(
                &pool,
                &current,
                RoundSubmission {
                    date_played: NaiveDate::from_ymd_opt(2024, 9, day).unwrap(),
                    course_name: format!("Course {day}"),
                    holes: sample_holes(9),
                },
            )
            .await
            .unwrap();
        }
        let server = create_test_server(state);

        let response = server.get("/").add_header("cookie", &cookie).await;

        response.assert_status_ok();
        let body = response.text();
        assert!(body.contains("Course 6"));
        assert!(body.contains("Course 2"));
        assert!(!body.contains("Course 1<"));
        assert!(body.contains("rgb("));
    }

    #[test]
    fn test_chart_data_is_json() {
        let stats = StatsSummary {
            holes_played: 0,
            fairways: crate::stats::ProgressStat::new(0.0),
            greens_in_regulation: crate::stats::ProgressStat::new(0.0),
            putts_per_round: vec![30, 32],
            recent_scores: vec![80, 78],
            averages: Default::default(),
            categories: ScoreCategories {
                pars: 2,
                ..Default::default()
            },
        };

        let value: serde_json::Value = serde_json::from_str(&chart_data(&stats)).unwrap();
        assert_eq!(value["recent_scores"], json!([80, 78]));
        assert_eq!(value["categories"]["counts"][2], 2);
    }
}
