//! Read-only aggregate queries over a user's rounds and holes.

use crate::db::{
    errors::Result,
    models::stats::{AverageScoreRow, HoleResult, HoleTotals, RoundPutts, RoundScore},
};
use crate::types::{UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

pub struct RoundStats<'c> {
    db: &'c mut PgConnection,
}

impl<'c> RoundStats<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Holes played, fairways hit and greens in regulation across all of a user's rounds
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn hole_totals(&mut self, user_id: UserId) -> Result<HoleTotals> {
        let totals = sqlx::query_as::<_, HoleTotals>(
            r#"
            SELECT
                COUNT(h.id) AS holes_played,
                COUNT(h.id) FILTER (WHERE h.fairway_hit) AS fairways_hit,
                COUNT(h.id) FILTER (WHERE h.green_in_regulation) AS greens_in_regulation
            FROM holes h
            JOIN golf_rounds r ON r.id = h.golf_round_id
            WHERE r.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(totals)
    }

    /// Total putts for each of the `limit` most recent rounds, oldest first
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn putts_per_round(&mut self, user_id: UserId, limit: i64) -> Result<Vec<RoundPutts>> {
        let putts = sqlx::query_as::<_, RoundPutts>(
            r#"
            SELECT round_id, date_played, putts
            FROM (
                SELECT r.id AS round_id, r.date_played, r.created_at, COALESCE(SUM(h.putts), 0)::BIGINT AS putts
                FROM golf_rounds r
                LEFT JOIN holes h ON h.golf_round_id = r.id
                WHERE r.user_id = $1
                GROUP BY r.id
                ORDER BY r.date_played DESC, r.created_at DESC
                LIMIT $2
            ) recent
            ORDER BY date_played ASC, created_at ASC
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(putts)
    }

    /// Total scores of the `limit` most recent rounds, oldest first
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn recent_scores(&mut self, user_id: UserId, limit: i64) -> Result<Vec<RoundScore>> {
        let scores = sqlx::query_as::<_, RoundScore>(
            r#"
            SELECT date_played, total_score
            FROM (
                SELECT date_played, created_at, total_score
                FROM golf_rounds
                WHERE user_id = $1
                ORDER BY date_played DESC, created_at DESC
                LIMIT $2
            ) recent
            ORDER BY date_played ASC, created_at ASC
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(scores)
    }

    /// Round and per-par hole averages, unrounded
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn average_scores(&mut self, user_id: UserId) -> Result<AverageScoreRow> {
        let averages = sqlx::query_as::<_, AverageScoreRow>(
            r#"
            SELECT
                (SELECT AVG(total_score)::FLOAT8 FROM golf_rounds WHERE user_id = $1) AS avg_total_score,
                (SELECT AVG(total_score::FLOAT8 / 2) FROM golf_rounds WHERE user_id = $1) AS avg_half_total_score,
                (AVG(h.score) FILTER (WHERE h.par = 3))::FLOAT8 AS avg_par3_score,
                (AVG(h.score) FILTER (WHERE h.par = 4))::FLOAT8 AS avg_par4_score,
                (AVG(h.score) FILTER (WHERE h.par = 5))::FLOAT8 AS avg_par5_score
            FROM holes h
            JOIN golf_rounds r ON r.id = h.golf_round_id
            WHERE r.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(averages)
    }

    /// Par and score of every hole the user has played
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn hole_results(&mut self, user_id: UserId) -> Result<Vec<HoleResult>> {
        let results = sqlx::query_as::<_, HoleResult>(
            r#"
            SELECT h.par, h.score
            FROM holes h
            JOIN golf_rounds r ON r.id = h.golf_round_id
            WHERE r.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Repository, Rounds};
    use crate::db::models::rounds::{HoleScoreDBRequest, RoundCreateDBRequest};
    use crate::test_utils::{create_test_user, sample_holes};
    use chrono::NaiveDate;
    use sqlx::PgPool;

    async fn add_round(pool: &PgPool, user_id: UserId, day: u32, holes: Vec<HoleScoreDBRequest>) {
        let mut conn = pool.acquire().await.unwrap();
        Rounds::new(&mut conn)
            .create(&RoundCreateDBRequest {
                user_id,
                date_played: NaiveDate::from_ymd_opt(2024, 7, day).unwrap(),
                course_name: "Augusta National".to_string(),
                holes,
            })
            .await
            .unwrap();
    }

    #[sqlx::test]
    async fn test_empty_history(pool: PgPool) {
        let user = create_test_user(&pool, "nobody").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut stats = RoundStats::new(&mut conn);

        assert_eq!(stats.hole_totals(user.id).await.unwrap(), HoleTotals::default());
        assert_eq!(stats.average_scores(user.id).await.unwrap(), AverageScoreRow::default());
        assert!(stats.putts_per_round(user.id, 10).await.unwrap().is_empty());
        assert!(stats.recent_scores(user.id, 10).await.unwrap().is_empty());
        assert!(stats.hole_results(user.id).await.unwrap().is_empty());
    }

    #[sqlx::test]
    async fn test_hole_totals_count_flags(pool: PgPool) {
        let user = create_test_user(&pool, "jack").await;
        let other = create_test_user(&pool, "arnie").await;
        let holes = sample_holes(9);
        let fairways = holes.iter().filter(|h| h.fairway_hit).count() as i64;
        let greens = holes.iter().filter(|h| h.green_in_regulation).count() as i64;
        add_round(&pool, user.id, 1, holes).await;
        add_round(&pool, other.id, 1, sample_holes(18)).await;

        let mut conn = pool.acquire().await.unwrap();
        let totals = RoundStats::new(&mut conn).hole_totals(user.id).await.unwrap();
        assert_eq!(
            totals,
            HoleTotals {
                holes_played: 9,
                fairways_hit: fairways,
                greens_in_regulation: greens,
            }
        );
    }

    #[sqlx::test]
    async fn test_putts_per_round_keeps_ten_most_recent_oldest_first(pool: PgPool) {
        let user = create_test_user(&pool, "jack").await;
        for day in 1..=12 {
            add_round(&pool, user.id, day, sample_holes(9)).await;
        }
        let putts_per_nine: i64 = sample_holes(9).iter().map(|h| h.putts as i64).sum();

        let mut conn = pool.acquire().await.unwrap();
        let putts = RoundStats::new(&mut conn).putts_per_round(user.id, 10).await.unwrap();

        assert_eq!(putts.len(), 10);
        assert_eq!(putts.first().unwrap().date_played, NaiveDate::from_ymd_opt(2024, 7, 3).unwrap());
        assert_eq!(putts.last().unwrap().date_played, NaiveDate::from_ymd_opt(2024, 7, 12).unwrap());
        assert!(putts.iter().all(|p| p.putts == putts_per_nine));
    }

    #[sqlx::test]
    async fn test_average_scores(pool: PgPool) {
        let user = create_test_user(&pool, "jack").await;
        let flat = |par: i32, score: i32| HoleScoreDBRequest {
            par,
            fairway_hit: false,
            green_in_regulation: false,
            putts: 2,
            score,
        };
        // Round one: par 3s in 4, par 4s in 5, par 5s in 5
        let mut first: Vec<_> = (0..3).map(|_| flat(3, 4)).collect();
        first.extend((0..3).map(|_| flat(4, 5)));
        first.extend((0..3).map(|_| flat(5, 5)));
        // Round two: everything in par
        let mut second: Vec<_> = (0..3).map(|_| flat(3, 3)).collect();
        second.extend((0..3).map(|_| flat(4, 4)));
        second.extend((0..3).map(|_| flat(5, 5)));
        add_round(&pool, user.id, 1, first).await;
        add_round(&pool, user.id, 2, second).await;

        let mut conn = pool.acquire().await.unwrap();
        let averages = RoundStats::new(&mut conn).average_scores(user.id).await.unwrap();

        // Totals are 42 and 36
        assert_eq!(averages.avg_total_score, Some(39.0));
        assert_eq!(averages.avg_half_total_score, Some(19.5));
        assert_eq!(averages.avg_par3_score, Some(3.5));
        assert_eq!(averages.avg_par4_score, Some(4.5));
        assert_eq!(averages.avg_par5_score, Some(5.0));
    }
}
