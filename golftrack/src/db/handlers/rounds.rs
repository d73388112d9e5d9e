//! Database repository for golf rounds and their holes.
//!
//! `par` and `total_score` on a round are never taken from the caller: every write recomputes
//! them from the holes inside the same transaction that writes the holes.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::rounds::{HoleScoreDBRequest, HoleScoreDBResponse, RoundCreateDBRequest, RoundDBResponse, RoundTotals, RoundUpdateDBRequest},
};
use crate::types::{RoundId, UserId, abbrev_uuid};
use sqlx::{Connection, PgConnection};
use tracing::instrument;
use uuid::Uuid;

const ROUND_COLUMNS: &str = "id, user_id, date_played, course_name, par, total_score, created_at, updated_at";

/// Filter for listing a user's rounds, newest first
#[derive(Debug, Clone)]
pub struct RoundFilter {
    pub user_id: UserId,
    pub limit: Option<i64>,
}

impl RoundFilter {
    pub fn for_user(user_id: UserId) -> Self {
        Self { user_id, limit: None }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

pub struct Rounds<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Rounds<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Holes of a round in hole-number order
    #[instrument(skip(self), fields(round_id = %abbrev_uuid(&round_id)), err)]
    pub async fn holes(&mut self, round_id: RoundId) -> Result<Vec<HoleScoreDBResponse>> {
        let holes = sqlx::query_as::<_, HoleScoreDBResponse>(
            r#"
            SELECT id, golf_round_id, hole_number, par, fairway_hit, green_in_regulation, putts, score
            FROM holes
            WHERE golf_round_id = $1
            ORDER BY hole_number
            "#,
        )
        .bind(round_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(holes)
    }

    /// Owner of a round, locking the row until the surrounding transaction ends.
    ///
    /// Returns `None` when the round does not exist.
    #[instrument(skip(self), fields(round_id = %abbrev_uuid(&round_id)), err)]
    pub async fn lock_owner(&mut self, round_id: RoundId) -> Result<Option<UserId>> {
        let owner = sqlx::query_scalar::<_, UserId>("SELECT user_id FROM golf_rounds WHERE id = $1 FOR UPDATE")
            .bind(round_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(owner)
    }

    #[instrument(skip(self), fields(round_id = %abbrev_uuid(&round_id)), err)]
    pub async fn hole_count(&mut self, round_id: RoundId) -> Result<usize> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM holes WHERE golf_round_id = $1")
            .bind(round_id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(usize::try_from(count).unwrap_or_default())
    }
}

async fn insert_holes(conn: &mut PgConnection, round_id: RoundId, holes: &[HoleScoreDBRequest]) -> Result<()> {
    for (index, hole) in holes.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO holes (id, golf_round_id, hole_number, par, fairway_hit, green_in_regulation, putts, score)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(round_id)
        .bind(hole_number(index))
        .bind(hole.par)
        .bind(hole.fairway_hit)
        .bind(hole.green_in_regulation)
        .bind(hole.putts)
        .bind(hole.score)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

fn hole_number(index: usize) -> i32 {
    i32::try_from(index + 1).unwrap_or(i32::MAX)
}

#[async_trait::async_trait]
impl<'c> Repository for Rounds<'c> {
    type CreateRequest = RoundCreateDBRequest;
    type UpdateRequest = RoundUpdateDBRequest;
    type Response = RoundDBResponse;
    type Id = RoundId;
    type Filter = RoundFilter;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), holes = request.holes.len()), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let totals = RoundTotals::from_holes(&request.holes);
        let round_id = Uuid::new_v4();

        let mut tx = self.db.begin().await?;

        let round = sqlx::query_as::<_, RoundDBResponse>(&format!(
            r#"
            INSERT INTO golf_rounds (id, user_id, date_played, course_name, par, total_score)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ROUND_COLUMNS}
            "#
        ))
        .bind(round_id)
        .bind(request.user_id)
        .bind(request.date_played)
        .bind(&request.course_name)
        .bind(totals.par)
        .bind(totals.total_score)
        .fetch_one(&mut *tx)
        .await?;

        insert_holes(&mut tx, round_id, &request.holes).await?;

        tx.commit().await?;
        Ok(round)
    }

    #[instrument(skip(self), fields(round_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let round = sqlx::query_as::<_, RoundDBResponse>(&format!("SELECT {ROUND_COLUMNS} FROM golf_rounds WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(round)
    }

    #[instrument(skip(self, filter), fields(user_id = %abbrev_uuid(&filter.user_id)), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        // LIMIT NULL means no limit in postgres
        let rounds = sqlx::query_as::<_, RoundDBResponse>(&format!(
            r#"
            SELECT {ROUND_COLUMNS}
            FROM golf_rounds
            WHERE user_id = $1
            ORDER BY date_played DESC, created_at DESC
            LIMIT $2
            "#
        ))
        .bind(filter.user_id)
        .bind(filter.limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(rounds)
    }

    #[instrument(skip(self), fields(round_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let mut tx = self.db.begin().await?;

        // The FK cascades too; deleting explicitly keeps this correct on older schemas
        sqlx::query("DELETE FROM holes WHERE golf_round_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM golf_rounds WHERE id = $1").bind(id).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(round_id = %abbrev_uuid(&id), holes = request.holes.len()), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let totals = RoundTotals::from_holes(&request.holes);

        let mut tx = self.db.begin().await?;

        for (index, hole) in request.holes.iter().enumerate() {
            let result = sqlx::query(
                r#"
                UPDATE holes
                SET par = $3, fairway_hit = $4, green_in_regulation = $5, putts = $6, score = $7
                WHERE golf_round_id = $1 AND hole_number = $2
                "#,
            )
            .bind(id)
            .bind(hole_number(index))
            .bind(hole.par)
            .bind(hole.fairway_hit)
            .bind(hole.green_in_regulation)
            .bind(hole.putts)
            .bind(hole.score)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::NotFound);
            }
        }

        let round = sqlx::query_as::<_, RoundDBResponse>(&format!(
            r#"
            UPDATE golf_rounds
            SET date_played = $2, course_name = $3, par = $4, total_score = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {ROUND_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.date_played)
        .bind(&request.course_name)
        .bind(totals.par)
        .bind(totals.total_score)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(round)
    }
}
