//! Recording rounds on behalf of a logged-in golfer.
//!
//! Every operation here is scoped to the requesting user. Writes check ownership inside the same
//! transaction that performs them, with the round row locked, so a concurrent delete cannot slip
//! between the check and the write.

use sqlx::PgPool;
use tracing::{info, instrument};

use crate::api::models::rounds::{RoundDetails, RoundSubmission, RoundSummary};
use crate::api::models::users::CurrentUser;
use crate::db::errors::DbError;
use crate::db::handlers::{Repository, Rounds, rounds::RoundFilter};
use crate::db::models::rounds::{RoundCreateDBRequest, RoundUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::types::{Operation, RoundId, UserId, abbrev_uuid};

const RESOURCE: &str = "round";

fn not_found(round_id: RoundId) -> Error {
    Error::NotFound {
        resource: "Round".to_string(),
        id: round_id.to_string(),
    }
}

/// Lock the round and make sure `user` may perform `action` on it
async fn ensure_owner(rounds: &mut Rounds<'_>, user: &CurrentUser, round_id: RoundId, action: Operation) -> Result<()> {
    match rounds.lock_owner(round_id).await? {
        None => Err(not_found(round_id)),
        Some(owner) if owner == user.id => Ok(()),
        Some(_) => Err(Error::InsufficientPermissions {
            action,
            resource: RESOURCE.to_string(),
        }),
    }
}

#[instrument(skip(db, user, submission), fields(user_id = %abbrev_uuid(&user.id), holes = submission.holes.len()), err)]
pub async fn create_round(db: &PgPool, user: &CurrentUser, submission: RoundSubmission) -> Result<RoundSummary> {
    let mut conn = db.acquire().await.map_err(DbError::from)?;
    let round = Rounds::new(&mut conn)
        .create(&RoundCreateDBRequest {
            user_id: user.id,
            date_played: submission.date_played,
            course_name: submission.course_name,
            holes: submission.holes,
        })
        .await?;

    info!("Recorded round {} ({} strokes)", abbrev_uuid(&round.id), round.total_score);
    Ok(round.into())
}

/// Replace a round's details and hole scores.
///
/// The submission must have as many holes as the stored round.
#[instrument(skip(db, user, submission), fields(user_id = %abbrev_uuid(&user.id), round_id = %abbrev_uuid(&round_id)), err)]
pub async fn edit_round(db: &PgPool, user: &CurrentUser, round_id: RoundId, submission: RoundSubmission) -> Result<RoundSummary> {
    let mut tx = db.begin().await.map_err(DbError::from)?;
    let mut rounds = Rounds::new(&mut tx);

    ensure_owner(&mut rounds, user, round_id, Operation::Update).await?;

    let stored = rounds.hole_count(round_id).await?;
    if stored != submission.holes.len() {
        return Err(Error::BadRequest {
            message: format!("This round has {stored} holes; {} were submitted", submission.holes.len()),
        });
    }

    let round = rounds
        .update(
            round_id,
            &RoundUpdateDBRequest {
                date_played: submission.date_played,
                course_name: submission.course_name,
                holes: submission.holes,
            },
        )
        .await?;

    tx.commit().await.map_err(DbError::from)?;
    info!("Updated round {}", abbrev_uuid(&round_id));
    Ok(round.into())
}

/// Delete a round and all of its holes
#[instrument(skip(db, user), fields(user_id = %abbrev_uuid(&user.id), round_id = %abbrev_uuid(&round_id)), err)]
pub async fn delete_round(db: &PgPool, user: &CurrentUser, round_id: RoundId) -> Result<()> {
    let mut tx = db.begin().await.map_err(DbError::from)?;
    let mut rounds = Rounds::new(&mut tx);

    ensure_owner(&mut rounds, user, round_id, Operation::Delete).await?;

    if !rounds.delete(round_id).await? {
        return Err(not_found(round_id));
    }

    tx.commit().await.map_err(DbError::from)?;
    info!("Deleted round {}", abbrev_uuid(&round_id));
    Ok(())
}

/// A user's rounds, newest first, optionally capped at `limit`
#[instrument(skip(db), fields(user_id = %abbrev_uuid(&user_id)), err)]
pub async fn list_rounds(db: &PgPool, user_id: UserId, limit: Option<i64>) -> Result<Vec<RoundSummary>> {
    let mut conn = db.acquire().await.map_err(DbError::from)?;
    let filter = match limit {
        Some(limit) => RoundFilter::for_user(user_id).with_limit(limit),
        None => RoundFilter::for_user(user_id),
    };
    let rounds = Rounds::new(&mut conn).list(&filter).await?;
    Ok(rounds.into_iter().map(RoundSummary::from).collect())
}

/// A round with its holes.
///
/// Other users' rounds are reported as missing rather than forbidden.
#[instrument(skip(db, user), fields(user_id = %abbrev_uuid(&user.id), round_id = %abbrev_uuid(&round_id)), err)]
pub async fn get_round(db: &PgPool, user: &CurrentUser, round_id: RoundId) -> Result<RoundDetails> {
    let mut conn = db.acquire().await.map_err(DbError::from)?;
    let mut rounds = Rounds::new(&mut conn);

    let round = rounds
        .get_by_id(round_id)
        .await?
        .filter(|round| round.user_id == user.id)
        .ok_or_else(|| not_found(round_id))?;
    let holes = rounds.holes(round_id).await?;

    Ok(RoundDetails {
        round: round.into(),
        holes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_user, sample_holes};
    use chrono::NaiveDate;

    fn submission(holes: usize) -> RoundSubmission {
        RoundSubmission {
            date_played: NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(),
            course_name: "Pinehurst No. 2".to_string(),
            holes: sample_holes(holes),
        }
    }

    async fn hole_rows(pool: &PgPool, round_id: RoundId) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM holes WHERE golf_round_id = $1")
            .bind(round_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    async fn test_create_round_computes_totals(pool: PgPool) {
        let user: CurrentUser = create_test_user(&pool, "bryson").await.into();
        let submission = submission(18);
        let par: i32 = submission.holes.iter().map(|h| h.par).sum();
        let strokes: i32 = submission.holes.iter().map(|h| h.score).sum();

        let round = create_round(&pool, &user, submission).await.unwrap();

        assert_eq!(round.par, par);
        assert_eq!(round.total_score, strokes);
        assert_eq!(round.difference, strokes - par);
        assert_eq!(hole_rows(&pool, round.id).await, 18);
    }

    #[sqlx::test]
    async fn test_get_round_hides_other_users_rounds(pool: PgPool) {
        let owner: CurrentUser = create_test_user(&pool, "owner").await.into();
        let other: CurrentUser = create_test_user(&pool, "other").await.into();
        let round = create_round(&pool, &owner, submission(9)).await.unwrap();

        let details = get_round(&pool, &owner, round.id).await.unwrap();
        assert_eq!(details.holes.len(), 9);
        assert_eq!(details.holes[0].hole_number, 1);

        let err = get_round(&pool, &other, round.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[sqlx::test]
    async fn test_editing_someone_elses_round_is_rejected(pool: PgPool) {
        let owner: CurrentUser = create_test_user(&pool, "owner").await.into();
        let other: CurrentUser = create_test_user(&pool, "other").await.into();
        let round = create_round(&pool, &owner, submission(9)).await.unwrap();

        let mut changed = submission(9);
        changed.course_name = "Hijacked".to_string();
        let err = edit_round(&pool, &other, round.id, changed).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientPermissions {
                action: Operation::Update,
                ..
            }
        ));

        let unchanged = get_round(&pool, &owner, round.id).await.unwrap();
        assert_eq!(unchanged.round.course_name, "Pinehurst No. 2");
    }

    #[sqlx::test]
    async fn test_edit_round_replaces_holes_and_totals(pool: PgPool) {
        let user: CurrentUser = create_test_user(&pool, "user").await.into();
        let round = create_round(&pool, &user, submission(9)).await.unwrap();

        let mut changed = submission(9);
        changed.course_name = "Oakmont".to_string();
        for hole in &mut changed.holes {
            hole.score = hole.par;
        }
        let updated = edit_round(&pool, &user, round.id, changed).await.unwrap();

        assert_eq!(updated.course_name, "Oakmont");
        assert_eq!(updated.total_score, updated.par);
        assert_eq!(updated.to_par, "E");
        assert_eq!(hole_rows(&pool, round.id).await, 9);
    }

    #[sqlx::test]
    async fn test_edit_round_requires_same_hole_count(pool: PgPool) {
        let user: CurrentUser = create_test_user(&pool, "user").await.into();
        let round = create_round(&pool, &user, submission(9)).await.unwrap();

        let err = edit_round(&pool, &user, round.id, submission(18)).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));
        assert_eq!(hole_rows(&pool, round.id).await, 9);
    }

    #[sqlx::test]
    async fn test_delete_round_leaves_no_holes(pool: PgPool) {
        let user: CurrentUser = create_test_user(&pool, "user").await.into();
        let round = create_round(&pool, &user, submission(18)).await.unwrap();

        delete_round(&pool, &user, round.id).await.unwrap();

        assert_eq!(hole_rows(&pool, round.id).await, 0);
        assert!(list_rounds(&pool, user.id, None).await.unwrap().is_empty());
        assert!(matches!(
            delete_round(&pool, &user, round.id).await.unwrap_err(),
            Error::NotFound { .. }
        ));
    }

    #[sqlx::test]
    async fn test_deleting_someone_elses_round_is_rejected(pool: PgPool) {
        let owner: CurrentUser = create_test_user(&pool, "owner").await.into();
        let other: CurrentUser = create_test_user(&pool, "other").await.into();
        let round = create_round(&pool, &owner, submission(9)).await.unwrap();

        let err = delete_round(&pool, &other, round.id).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientPermissions {
                action: Operation::Delete,
                ..
            }
        ));
        assert_eq!(hole_rows(&pool, round.id).await, 9);
    }

    #[sqlx::test]
    async fn test_list_rounds_newest_first_and_scoped(pool: PgPool) {
        let user: CurrentUser = create_test_user(&pool, "user").await.into();
        let other: CurrentUser = create_test_user(&pool, "other").await.into();
        for day in [3, 1, 2] {
            let mut s = submission(9);
            s.date_played = NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
            create_round(&pool, &user, s).await.unwrap();
        }
        create_round(&pool, &other, submission(9)).await.unwrap();

        let rounds = list_rounds(&pool, user.id, None).await.unwrap();
        let days: Vec<_> = rounds.iter().map(|r| r.date_played.format("%d").to_string()).collect();
        assert_eq!(days, vec!["03", "02", "01"]);

        let latest = list_rounds(&pool, user.id, Some(2)).await.unwrap();
        assert_eq!(latest.len(), 2);
    }
}
