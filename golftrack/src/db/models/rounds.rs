//! Database models for golf rounds and their per-hole scores.

use crate::types::{HoleId, RoundId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// One hole as submitted; `hole_number` is its 1-based position in the round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoleScoreDBRequest {
    pub par: i32,
    pub fairway_hit: bool,
    pub green_in_regulation: bool,
    pub putts: i32,
    pub score: i32,
}

/// Database request for creating a round with all of its holes
#[derive(Debug, Clone)]
pub struct RoundCreateDBRequest {
    pub user_id: UserId,
    pub date_played: NaiveDate,
    pub course_name: String,
    pub holes: Vec<HoleScoreDBRequest>,
}

/// Database request for replacing a round's details and every hole positionally
#[derive(Debug, Clone)]
pub struct RoundUpdateDBRequest {
    pub date_played: NaiveDate,
    pub course_name: String,
    pub holes: Vec<HoleScoreDBRequest>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RoundDBResponse {
    pub id: RoundId,
    pub user_id: UserId,
    pub date_played: NaiveDate,
    pub course_name: String,
    pub par: i32,
    pub total_score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoundDBResponse {
    /// Strokes relative to par; negative is under par
    pub fn difference(&self) -> i32 {
        self.total_score - self.par
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct HoleScoreDBResponse {
    pub id: HoleId,
    pub golf_round_id: RoundId,
    pub hole_number: i32,
    pub par: i32,
    pub fairway_hit: bool,
    pub green_in_regulation: bool,
    pub putts: i32,
    pub score: i32,
}

/// Round-level totals derived from the holes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundTotals {
    pub par: i32,
    pub total_score: i32,
}

impl RoundTotals {
    pub fn from_holes(holes: &[HoleScoreDBRequest]) -> Self {
        holes.iter().fold(Self { par: 0, total_score: 0 }, |acc, hole| Self {
            par: acc.par + hole.par,
            total_score: acc.total_score + hole.score,
        })
    }
}
