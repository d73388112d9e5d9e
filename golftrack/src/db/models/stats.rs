//! Raw aggregate rows feeding the statistics in [`crate::stats`].

use chrono::NaiveDate;
use sqlx::FromRow;

use crate::types::RoundId;

/// Counts over every hole a user has played
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct HoleTotals {
    pub holes_played: i64,
    pub fairways_hit: i64,
    pub greens_in_regulation: i64,
}

/// Unrounded averages; `None` when there were no rows to average
#[derive(Debug, Clone, Copy, Default, PartialEq, FromRow)]
pub struct AverageScoreRow {
    pub avg_total_score: Option<f64>,
    pub avg_half_total_score: Option<f64>,
    pub avg_par3_score: Option<f64>,
    pub avg_par4_score: Option<f64>,
    pub avg_par5_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RoundPutts {
    pub round_id: RoundId,
    pub date_played: NaiveDate,
    pub putts: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RoundScore {
    pub date_played: NaiveDate,
    pub total_score: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct HoleResult {
    pub par: i32,
    pub score: i32,
}
