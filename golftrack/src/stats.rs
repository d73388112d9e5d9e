//! Performance statistics for one player.
//!
//! The database hands back raw counts and sums (see [`crate::db::handlers::RoundStats`]); this
//! module turns them into the figures shown on the dashboard. Everything except
//! [`StatsSummary::for_user`] is pure.

use std::fmt;

use serde::Serialize;
use sqlx::PgConnection;

use crate::db::{
    errors::Result,
    handlers::RoundStats,
    models::stats::{AverageScoreRow, HoleResult, HoleTotals},
};
use crate::types::UserId;

/// Rounds considered by the putts and score trend charts
pub const RECENT_ROUNDS: i64 = 10;

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `100 * part / whole`, rounded to two decimals; 0 when `whole` is 0
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    round2(100.0 * part as f64 / whole as f64)
}

pub fn fairway_percentage(totals: &HoleTotals) -> f64 {
    percentage(totals.fairways_hit, totals.holes_played)
}

pub fn greens_in_regulation_percentage(totals: &HoleTotals) -> f64 {
    percentage(totals.greens_in_regulation, totals.holes_played)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AverageScores {
    /// Mean round total
    pub round: f64,
    /// Mean round total halved, comparable to a nine-hole score
    pub per_nine: f64,
    pub par3: f64,
    pub par4: f64,
    pub par5: f64,
}

impl From<AverageScoreRow> for AverageScores {
    fn from(row: AverageScoreRow) -> Self {
        let tidy = |value: Option<f64>| value.map(round2).unwrap_or(0.0);
        Self {
            round: tidy(row.avg_total_score),
            per_nine: tidy(row.avg_half_total_score),
            par3: tidy(row.avg_par3_score),
            par4: tidy(row.avg_par4_score),
            par5: tidy(row.avg_par5_score),
        }
    }
}

/// Named result of a single hole, by strokes relative to par
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreCategory {
    Eagle,
    Birdie,
    Par,
    Bogey,
    DoubleBogey,
    Triple,
    DoublePar,
}

impl ScoreCategory {
    pub fn from_strokes(par: i32, score: i32) -> Self {
        match score - par {
            i32::MIN..=-2 => ScoreCategory::Eagle,
            -1 => ScoreCategory::Birdie,
            0 => ScoreCategory::Par,
            1 => ScoreCategory::Bogey,
            2 => ScoreCategory::DoubleBogey,
            3 => ScoreCategory::Triple,
            _ => ScoreCategory::DoublePar,
        }
    }
}

/// Histogram of hole results; every hole lands in exactly one bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreCategories {
    pub eagles: u32,
    pub birdies: u32,
    pub pars: u32,
    pub bogies: u32,
    pub double_bogies: u32,
    pub triples: u32,
    pub double_pars: u32,
}

impl ScoreCategories {
    pub fn record(&mut self, category: ScoreCategory) {
        let bucket = match category {
            ScoreCategory::Eagle => &mut self.eagles,
            ScoreCategory::Birdie => &mut self.birdies,
            ScoreCategory::Par => &mut self.pars,
            ScoreCategory::Bogey => &mut self.bogies,
            ScoreCategory::DoubleBogey => &mut self.double_bogies,
            ScoreCategory::Triple => &mut self.triples,
            ScoreCategory::DoublePar => &mut self.double_pars,
        };
        *bucket += 1;
    }

    pub fn total(&self) -> u32 {
        self.eagles + self.birdies + self.pars + self.bogies + self.double_bogies + self.triples + self.double_pars
    }
}

impl<'a> FromIterator<&'a HoleResult> for ScoreCategories {
    fn from_iter<I: IntoIterator<Item = &'a HoleResult>>(iter: I) -> Self {
        let mut categories = Self::default();
        for hole in iter {
            categories.record(ScoreCategory::from_strokes(hole.par, hole.score));
        }
        categories
    }
}

/// An opaque CSS colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.red, self.green, self.blue)
    }
}

impl Serialize for Rgb {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Red at 0%, fading through yellow to green at 100%
pub fn progress_color(percentage: f64) -> Rgb {
    let channel = |value: f64| value.clamp(0.0, 255.0) as u8;
    let green = percentage * 255.0 / 100.0;
    Rgb {
        red: channel(255.0 - green),
        green: channel(green),
        blue: 0,
    }
}

/// A percentage with the colour of its progress bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressStat {
    pub percentage: f64,
    pub color: Rgb,
}

impl ProgressStat {
    pub fn new(percentage: f64) -> Self {
        Self {
            percentage,
            color: progress_color(percentage),
        }
    }
}

/// Everything the dashboard shows about a player's game
#[derive(Debug, Clone, Serialize)]
pub struct StatsSummary {
    pub holes_played: i64,
    pub fairways: ProgressStat,
    pub greens_in_regulation: ProgressStat,
    /// Putts per round over the most recent rounds, oldest first
    pub putts_per_round: Vec<i64>,
    /// Round totals over the most recent rounds, oldest first
    pub recent_scores: Vec<i32>,
    pub averages: AverageScores,
    pub categories: ScoreCategories,
}

impl StatsSummary {
    pub async fn for_user(conn: &mut PgConnection, user_id: UserId) -> Result<Self> {
        let mut repo = RoundStats::new(conn);

        let totals = repo.hole_totals(user_id).await?;
        let putts = repo.putts_per_round(user_id, RECENT_ROUNDS).await?;
        let scores = repo.recent_scores(user_id, RECENT_ROUNDS).await?;
        let averages = repo.average_scores(user_id).await?;
        let holes = repo.hole_results(user_id).await?;

        Ok(Self {
            holes_played: totals.holes_played,
            fairways: ProgressStat::new(fairway_percentage(&totals)),
            greens_in_regulation: ProgressStat::new(greens_in_regulation_percentage(&totals)),
            putts_per_round: putts.into_iter().map(|round| round.putts).collect(),
            recent_scores: scores.into_iter().map(|round| round.total_score).collect(),
            averages: averages.into(),
            categories: holes.iter().collect(),
        })
    }
}
