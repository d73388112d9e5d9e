//! Round form handling and round view models.
//!
//! The round form posts flat `application/x-www-form-urlencoded` fields:
//!
//! ```text
//! date_played=2024-05-01&course_name=Pebble+Beach&hole_count=9
//! &hole_scores-0-par=4&hole_scores-0-putts=2&hole_scores-0-score=5&hole_scores-0-fairway_hit=y
//! ...
//! ```
//!
//! Checkboxes (`fairway_hit`, `green_in_regulation`) are only sent when ticked.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::models::rounds::{HoleScoreDBRequest, HoleScoreDBResponse, RoundDBResponse};
use crate::errors::Error;
use crate::types::RoundId;

pub const HOLE_FIELD_PREFIX: &str = "hole_scores-";
pub const MAX_COURSE_NAME_LENGTH: usize = 100;
/// Upper bounds on a single hole, matching the `holes` CHECK constraints
pub const MAX_HOLE_SCORE: i32 = 20;
pub const MAX_PUTTS: i32 = 10;

/// Number of holes a round may have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HoleCount {
    Nine,
    Eighteen,
}

impl HoleCount {
    pub fn holes(self) -> usize {
        match self {
            HoleCount::Nine => 9,
            HoleCount::Eighteen => 18,
        }
    }

    pub fn from_len(len: usize) -> Option<Self> {
        match len {
            9 => Some(HoleCount::Nine),
            18 => Some(HoleCount::Eighteen),
            _ => None,
        }
    }

    fn parse(raw: &str) -> Result<Self, Error> {
        raw.trim()
            .parse::<usize>()
            .ok()
            .and_then(Self::from_len)
            .ok_or_else(|| bad_request("A round must have 9 or 18 holes"))
    }
}

/// A validated round submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSubmission {
    pub date_played: NaiveDate,
    pub course_name: String,
    pub holes: Vec<HoleScoreDBRequest>,
}

/// Raw round form fields, kept as submitted so an invalid form can be shown again
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoundForm {
    fields: BTreeMap<String, String>,
}

fn bad_request(message: impl Into<String>) -> Error {
    Error::BadRequest { message: message.into() }
}

fn hole_field(index: usize, name: &str) -> String {
    format!("{HOLE_FIELD_PREFIX}{index}-{name}")
}

impl RoundForm {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self {
            fields: pairs.into_iter().collect(),
        }
    }

    /// Pre-fill the form from a stored round
    pub fn from_details(details: &RoundDetails) -> Self {
        let RoundDetails { round, holes } = details;
        let mut fields = BTreeMap::new();
        fields.insert("date_played".to_string(), round.date_played.format("%Y-%m-%d").to_string());
        fields.insert("course_name".to_string(), round.course_name.clone());
        fields.insert("hole_count".to_string(), holes.len().to_string());

        for (index, hole) in holes.iter().enumerate() {
            fields.insert(hole_field(index, "par"), hole.par.to_string());
            fields.insert(hole_field(index, "putts"), hole.putts.to_string());
            fields.insert(hole_field(index, "score"), hole.score.to_string());
            if hole.fairway_hit {
                fields.insert(hole_field(index, "fairway_hit"), "y".to_string());
            }
            if hole.green_in_regulation {
                fields.insert(hole_field(index, "green_in_regulation"), "y".to_string());
            }
        }

        Self { fields }
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str).filter(|v| !v.trim().is_empty())
    }

    /// Distinct hole indices present in the submission
    fn hole_indices(&self) -> BTreeSet<usize> {
        self.fields
            .keys()
            .filter_map(|key| key.strip_prefix(HOLE_FIELD_PREFIX))
            .filter_map(|rest| rest.split_once('-'))
            .filter_map(|(index, _)| index.parse().ok())
            .collect()
    }

    fn hole_number_field(&self, index: usize, name: &str, label: &str) -> Result<i32, Error> {
        let raw = self
            .get(&hole_field(index, name))
            .ok_or_else(|| bad_request(format!("Hole {}: {label} is required", index + 1)))?;
        raw.trim()
            .parse()
            .map_err(|_| bad_request(format!("Hole {}: {label} must be a whole number", index + 1)))
    }

    fn parse_hole(&self, index: usize) -> Result<HoleScoreDBRequest, Error> {
        let number = index + 1;
        let par = self.hole_number_field(index, "par", "par")?;
        if !(3..=5).contains(&par) {
            return Err(bad_request(format!("Hole {number}: par must be 3, 4 or 5")));
        }
        let putts = self.hole_number_field(index, "putts", "putts")?;
        if putts < 0 {
            return Err(bad_request(format!("Hole {number}: putts cannot be negative")));
        }
        if putts > MAX_PUTTS {
            return Err(bad_request(format!("Hole {number}: putts must be at most {MAX_PUTTS}")));
        }
        let score = self.hole_number_field(index, "score", "score")?;
        if score < 1 {
            return Err(bad_request(format!("Hole {number}: score must be at least 1")));
        }
        if score > MAX_HOLE_SCORE {
            return Err(bad_request(format!("Hole {number}: score must be at most {MAX_HOLE_SCORE}")));
        }

        Ok(HoleScoreDBRequest {
            par,
            fairway_hit: self.fields.contains_key(&hole_field(index, "fairway_hit")),
            green_in_regulation: self.fields.contains_key(&hole_field(index, "green_in_regulation")),
            putts,
            score,
        })
    }

    /// How many holes this form is asking for, from `hole_count` or else from the fields sent
    pub fn requested_hole_count(&self) -> Option<HoleCount> {
        match self.get("hole_count") {
            Some(raw) => HoleCount::parse(raw).ok(),
            None => HoleCount::from_len(self.hole_indices().len()),
        }
    }

    /// Validate the submission.
    ///
    /// `expected` pins the hole count (fixed-size forms and edits); otherwise the count comes
    /// from `hole_count` or the hole fields present.
    pub fn validate(&self, expected: Option<HoleCount>) -> Result<RoundSubmission, Error> {
        let date_played = self
            .get("date_played")
            .ok_or_else(|| bad_request("Date played is required"))
            .and_then(|raw| {
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| bad_request("Date played must be a date (YYYY-MM-DD)"))
            })?;

        let course_name = self
            .get("course_name")
            .map(str::trim)
            .ok_or_else(|| bad_request("Course name is required"))?
            .to_string();
        if course_name.chars().count() > MAX_COURSE_NAME_LENGTH {
            return Err(bad_request(format!(
                "Course name must be at most {MAX_COURSE_NAME_LENGTH} characters"
            )));
        }

        let indices = self.hole_indices();
        let submitted = HoleCount::from_len(indices.len()).ok_or_else(|| bad_request("A round must have 9 or 18 holes"))?;
        if indices.iter().copied().ne(0..submitted.holes()) {
            return Err(bad_request("Hole scores must be numbered consecutively"));
        }
        if let Some(raw) = self.get("hole_count")
            && HoleCount::parse(raw)? != submitted
        {
            return Err(bad_request(format!("Expected {raw} holes but {} were submitted", submitted.holes())));
        }
        if let Some(expected) = expected
            && expected != submitted
        {
            return Err(bad_request(format!(
                "This round has {} holes but {} were submitted",
                expected.holes(),
                submitted.holes()
            )));
        }

        let holes = (0..submitted.holes()).map(|index| self.parse_hole(index)).collect::<Result<Vec<_>, _>>()?;

        Ok(RoundSubmission {
            date_played,
            course_name,
            holes,
        })
    }
}

/// A row on the history page or the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct RoundSummary {
    pub id: RoundId,
    pub date_played: NaiveDate,
    pub course_name: String,
    pub par: i32,
    pub total_score: i32,
    pub difference: i32,
    /// "E", "+3", "-1"
    pub to_par: String,
}

pub fn format_to_par(difference: i32) -> String {
    match difference {
        0 => "E".to_string(),
        d if d > 0 => format!("+{d}"),
        d => d.to_string(),
    }
}

impl From<RoundDBResponse> for RoundSummary {
    fn from(round: RoundDBResponse) -> Self {
        let difference = round.difference();
        Self {
            id: round.id,
            date_played: round.date_played,
            course_name: round.course_name,
            par: round.par,
            total_score: round.total_score,
            difference,
            to_par: format_to_par(difference),
        }
    }
}

/// A round with its holes, for the details page
#[derive(Debug, Clone, Serialize)]
pub struct RoundDetails {
    pub round: RoundSummary,
    pub holes: Vec<HoleScoreDBResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn pairs(count: usize) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("date_played".to_string(), "2024-05-01".to_string()),
            ("course_name".to_string(), "  Pebble Beach ".to_string()),
        ];
        for index in 0..count {
            pairs.push((hole_field(index, "par"), "4".to_string()));
            pairs.push((hole_field(index, "putts"), "2".to_string()));
            pairs.push((hole_field(index, "score"), "5".to_string()));
            if index % 2 == 0 {
                pairs.push((hole_field(index, "fairway_hit"), "y".to_string()));
            }
        }
        pairs
    }

    fn with(mut pairs: Vec<(String, String)>, key: &str, value: &str) -> RoundForm {
        pairs.retain(|(k, _)| k != key);
        pairs.push((key.to_string(), value.to_string()));
        RoundForm::from_pairs(pairs)
    }

    fn message(err: Error) -> String {
        match err {
            Error::BadRequest { message } => message,
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_nine_hole_form() {
        let submission = RoundForm::from_pairs(pairs(9)).validate(None).unwrap();

        assert_eq!(submission.date_played, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(submission.course_name, "Pebble Beach");
        assert_eq!(submission.holes.len(), 9);
        assert!(submission.holes[0].fairway_hit);
        assert!(!submission.holes[1].fairway_hit);
        assert!(submission.holes.iter().all(|h| !h.green_in_regulation));
        assert!(submission.holes.iter().all(|h| h.par == 4 && h.putts == 2 && h.score == 5));
    }

    #[test]
    fn test_hole_count_must_be_nine_or_eighteen() {
        let err = RoundForm::from_pairs(pairs(10)).validate(None).unwrap_err();
        assert_eq!(message(err), "A round must have 9 or 18 holes");

        assert!(RoundForm::from_pairs(pairs(18)).validate(None).is_ok());
    }

    #[test]
    fn test_hole_count_field_must_match_holes() {
        let form = with(pairs(9), "hole_count", "18");
        assert!(form.validate(None).is_err());

        let form = with(pairs(9), "hole_count", "9");
        assert!(form.validate(None).is_ok());

        let form = with(pairs(9), "hole_count", "12");
        assert_eq!(message(form.validate(None).unwrap_err()), "A round must have 9 or 18 holes");
    }

    #[test]
    fn test_expected_hole_count_enforced() {
        let form = RoundForm::from_pairs(pairs(9));
        assert!(form.validate(Some(HoleCount::Nine)).is_ok());
        assert!(form.validate(Some(HoleCount::Eighteen)).is_err());
    }

    #[test]
    fn test_hole_value_ranges() {
        let form = with(pairs(9), &hole_field(2, "par"), "6");
        assert_eq!(message(form.validate(None).unwrap_err()), "Hole 3: par must be 3, 4 or 5");

        let form = with(pairs(9), &hole_field(0, "putts"), "-1");
        assert_eq!(message(form.validate(None).unwrap_err()), "Hole 1: putts cannot be negative");

        let form = with(pairs(9), &hole_field(8, "score"), "0");
        assert_eq!(message(form.validate(None).unwrap_err()), "Hole 9: score must be at least 1");

        let form = with(pairs(9), &hole_field(4, "score"), "five");
        assert_eq!(message(form.validate(None).unwrap_err()), "Hole 5: score must be a whole number");

        let form = with(pairs(9), &hole_field(0, "putts"), "0");
        assert_eq!(form.validate(None).unwrap().holes[0].putts, 0);
    }

    #[test]
    fn test_hole_value_upper_bounds() {
        let form = with(pairs(9), &hole_field(6, "score"), "2147483647");
        assert_eq!(message(form.validate(None).unwrap_err()), "Hole 7: score must be at most 20");

        let form = with(pairs(9), &hole_field(1, "putts"), "11");
        assert_eq!(message(form.validate(None).unwrap_err()), "Hole 2: putts must be at most 10");

        let mut at_limit = pairs(9);
        at_limit.retain(|(k, _)| k != &hole_field(0, "score") && k != &hole_field(0, "putts"));
        at_limit.push((hole_field(0, "score"), "20".to_string()));
        at_limit.push((hole_field(0, "putts"), "10".to_string()));
        let submission = RoundForm::from_pairs(at_limit).validate(None).unwrap();
        let hole = &submission.holes[0];
        assert_eq!((hole.score, hole.putts), (20, 10));
    }

    #[test]
    fn test_missing_fields() {
        let form = with(pairs(9), "course_name", "   ");
        assert_eq!(message(form.validate(None).unwrap_err()), "Course name is required");

        let form = with(pairs(9), "date_played", "May 1st");
        assert!(message(form.validate(None).unwrap_err()).starts_with("Date played"));

        let mut holes = pairs(9);
        holes.retain(|(k, _)| k != &hole_field(3, "score"));
        assert_eq!(
            message(RoundForm::from_pairs(holes).validate(None).unwrap_err()),
            "Hole 4: score is required"
        );
    }

    #[test]
    fn test_gapped_hole_indices_rejected() {
        let mut holes = pairs(9);
        for (key, _) in holes.iter_mut() {
            if key.starts_with(&hole_field(8, "")) {
                *key = key.replace("hole_scores-8-", "hole_scores-9-");
            }
        }
        let err = RoundForm::from_pairs(holes).validate(None).unwrap_err();
        assert_eq!(message(err), "Hole scores must be numbered consecutively");
    }

    #[test]
    fn test_course_name_length_limit() {
        let long = "x".repeat(MAX_COURSE_NAME_LENGTH + 1);
        let form = with(pairs(9), "course_name", &long);
        assert!(form.validate(None).is_err());
    }

    #[test]
    fn test_from_details_prefills_a_valid_form() {
        let round_id = Uuid::new_v4();
        let round = RoundDBResponse {
            id: round_id,
            user_id: Uuid::new_v4(),
            date_played: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
            course_name: "Royal Troon".to_string(),
            par: 36,
            total_score: 40,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let holes: Vec<HoleScoreDBResponse> = (1..=9)
            .map(|number| HoleScoreDBResponse {
                id: Uuid::new_v4(),
                golf_round_id: round_id,
                hole_number: number,
                par: 4,
                fairway_hit: number == 1,
                green_in_regulation: number == 2,
                putts: 2,
                score: if number <= 4 { 5 } else { 4 },
            })
            .collect();

        let form = RoundForm::from_details(&RoundDetails {
            round: round.into(),
            holes,
        });
        assert_eq!(form.requested_hole_count(), Some(HoleCount::Nine));

        let submission = form.validate(Some(HoleCount::Nine)).unwrap();
        assert_eq!(submission.course_name, "Royal Troon");
        assert!(submission.holes[0].fairway_hit);
        assert!(submission.holes[1].green_in_regulation);
        assert_eq!(submission.holes.iter().map(|h| h.score).sum::<i32>(), 40);
    }

    #[test]
    fn test_format_to_par() {
        assert_eq!(format_to_par(0), "E");
        assert_eq!(format_to_par(7), "+7");
        assert_eq!(format_to_par(-2), "-2");
    }
}
