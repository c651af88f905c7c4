//! Analysis result data model.
//!
//! Represents a single crowd observation produced by the vision classifier.

use serde::{Deserialize, Serialize};

/// Where the largest group of people sits in the frame.
///
/// Labels are canonical lowercase on the wire and in persisted documents;
/// `display_label` is the capitalized form used at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Center,
    Right,
    Everywhere,
}

impl Direction {
    /// Every recognized label.
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Center,
        Direction::Right,
        Direction::Everywhere,
    ];

    /// The label reported when no single position dominates.
    pub const NEUTRAL: Direction = Direction::Everywhere;

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Center => "center",
            Direction::Right => "right",
            Direction::Everywhere => "everywhere",
        }
    }

    /// Parse a canonical lowercase label. Unknown labels yield `None`.
    pub fn parse(label: &str) -> Option<Direction> {
        match label {
            "left" => Some(Direction::Left),
            "center" => Some(Direction::Center),
            "right" => Some(Direction::Right),
            "everywhere" => Some(Direction::Everywhere),
            _ => None,
        }
    }

    /// Leading-character-capitalized form for responses.
    pub fn display_label(&self) -> &'static str {
        match self {
            Direction::Left => "Left",
            Direction::Center => "Center",
            Direction::Right => "Right",
            Direction::Everywhere => "Everywhere",
        }
    }
}

/// An immutable stored observation: at `timestamp`, the dominant crowd
/// direction was `direction` with `confidence`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub direction: Direction,
    pub confidence: f64,
    /// Milliseconds since the Unix epoch, assigned by the store at write time.
    pub timestamp: i64,
}

/// The classifier's verdict for one frame, also the ingestion response shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub person_count: u32,
    pub direction: Direction,
    pub confidence: f64,
}

impl AnalysisOutcome {
    /// The result returned when no people are visible. Absence of people is
    /// not a direction observation, so this never reaches the store.
    pub fn nobody() -> Self {
        Self {
            person_count: 0,
            direction: Direction::NEUTRAL,
            confidence: 0.0,
        }
    }
}
