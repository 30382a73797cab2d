use serde::{Deserialize, Serialize};
use std::fmt;

/// Recall quality on the SM-2 ordinal scale (0-5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quality(u8);

impl Quality {
    /// Forgot completely
    pub const BLACKOUT: Quality = Quality(0);
    /// Wrong answer, but recognised once shown
    pub const DIFFICULT: Quality = Quality(1);
    /// Recalled with serious difficulty
    pub const HARD: Quality = Quality(2);
    /// Recalled with moderate effort
    pub const MEDIUM: Quality = Quality(3);
    /// Recalled with little effort
    pub const EASY: Quality = Quality(4);
    /// Instant, effortless recall
    pub const PERFECT: Quality = Quality(5);

    /// Lowest score that counts as a successful review
    pub const PASS_THRESHOLD: u8 = 3;

    /// Build a quality score, clamping anything outside 0-5
    pub fn clamped(raw: i64) -> Self {
        Quality(raw.clamp(0, 5) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Whether this score keeps the success streak alive
    pub fn is_pass(self) -> bool {
        self.0 >= Self::PASS_THRESHOLD
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse self-reported rating given by the learner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Hard,
    Medium,
    Easy,
}

impl Rating {
    /// Parse a rating label, case-insensitive.
    /// Unknown labels are treated as `Medium` rather than rejected.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "hard" | "difícil" | "dificil" => Rating::Hard,
            "easy" | "fácil" | "facil" => Rating::Easy,
            _ => Rating::Medium,
        }
    }

    /// Map to the SM-2 quality score
    pub fn quality(self) -> Quality {
        match self {
            Rating::Hard => Quality::HARD,
            Rating::Medium => Quality::MEDIUM,
            Rating::Easy => Quality::EASY,
        }
    }
}

/// Convert a rating label straight to a quality score
pub fn convert(label: &str) -> Quality {
    Rating::from_label(label).quality()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_known_labels() {
        assert_eq!(convert("hard"), Quality::HARD);
        assert_eq!(convert("medium"), Quality::MEDIUM);
        assert_eq!(convert("easy"), Quality::EASY);
    }

    #[test]
    fn test_convert_is_case_insensitive() {
        assert_eq!(convert("HARD"), Quality::HARD);
        assert_eq!(convert("Easy"), Quality::EASY);
        assert_eq!(convert("  medium "), Quality::MEDIUM);
    }

    #[test]
    fn test_convert_portuguese_aliases() {
        assert_eq!(convert("difícil"), Quality::HARD);
        assert_eq!(convert("Médio"), Quality::MEDIUM);
        assert_eq!(convert("FÁCIL"), Quality::EASY);
    }

    #[test]
    fn test_unknown_label_falls_back_to_medium() {
        assert_eq!(convert("whatever"), Quality::MEDIUM);
        assert_eq!(convert(""), Quality::MEDIUM);
    }

    #[test]
    fn test_quality_clamped() {
        assert_eq!(Quality::clamped(-3), Quality::BLACKOUT);
        assert_eq!(Quality::clamped(9), Quality::PERFECT);
        assert_eq!(Quality::clamped(4).value(), 4);
    }

    #[test]
    fn test_pass_threshold() {
        assert!(!Quality::HARD.is_pass());
        assert!(Quality::MEDIUM.is_pass());
        assert!(Quality::PERFECT.is_pass());
    }
}
