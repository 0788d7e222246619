//! Emotion labels and free-text resolution
//!
//! The emotion flow answers with prose, not a label. Resolution is a
//! heuristic: the text is lowercased and searched for each label in
//! [`Emotion::MATCH_ORDER`]; the first label found wins. Text mentioning two
//! labels ("happy, not sad") resolves to the earlier one in that order, and
//! substrings count ("unhappy" matches `happy`). Nothing here is a backend
//! contract.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed label set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    #[default]
    Neutral,
    Happy,
    Sad,
    Stressed,
    Angry,
    Drowsy,
}

impl Emotion {
    /// Substring match priority
    pub const MATCH_ORDER: [Emotion; 6] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Neutral,
        Emotion::Stressed,
        Emotion::Angry,
        Emotion::Drowsy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Stressed => "stressed",
            Emotion::Angry => "angry",
            Emotion::Drowsy => "drowsy",
        }
    }

    /// Capitalized form used in session records
    pub fn display_name(&self) -> &'static str {
        match self {
            Emotion::Neutral => "Neutral",
            Emotion::Happy => "Happy",
            Emotion::Sad => "Sad",
            Emotion::Stressed => "Stressed",
            Emotion::Angry => "Angry",
            Emotion::Drowsy => "Drowsy",
        }
    }

    /// Negative affect that warrants a cheer-up
    pub fn needs_mitigation(&self) -> bool {
        matches!(self, Emotion::Sad)
    }

    /// First label found in `text`, if any
    pub fn find_in(text: &str) -> Option<Emotion> {
        let lower = text.to_lowercase();
        Self::MATCH_ORDER
            .into_iter()
            .find(|e| lower.contains(e.as_str()))
    }

    /// Resolve free text, defaulting to `Neutral`
    pub fn resolve(text: &str) -> Emotion {
        Self::find_in(text).unwrap_or_default()
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::MATCH_ORDER
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown emotion label: {}", s))
    }
}
