//! Shared data structures for the application state
//!
//! These structs represent the data model that flows between
//! the culling core and the UI layer.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::raw::loader::LoadedImage;

/// A rating. Only seven values exist: -1 (unscored), 0 (rejected) and
/// 1..=5 (accepted, with a quality rank).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Score(i8);

impl Score {
    pub const UNSCORED: Score = Score(-1);
    pub const REJECTED: Score = Score(0);
    pub const MAX_STARS: i8 = 5;

    /// Returns `None` for anything outside `-1..=5`.
    pub fn new(value: i64) -> Option<Self> {
        if (-1..=Self::MAX_STARS as i64).contains(&value) {
            Some(Score(value as i8))
        } else {
            None
        }
    }

    /// Accepted with `stars` (clamped to 1..=5).
    pub fn stars(stars: u8) -> Self {
        Score(stars.clamp(1, Self::MAX_STARS as u8) as i8)
    }

    pub fn value(self) -> i8 {
        self.0
    }

    pub fn is_unscored(self) -> bool {
        self == Self::UNSCORED
    }

    pub fn is_rejected(self) -> bool {
        self == Self::REJECTED
    }

    /// Short label for badges ("Rejected", "Score 3", empty when unscored).
    pub fn label(self) -> String {
        match self.0 {
            -1 => String::new(),
            0 => "Rejected".to_string(),
            n => format!("Score {}", n),
        }
    }

    /// Every valid score, in ascending order.
    pub fn all() -> impl Iterator<Item = Score> {
        (-1..=Self::MAX_STARS).map(Score)
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::UNSCORED
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Score {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Score::new(value).ok_or_else(|| format!("score out of range: {}", value))
    }
}

impl From<Score> for i64 {
    fn from(score: Score) -> i64 {
        score.0 as i64
    }
}

/// File identity derived from filesystem metadata, not from the path.
///
/// Text form is `<serial>-<mtime_ms>-<size>`; it doubles as the thumbnail
/// cache file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    pub fn new(serial: u128, modified_ms: u128, size: u64) -> Self {
        Identity(format!("{}-{}-{}", serial, modified_ms, size))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a record's grid preview currently stands.
#[derive(Debug, Clone, Default)]
pub enum ThumbnailSlot {
    /// Nothing requested yet
    #[default]
    Missing,
    /// Cache probe or generation in flight (or queued)
    Requested,
    /// Compressed preview bytes (JPEG)
    Ready(Arc<Vec<u8>>),
    /// Generation failed; not retried automatically
    Failed(String),
}

impl ThumbnailSlot {
    pub fn data(&self) -> Option<&Arc<Vec<u8>>> {
        match self {
            ThumbnailSlot::Ready(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// One discovered image file
#[derive(Debug, Clone)]
pub struct ImageRecord {
    /// Stable metadata-derived key (thumbnail cache key)
    pub identity: Identity,
    /// Filename only (e.g., "DSC_0001.NEF")
    pub name: String,
    /// Full path to the file
    pub absolute_path: PathBuf,
    /// Path relative to the opened folder, '/'-separated
    pub relative_path: Option<String>,
    /// Lowercase extension with leading dot (".nef")
    pub extension: String,
    pub byte_size: u64,
    /// Display buffer, populated on first load
    pub full_image: Option<Arc<LoadedImage>>,
    pub thumbnail: ThumbnailSlot,
    pub score: Score,
}

impl ImageRecord {
    pub fn thumbnail_data(&self) -> Option<&Arc<Vec<u8>>> {
        self.thumbnail.data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_range() {
        assert_eq!(Score::new(-1), Some(Score::UNSCORED));
        assert_eq!(Score::new(0), Some(Score::REJECTED));
        assert_eq!(Score::new(5).map(Score::value), Some(5));
        assert_eq!(Score::new(6), None);
        assert_eq!(Score::new(-2), None);
        assert_eq!(Score::all().count(), 7);
    }

    #[test]
    fn test_score_stars_clamped() {
        assert_eq!(Score::stars(0).value(), 1);
        assert_eq!(Score::stars(9).value(), 5);
    }

    #[test]
    fn test_score_labels() {
        assert_eq!(Score::UNSCORED.label(), "");
        assert_eq!(Score::REJECTED.label(), "Rejected");
        assert_eq!(Score::stars(4).label(), "Score 4");
    }

    #[test]
    fn test_score_json_rejects_out_of_range() {
        let parsed: Result<Score, _> = serde_json::from_str("7");
        assert!(parsed.is_err());
        let parsed: Score = serde_json::from_str("3").unwrap();
        assert_eq!(parsed.value(), 3);
    }

    #[test]
    fn test_identity_format() {
        let id = Identity::new(42, 1_700_000_000_123, 2048);
        assert_eq!(id.as_str(), "42-1700000000123-2048");
    }
}
