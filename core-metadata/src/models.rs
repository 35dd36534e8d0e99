//! Track and provider data model
//!
//! A [`TrackRecord`] is built from a file's existing tags, merged in memory
//! with [`ProviderRecord`]s and finally reduced to a [`TagUpdate`] holding only
//! the fields that were empty before enrichment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::MetadataError;

// =============================================================================
// Mood
// =============================================================================

/// Closed set of mood labels written to the `TMOO` frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Energetic,
    Chill,
    Emotional,
    Aggressive,
    Groovy,
    Neutral,
}

impl Mood {
    pub const ALL: [Mood; 6] = [
        Mood::Energetic,
        Mood::Chill,
        Mood::Emotional,
        Mood::Aggressive,
        Mood::Groovy,
        Mood::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Energetic => "energetic",
            Mood::Chill => "chill",
            Mood::Emotional => "emotional",
            Mood::Aggressive => "aggressive",
            Mood::Groovy => "groovy",
            Mood::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| MetadataError::ProviderError {
                provider: "mood".to_string(),
                message: format!("Unknown mood label: {}", s),
            })
    }
}

// =============================================================================
// Track Record
// =============================================================================

/// Metadata of a single file, keyed by its path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRecord {
    pub path: PathBuf,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub genre: Option<String>,
    pub year: Option<u32>,
    /// Mood as stored in the file; may be a label outside [`Mood`]
    pub mood: Option<String>,
    /// Free-text provider tags collected during lookup, never persisted
    pub tags: BTreeSet<String>,
}

impl TrackRecord {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            artist: None,
            title: None,
            genre: None,
            year: None,
            mood: None,
            tags: BTreeSet::new(),
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = non_empty(artist.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = non_empty(title.into());
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = non_empty(genre.into());
        self
    }

    pub fn with_year(mut self, year: u32) -> Self {
        self.year = valid_year(year);
        self
    }

    pub fn with_mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = non_empty(mood.into());
        self
    }

    /// File name for log lines
    pub fn file_name(&self) -> String {
        display_name(&self.path)
    }

    /// Artist and title are both present
    pub fn has_identity(&self) -> bool {
        self.artist.is_some() && self.title.is_some()
    }

    /// Genre or year still needs a remote lookup
    pub fn needs_lookup(&self) -> bool {
        self.genre.is_none() || self.year.is_none()
    }

    /// Genre, year and mood are all present
    pub fn is_complete(&self) -> bool {
        !self.needs_lookup() && self.mood.is_some()
    }

    /// Fill empty fields from a provider record and collect its tags.
    ///
    /// Returns the names of the fields that were filled. Fields that already
    /// hold a value are left untouched.
    pub fn merge(&mut self, record: &ProviderRecord) -> Vec<&'static str> {
        let mut filled = Vec::new();

        if self.genre.is_none() {
            if let Some(genre) = record.genre.clone().and_then(non_empty) {
                self.genre = Some(genre);
                filled.push("genre");
            }
        }

        if self.year.is_none() {
            if let Some(year) = record.year.and_then(valid_year) {
                self.year = Some(year);
                filled.push("year");
            }
        }

        self.tags.extend(
            record
                .tags
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        );

        filled
    }
}

// =============================================================================
// Provider Response
// =============================================================================

/// Partial record returned by one provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderRecord {
    pub genre: Option<String>,
    pub year: Option<u32>,
    pub tags: Vec<String>,
}

impl ProviderRecord {
    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = non_empty(genre.into());
        self
    }

    pub fn with_year(mut self, year: u32) -> Self {
        self.year = valid_year(year);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Nothing usable in the record
    pub fn is_empty(&self) -> bool {
        self.genre.is_none() && self.year.is_none() && self.tags.is_empty()
    }
}

/// Terminal status of one provider lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStatus {
    Found,
    NotFound,
    /// Transient failures exhausted their retries, or the request was rejected
    Error,
    /// Credentials were refused; the provider should not be asked again
    AuthFailed,
}

impl LookupStatus {
    /// The provider gave a definitive answer
    pub fn is_answer(&self) -> bool {
        matches!(self, LookupStatus::Found | LookupStatus::NotFound)
    }
}

/// What a provider returns from `lookup`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    pub status: LookupStatus,
    pub record: ProviderRecord,
}

impl ProviderResponse {
    /// A found response; an empty record downgrades to not found
    pub fn found(record: ProviderRecord) -> Self {
        if record.is_empty() {
            return Self::not_found();
        }
        Self {
            status: LookupStatus::Found,
            record,
        }
    }

    pub fn not_found() -> Self {
        Self::with_status(LookupStatus::NotFound)
    }

    pub fn error() -> Self {
        Self::with_status(LookupStatus::Error)
    }

    pub fn auth_failed() -> Self {
        Self::with_status(LookupStatus::AuthFailed)
    }

    fn with_status(status: LookupStatus) -> Self {
        Self {
            status,
            record: ProviderRecord::default(),
        }
    }
}

// =============================================================================
// Tag Update
// =============================================================================

/// Fields to write back to a file; `None` leaves the frame untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagUpdate {
    pub genre: Option<String>,
    pub year: Option<u32>,
    pub mood: Option<Mood>,
}

impl TagUpdate {
    /// Fields present in `enriched` that were empty in `original`
    pub fn between(original: &TrackRecord, enriched: &TrackRecord) -> Self {
        Self {
            genre: if original.genre.is_none() {
                enriched.genre.clone()
            } else {
                None
            },
            year: if original.year.is_none() {
                enriched.year
            } else {
                None
            },
            mood: None,
        }
    }

    pub fn with_mood(mut self, mood: Mood) -> Self {
        self.mood = Some(mood);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.genre.is_none() && self.year.is_none() && self.mood.is_none()
    }

    /// Human-readable `field=value` pairs for the update log line
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(genre) = &self.genre {
            parts.push(format!("genre={}", genre));
        }
        if let Some(year) = self.year {
            parts.push(format!("year={}", year));
        }
        if let Some(mood) = self.mood {
            parts.push(format!("mood={}", mood));
        }
        parts.join(", ")
    }
}

// =============================================================================
// Helpers
// =============================================================================

pub(crate) fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

/// Years are kept only when they have four digits
pub(crate) fn valid_year(year: u32) -> Option<u32> {
    (1000..=9999).contains(&year).then_some(year)
}

/// Parse the leading four digits of a date such as `1999-05-01` or `2004`
pub(crate) fn year_from_date(date: &str) -> Option<u32> {
    let date = date.trim();
    let prefix = date.get(..4)?;
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    prefix.parse().ok().and_then(valid_year)
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
