//! Mood classification
//!
//! Maps a genre and a set of free-text tags to one [`Mood`]. The genre and
//! every tag are lower-cased and joined with spaces; a category matches when
//! any of its keywords occurs as a substring of that text. Categories are
//! checked in the order of [`MOOD_KEYWORDS`] and the first match wins, so
//! "Deathcore" with the tag "dance" classifies as energetic while
//! "Deathcore" alone classifies as aggressive. No match yields
//! [`Mood::Neutral`].

use crate::models::Mood;

/// Keyword table in priority order
pub const MOOD_KEYWORDS: &[(Mood, &[&str])] = &[
    (
        Mood::Energetic,
        &[
            "energetic",
            "upbeat",
            "fast",
            "dance",
            "electronic",
            "house",
            "techno",
            "trance",
            "edm",
        ],
    ),
    (
        Mood::Chill,
        &[
            "chill",
            "ambient",
            "relaxed",
            "downtempo",
            "lounge",
            "jazz",
            "smooth",
            "calm",
        ],
    ),
    (
        Mood::Emotional,
        &[
            "emotional",
            "melancholic",
            "sad",
            "romantic",
            "ballad",
            "deep",
            "atmospheric",
        ],
    ),
    (
        Mood::Aggressive,
        &[
            "aggressive",
            "heavy",
            "metal",
            "rock",
            "hardcore",
            "intense",
            "powerful",
            "deathcore",
            "grindcore",
            "thrash",
            "punk",
        ],
    ),
    (
        Mood::Groovy,
        &["groovy", "funk", "soul", "disco", "rhythm", "swing", "bass"],
    ),
];

/// Classify a track from its genre and collected tags.
///
/// Deterministic and side-effect free.
pub fn classify<I, S>(genre: Option<&str>, tags: I) -> Mood
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut text = genre.unwrap_or_default().to_lowercase();
    for tag in tags {
        text.push(' ');
        text.push_str(&tag.as_ref().to_lowercase());
    }

    MOOD_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(mood, _)| *mood)
        .unwrap_or(Mood::Neutral)
}
