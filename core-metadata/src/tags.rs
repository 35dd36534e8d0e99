//! Tag Accessor
//!
//! Reads and writes the enrichment fields of a single file using the `lofty`
//! crate. Only MPEG audio (ID3v2) is accepted.
//!
//! | Field  | ID3v2 frame |
//! |--------|-------------|
//! | artist | `TPE1`      |
//! | title  | `TIT2`      |
//! | genre  | `TCON`      |
//! | year   | `TDRC`      |
//! | mood   | `TMOO`      |
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::tags::{LoftyTagStore, TagStore};
//! use std::path::Path;
//!
//! # async fn example() -> core_metadata::Result<()> {
//! let store = LoftyTagStore::new();
//! let record = store.read(Path::new("song.mp3")).await?;
//! println!("Genre: {:?}", record.genre);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use lofty::config::{ParseOptions, WriteOptions};
use lofty::error::{ErrorKind, LoftyError};
use lofty::file::{AudioFile, FileType, TaggedFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{MetadataError, Result};
use crate::models::{year_from_date, TagUpdate, TrackRecord};

/// Key-value view over one file's tag block
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Read the current fields of a file
    ///
    /// # Errors
    ///
    /// - [`MetadataError::UnreadableFile`] if the container cannot be parsed
    /// - [`MetadataError::UnsupportedFormat`] if it is not MPEG audio
    async fn read(&self, path: &Path) -> Result<TrackRecord>;

    /// Write the fields present in `update`, leaving every other frame as is
    ///
    /// # Errors
    ///
    /// - [`MetadataError::WriteDenied`] on permission errors
    /// - [`MetadataError::UnsupportedFormat`] if the file is not MPEG audio
    async fn write(&self, path: &Path, update: &TagUpdate) -> Result<()>;
}

/// `lofty`-backed tag store
///
/// Parsing and saving are blocking, so both run on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct LoftyTagStore {
    parse_options: ParseOptions,
}

impl Default for LoftyTagStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LoftyTagStore {
    pub fn new() -> Self {
        Self {
            parse_options: ParseOptions::new(),
        }
    }

    fn open(&self, path: &Path) -> Result<TaggedFile> {
        let probe = Probe::open(path)
            .map_err(|e| unreadable(path, e.to_string()))?
            .options(self.parse_options)
            .guess_file_type()
            .map_err(|e| unreadable(path, e.to_string()))?;

        if let Some(file_type) = probe.file_type() {
            if file_type != FileType::Mpeg {
                return Err(MetadataError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    reason: format!("{:?} is not MPEG audio", file_type),
                });
            }
        }

        let tagged_file = probe
            .read()
            .map_err(|e| match e.kind() {
                ErrorKind::UnknownFormat => MetadataError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    reason: "unrecognized container".to_string(),
                },
                _ => unreadable(path, e.to_string()),
            })?;

        if tagged_file.file_type() != FileType::Mpeg {
            return Err(MetadataError::UnsupportedFormat {
                path: path.to_path_buf(),
                reason: format!("{:?} is not MPEG audio", tagged_file.file_type()),
            });
        }

        Ok(tagged_file)
    }

    fn read_blocking(&self, path: &Path) -> Result<TrackRecord> {
        let tagged_file = self.open(path)?;
        let mut record = TrackRecord::new(path);

        let tag = match tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
            Some(tag) => tag,
            None => {
                debug!(path = %path.display(), "File has no tags");
                return Ok(record);
            }
        };

        record.artist = tag.artist().and_then(|s| normalized(&s));
        record.title = tag.title().and_then(|s| normalized(&s));
        record.genre = tag.genre().and_then(|s| normalized(&s));
        record.year = read_year(tag);
        record.mood = tag.get_string(&ItemKey::Mood).and_then(normalized);

        Ok(record)
    }

    fn write_blocking(&self, path: &Path, update: &TagUpdate) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }

        let mut tagged_file = self.open(path)?;

        if tagged_file.primary_tag().is_none() {
            let tag_type = tagged_file.primary_tag_type();
            tagged_file.insert_tag(Tag::new(tag_type));
        }

        let tag = tagged_file
            .primary_tag_mut()
            .ok_or_else(|| unreadable(path, "no writable tag".to_string()))?;

        if let Some(genre) = &update.genre {
            tag.set_genre(genre.clone());
        }
        if let Some(year) = update.year {
            tag.insert_text(ItemKey::RecordingDate, year.to_string());
        }
        if let Some(mood) = update.mood {
            tag.insert_text(ItemKey::Mood, mood.to_string());
        }

        tagged_file
            .save_to_path(path, WriteOptions::default())
            .map_err(|e| write_error(path, e))
    }
}

#[async_trait]
impl TagStore for LoftyTagStore {
    async fn read(&self, path: &Path) -> Result<TrackRecord> {
        let store = self.clone();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || store.read_blocking(&path))
            .await
            .map_err(|e| MetadataError::Io(io::Error::other(e.to_string())))?
    }

    async fn write(&self, path: &Path, update: &TagUpdate) -> Result<()> {
        let store = self.clone();
        let path = path.to_path_buf();
        let update = update.clone();
        tokio::task::spawn_blocking(move || store.write_blocking(&path, &update))
            .await
            .map_err(|e| MetadataError::Io(io::Error::other(e.to_string())))?
    }
}

/// Year from the recording date, falling back to the plain year field
fn read_year(tag: &Tag) -> Option<u32> {
    tag.get_string(&ItemKey::RecordingDate)
        .and_then(year_from_date)
        .or_else(|| tag.get_string(&ItemKey::Year).and_then(year_from_date))
        .or_else(|| tag.year().filter(|y| (1000..=9999).contains(y)))
}

/// Normalize text metadata
///
/// - Trims leading/trailing whitespace
/// - Collapses consecutive whitespace
/// - Removes control characters
fn normalized(text: &str) -> Option<String> {
    let cleaned: String = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|c| !c.is_control())
        .collect();

    (!cleaned.is_empty()).then_some(cleaned)
}

fn unreadable(path: &Path, reason: String) -> MetadataError {
    MetadataError::UnreadableFile {
        path: path.to_path_buf(),
        reason,
    }
}

fn write_error(path: &Path, error: LoftyError) -> MetadataError {
    let path: PathBuf = path.to_path_buf();
    match error.kind() {
        ErrorKind::Io(io_err) if io_err.kind() == io::ErrorKind::PermissionDenied => {
            MetadataError::WriteDenied {
                path,
                reason: io_err.to_string(),
            }
        }
        _ => MetadataError::Io(io::Error::other(format!(
            "failed to save {}: {}",
            path.display(),
            error
        ))),
    }
}
