//! # Lookup Orchestrator
//!
//! Queries the provider chain for one track and merges the answers.
//!
//! ## Overview
//!
//! Providers are asked in their fixed order (MusicBrainz, Last.fm, Discogs).
//! Each answer fills only the fields that are still empty, and every tag a
//! provider returns is collected for mood classification. The walk stops as
//! soon as genre and year are both known and the file already carries a mood;
//! a file without one keeps asking so later providers can contribute tags.
//!
//! A provider that rejects its credentials is disabled for the rest of the
//! run; all workers share the same orchestrator, so no later file pays for
//! another futile request.
//!
//! ```text
//! ┌────────────────────┐
//! │ LookupOrchestrator │
//! └──────────┬─────────┘
//!            ├──> MusicBrainz (always)
//!            ├──> Last.fm     (API key)
//!            └──> Discogs     (token)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::{MetadataError, Result};
use crate::models::{LookupStatus, TrackRecord};
use crate::providers::{normalize_query, MetadataProvider};

struct ProviderSlot {
    provider: Arc<dyn MetadataProvider>,
    disabled: AtomicBool,
}

/// One provider call made during a lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAttempt {
    pub provider: &'static str,
    pub status: LookupStatus,
    /// Fields this answer filled
    pub filled: Vec<&'static str>,
}

/// Record of the provider calls made for one track
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupReport {
    pub attempts: Vec<ProviderAttempt>,
}

impl LookupReport {
    /// Number of provider calls issued
    pub fn calls(&self) -> usize {
        self.attempts.len()
    }

    /// At least one provider gave a definitive answer
    pub fn any_answered(&self) -> bool {
        self.attempts.iter().any(|a| a.status.is_answer())
    }

    /// Providers were queried and none of them answered
    pub fn all_failed(&self) -> bool {
        !self.attempts.is_empty() && !self.any_answered()
    }
}

/// Walks the provider chain for a track
pub struct LookupOrchestrator {
    providers: Vec<ProviderSlot>,
}

impl LookupOrchestrator {
    /// Create an orchestrator over providers in priority order
    pub fn new(providers: Vec<Arc<dyn MetadataProvider>>) -> Self {
        Self {
            providers: providers
                .into_iter()
                .map(|provider| ProviderSlot {
                    provider,
                    disabled: AtomicBool::new(false),
                })
                .collect(),
        }
    }

    /// Names of the providers still enabled, in query order
    pub fn active_providers(&self) -> Vec<&'static str> {
        self.providers
            .iter()
            .filter(|slot| !slot.disabled.load(Ordering::Acquire))
            .map(|slot| slot.provider.name())
            .collect()
    }

    /// Fill missing genre and year on `record` from the providers.
    ///
    /// Issues no call when genre and year are already present. Once a lookup
    /// has started, a record without a mood is walked through every enabled
    /// provider so their tags reach the classifier.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::MissingIdentity`] without querying anything
    /// when the record lacks an artist or title. Provider failures are never
    /// errors here; they are reported per attempt.
    #[instrument(skip(self, record), fields(file = %record.file_name()))]
    pub async fn enrich(&self, record: &mut TrackRecord) -> Result<LookupReport> {
        let (artist, title) = match (&record.artist, &record.title) {
            (Some(artist), Some(title)) => (normalize_query(artist), normalize_query(title)),
            _ => return Err(MetadataError::MissingIdentity(record.path.clone())),
        };

        let mut report = LookupReport::default();
        if !record.needs_lookup() {
            return Ok(report);
        }

        for slot in &self.providers {
            if !record.needs_lookup() && record.mood.is_some() {
                break;
            }
            if slot.disabled.load(Ordering::Acquire) {
                continue;
            }

            let name = slot.provider.name();
            let response = slot.provider.lookup(&artist, &title).await;

            let filled = match response.status {
                LookupStatus::Found => record.merge(&response.record),
                LookupStatus::AuthFailed => {
                    if !slot.disabled.swap(true, Ordering::AcqRel) {
                        warn!(
                            provider = name,
                            "Credentials rejected, provider disabled for the rest of the run"
                        );
                    }
                    Vec::new()
                }
                LookupStatus::NotFound | LookupStatus::Error => Vec::new(),
            };

            debug!(provider = name, status = ?response.status, filled = ?filled, "Provider answered");

            report.attempts.push(ProviderAttempt {
                provider: name,
                status: response.status,
                filled,
            });
        }

        Ok(report)
    }
}
