//! # Metadata Enrichment Job
//!
//! Batch runner that walks a directory, fills missing genre, year and mood
//! on every matching file, and tallies the outcome of each one.
//!
//! ## Overview
//!
//! The enrichment job:
//! - Discovers files under a root whose extension matches the target format
//! - Processes them on a bounded pool of concurrent workers
//! - Skips complete files and files without artist/title before any lookup
//! - Merges provider answers and classifies a mood from genre and tags
//! - Writes back only the fields that were missing
//! - Records exactly one outcome per file in a shared [`RunSummary`]
//!
//! A failure in one file never aborts the batch; it becomes an `errors`
//! count and a log line.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ EnrichmentJob    │
//! │ - Config         │
//! │ - Worker permits │
//! └────────┬─────────┘
//!          │
//!          ├──> TagStore           (read / write tags)
//!          ├──> LookupOrchestrator (provider chain)
//!          ├──> mood::classify     (local, pure)
//!          └──> RunSummary         (atomic counters)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::enrichment_job::{EnrichmentConfig, EnrichmentJob};
//! use core_metadata::orchestrator::LookupOrchestrator;
//! use core_metadata::providers::build_providers;
//! use core_metadata::tags::LoftyTagStore;
//! use std::sync::Arc;
//!
//! let config = EnrichmentConfig::builder()
//!     .with_max_concurrent(8)
//!     .with_max_attempts(5);
//!
//! let providers = build_providers(http_client, &credentials, &config.provider_settings());
//! let job = EnrichmentJob::new(
//!     config,
//!     Arc::new(LoftyTagStore::new()),
//!     Arc::new(LookupOrchestrator::new(providers)),
//! );
//!
//! let summary = job.run(Path::new("/music")).await;
//! ```

use bridge_traits::http::RetryPolicy;
use core_runtime::config::{DEFAULT_RATE_LIMIT_DELAY_MS, DEFAULT_USER_AGENT, DEFAULT_WORKERS};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, warn};
use walkdir::WalkDir;

use crate::models::{display_name, TagUpdate, TrackRecord};
use crate::mood;
use crate::orchestrator::LookupOrchestrator;
use crate::providers::ProviderSettings;
use crate::summary::{FileOutcome, RunSummary, SummarySnapshot};
use crate::tags::TagStore;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for a batch run
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    /// Maximum number of files processed at once, at least 1
    pub max_concurrent: usize,

    /// File extension to enrich, compared case-insensitively
    pub extension: String,

    /// Retry schedule applied by every provider client
    pub retry: RetryPolicy,

    /// Minimum interval between two requests to the same provider
    pub rate_limit: Duration,

    /// Timeout for a single provider request
    pub request_timeout: Duration,

    /// User-Agent sent to every provider
    pub user_agent: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_WORKERS,
            extension: "mp3".to_string(),
            retry: RetryPolicy::default(),
            rate_limit: Duration::from_millis(DEFAULT_RATE_LIMIT_DELAY_MS),
            request_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl EnrichmentConfig {
    /// Create builder for configuration
    pub fn builder() -> Self {
        Self::default()
    }

    /// Set max concurrent files; zero is raised to one
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    /// Set the target extension, with or without the leading dot
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the total number of attempts per provider request
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.retry.max_attempts = attempts.max(1);
        self
    }

    pub fn with_rate_limit(mut self, interval: Duration) -> Self {
        self.rate_limit = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Request settings handed to the provider clients
    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            user_agent: self.user_agent.clone(),
            rate_limit: self.rate_limit,
            retry: self.retry.clone(),
            request_timeout: self.request_timeout,
        }
    }
}

// =============================================================================
// Enrichment Job
// =============================================================================

/// Batch job enriching every matching file under a root directory
#[derive(Clone)]
pub struct EnrichmentJob {
    config: EnrichmentConfig,
    tag_store: Arc<dyn TagStore>,
    orchestrator: Arc<LookupOrchestrator>,
}

impl EnrichmentJob {
    /// Create new enrichment job
    pub fn new(
        config: EnrichmentConfig,
        tag_store: Arc<dyn TagStore>,
        orchestrator: Arc<LookupOrchestrator>,
    ) -> Self {
        Self {
            config,
            tag_store,
            orchestrator,
        }
    }

    pub fn config(&self) -> &EnrichmentConfig {
        &self.config
    }

    /// Run the job over `root` and return the final counters.
    ///
    /// Never fails: every per-file problem is counted in the summary. The
    /// summary block is logged before returning.
    #[instrument(skip(self, root), fields(root = %root.display()), name = "enrichment_job")]
    pub async fn run(&self, root: &Path) -> SummarySnapshot {
        let walker = self.clone();
        let walk_root = root.to_path_buf();
        let files = match tokio::task::spawn_blocking(move || walker.discover(&walk_root)).await
        {
            Ok(files) => files,
            Err(e) => {
                error!(error = %e, "Directory walk failed");
                Vec::new()
            }
        };

        info!(
            files = files.len(),
            workers = self.config.max_concurrent,
            providers = ?self.orchestrator.active_providers(),
            "Starting metadata enrichment"
        );

        let summary = Arc::new(RunSummary::new());
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let mut handles = Vec::with_capacity(files.len());

        for path in files {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Worker pool closed");
                    summary.record(&FileOutcome::Error(e.to_string()));
                    continue;
                }
            };
            let job = self.clone();
            let worker_summary = Arc::clone(&summary);

            let handle = tokio::spawn(async move {
                let outcome = job.process_file(&path).await;
                worker_summary.record(&outcome);
                drop(permit);
            });

            handles.push(handle);
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Worker panicked");
                summary.record(&FileOutcome::Error(e.to_string()));
            }
        }

        let snapshot = summary.snapshot();
        snapshot.log();
        snapshot
    }

    /// Every file under `root` with the configured extension, sorted.
    ///
    /// Blocks on filesystem I/O; [`run`](Self::run) calls it on the blocking
    /// pool. Symlinks are not followed. Entries that cannot be read are logged and
    /// skipped.
    pub fn discover(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| has_extension(entry.path(), &self.config.extension))
            .map(|entry| entry.into_path())
            .collect();

        files.sort();
        for path in &files {
            debug!(path = %path.display(), "Discovered file");
        }
        files
    }

    /// Process one file to its terminal outcome
    #[instrument(skip(self, path), fields(file = %display_name(path)))]
    pub async fn process_file(&self, path: &Path) -> FileOutcome {
        info!("Processing");

        let mut record = match self.tag_store.read(path).await {
            Ok(record) => record,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to read tags");
                return FileOutcome::Error(e.to_string());
            }
        };

        if record.is_complete() {
            info!("Skipping, genre, year and mood already present");
            return FileOutcome::AlreadyComplete;
        }

        if !record.has_identity() {
            warn!(path = %path.display(), "Skipping, missing artist or title");
            return FileOutcome::MissingIdentity;
        }

        let original = record.clone();
        let mut all_failed = false;

        if record.needs_lookup() {
            match self.orchestrator.enrich(&mut record).await {
                Ok(report) => all_failed = report.all_failed(),
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Lookup failed");
                    return FileOutcome::Error(e.to_string());
                }
            }
        }

        let update = planned_update(&original, &record);

        if update.is_empty() {
            if all_failed {
                error!(path = %path.display(), "Every provider failed");
                return FileOutcome::Error("every provider failed".to_string());
            }
            info!("No metadata found");
            return FileOutcome::NotFound;
        }

        if let Err(e) = self.tag_store.write(path, &update).await {
            error!(path = %path.display(), error = %e, "Failed to write tags");
            return FileOutcome::Error(e.to_string());
        }

        info!(fields = %update.describe(), "Updated");
        FileOutcome::Updated(update)
    }
}

/// Fields to write: whatever the lookup filled, plus a mood when the file
/// has none and there is a genre or at least one tag to classify from.
fn planned_update(original: &TrackRecord, enriched: &TrackRecord) -> TagUpdate {
    let update = TagUpdate::between(original, enriched);

    let has_evidence = enriched.genre.is_some() || !enriched.tags.is_empty();
    if original.mood.is_none() && has_evidence {
        update.with_mood(mood::classify(enriched.genre.as_deref(), &enriched.tags))
    } else {
        update
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MetadataError, Result};
    use crate::models::{Mood, ProviderRecord, ProviderResponse};
    use crate::providers::MetadataProvider;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        records: Mutex<HashMap<PathBuf, TrackRecord>>,
        writes: Mutex<Vec<(PathBuf, TagUpdate)>>,
        deny_writes: bool,
    }

    impl MemoryStore {
        fn with(records: Vec<TrackRecord>) -> Self {
            Self {
                records: Mutex::new(records.into_iter().map(|r| (r.path.clone(), r)).collect()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl TagStore for MemoryStore {
        async fn read(&self, path: &Path) -> Result<TrackRecord> {
            self.records
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| MetadataError::UnreadableFile {
                    path: path.to_path_buf(),
                    reason: "no such record".to_string(),
                })
        }

        async fn write(&self, path: &Path, update: &TagUpdate) -> Result<()> {
            if self.deny_writes {
                return Err(MetadataError::WriteDenied {
                    path: path.to_path_buf(),
                    reason: "read-only".to_string(),
                });
            }
            self.writes
                .lock()
                .unwrap()
                .push((path.to_path_buf(), update.clone()));
            Ok(())
        }
    }

    struct Fixed {
        response: ProviderResponse,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MetadataProvider for Fixed {
        fn name(&self) -> &'static str {
            "MusicBrainz"
        }

        async fn lookup(&self, _artist: &str, _title: &str) -> ProviderResponse {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }
    }

    fn job(store: Arc<MemoryStore>, response: ProviderResponse) -> (EnrichmentJob, Arc<Fixed>) {
        let provider = Arc::new(Fixed {
            response,
            calls: AtomicUsize::new(0),
        });
        let orchestrator =
            LookupOrchestrator::new(vec![Arc::clone(&provider) as Arc<dyn MetadataProvider>]);
        let job = EnrichmentJob::new(
            EnrichmentConfig::default(),
            store,
            Arc::new(orchestrator),
        );
        (job, provider)
    }

    fn identified(path: &str) -> TrackRecord {
        TrackRecord::new(path)
            .with_artist("Marvin Gaye")
            .with_title("What's Going On")
    }

    #[test]
    fn test_config_builder() {
        let config = EnrichmentConfig::builder()
            .with_max_concurrent(0)
            .with_extension(".MP3")
            .with_max_attempts(5)
            .with_rate_limit(Duration::from_millis(250))
            .with_request_timeout(Duration::from_secs(5))
            .with_user_agent("test-agent/1.0");

        assert_eq!(config.max_concurrent, 1);
        assert_eq!(config.extension, "MP3");
        assert_eq!(config.retry.max_attempts, 5);

        let settings = config.provider_settings();
        assert_eq!(settings.rate_limit, Duration::from_millis(250));
        assert_eq!(settings.request_timeout, Duration::from_secs(5));
        assert_eq!(settings.user_agent, "test-agent/1.0");
        assert_eq!(settings.retry.max_attempts, 5);
    }

    #[test]
    fn test_config_defaults() {
        let config = EnrichmentConfig::default();
        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.extension, "mp3");
        assert_eq!(config.rate_limit, Duration::from_secs(1));
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_discover_matches_extension_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("album").join("disc 1");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("b.mp3"), b"").unwrap();
        std::fs::write(dir.path().join("a.MP3"), b"").unwrap();
        std::fs::write(nested.join("c.mp3"), b"").unwrap();
        std::fs::write(dir.path().join("cover.jpg"), b"").unwrap();
        std::fs::write(dir.path().join("notes.mp3.txt"), b"").unwrap();
        std::fs::create_dir(dir.path().join("folder.mp3")).unwrap();

        let (job, _) = job(Arc::new(MemoryStore::default()), ProviderResponse::not_found());
        let files = job.discover(dir.path());

        assert_eq!(
            files,
            vec![
                dir.path().join("a.MP3"),
                dir.path().join("album").join("disc 1").join("c.mp3"),
                dir.path().join("b.mp3"),
            ]
        );
    }

    #[test]
    fn test_discover_missing_root_is_empty() {
        let (job, _) = job(Arc::new(MemoryStore::default()), ProviderResponse::not_found());
        assert!(job.discover(Path::new("/definitely/not/here")).is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_run_walks_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("artist").join("album");
        std::fs::create_dir_all(&nested).unwrap();
        let path = nested.join("song.mp3");
        std::fs::write(&path, b"").unwrap();

        let record = identified(path.to_str().unwrap())
            .with_genre("Ambient")
            .with_year(1992)
            .with_mood("chill");
        let store = Arc::new(MemoryStore::with(vec![record]));
        let (job, _) = job(store, ProviderResponse::not_found());

        let summary = job.run(dir.path()).await;
        assert_eq!(summary.total, 1);
        assert_eq!(summary.already_complete, 1);

        let empty = job.run(Path::new("/definitely/not/here")).await;
        assert_eq!(empty.total, 0);
    }

    #[tokio::test]
    async fn test_unreadable_file_is_error() {
        let (job, provider) = job(Arc::new(MemoryStore::default()), ProviderResponse::not_found());

        let outcome = job.process_file(Path::new("/music/missing.mp3")).await;

        assert!(matches!(outcome, FileOutcome::Error(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_complete_file_is_skipped() {
        let record = identified("/music/a.mp3")
            .with_genre("Soul")
            .with_year(1971)
            .with_mood("groovy");
        let store = Arc::new(MemoryStore::with(vec![record]));
        let (job, provider) = job(Arc::clone(&store), ProviderResponse::not_found());

        let outcome = job.process_file(Path::new("/music/a.mp3")).await;

        assert_eq!(outcome, FileOutcome::AlreadyComplete);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert!(store.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_only_mood_is_classified_locally() {
        let record = identified("/music/a.mp3")
            .with_genre("Funk")
            .with_year(1971);
        let store = Arc::new(MemoryStore::with(vec![record]));
        let (job, provider) = job(Arc::clone(&store), ProviderResponse::not_found());

        let outcome = job.process_file(Path::new("/music/a.mp3")).await;

        let expected = TagUpdate::default().with_mood(Mood::Groovy);
        assert_eq!(outcome, FileOutcome::Updated(expected.clone()));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            store.writes.lock().unwrap().as_slice(),
            &[(PathBuf::from("/music/a.mp3"), expected)]
        );
    }

    #[tokio::test]
    async fn test_lookup_fills_fields_and_mood() {
        let store = Arc::new(MemoryStore::with(vec![identified("/music/a.mp3")]));
        let (job, _) = job(
            Arc::clone(&store),
            ProviderResponse::found(
                ProviderRecord::default()
                    .with_genre("Soul")
                    .with_year(1971)
                    .with_tags(["soul", "funk"]),
            ),
        );

        let outcome = job.process_file(Path::new("/music/a.mp3")).await;

        match outcome {
            FileOutcome::Updated(update) => {
                assert_eq!(update.genre.as_deref(), Some("Soul"));
                assert_eq!(update.year, Some(1971));
                assert_eq!(update.mood, Some(Mood::Groovy));
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_existing_mood_is_kept() {
        let record = identified("/music/a.mp3").with_mood("melancholic");
        let store = Arc::new(MemoryStore::with(vec![record]));
        let (job, _) = job(
            Arc::clone(&store),
            ProviderResponse::found(ProviderRecord::default().with_genre("Disco")),
        );

        let outcome = job.process_file(Path::new("/music/a.mp3")).await;

        match outcome {
            FileOutcome::Updated(update) => {
                assert_eq!(update.genre.as_deref(), Some("Disco"));
                assert_eq!(update.mood, None);
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_evidence_is_not_found() {
        let store = Arc::new(MemoryStore::with(vec![identified("/music/a.mp3")]));
        let (job, _) = job(Arc::clone(&store), ProviderResponse::not_found());

        let outcome = job.process_file(Path::new("/music/a.mp3")).await;

        assert_eq!(outcome, FileOutcome::NotFound);
        assert!(store.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_every_provider_failing_is_error() {
        let store = Arc::new(MemoryStore::with(vec![identified("/music/a.mp3")]));
        let (job, _) = job(Arc::clone(&store), ProviderResponse::error());

        let outcome = job.process_file(Path::new("/music/a.mp3")).await;

        assert!(matches!(outcome, FileOutcome::Error(_)));
    }

    #[tokio::test]
    async fn test_write_denied_is_error() {
        let store = Arc::new(MemoryStore {
            deny_writes: true,
            ..MemoryStore::with(vec![identified("/music/a.mp3")])
        });
        let (job, _) = job(
            store,
            ProviderResponse::found(ProviderRecord::default().with_year(1971)),
        );

        let outcome = job.process_file(Path::new("/music/a.mp3")).await;

        assert!(matches!(outcome, FileOutcome::Error(_)));
    }

    #[test]
    fn test_planned_update_uses_neutral_with_evidence() {
        let original = identified("/music/a.mp3");
        let enriched = original.clone().with_genre("Polka");

        let update = planned_update(&original, &enriched);

        assert_eq!(update.genre.as_deref(), Some("Polka"));
        assert_eq!(update.mood, Some(Mood::Neutral));
    }
}
