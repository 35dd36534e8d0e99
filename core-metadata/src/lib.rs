//! # Metadata Enrichment Module
//!
//! Fills missing genre, year and mood tags on MP3 files from remote music
//! metadata services.
//!
//! ## Overview
//!
//! This module handles:
//! - Reading and writing ID3v2 tags (`tags`)
//! - Provider clients for MusicBrainz, Last.fm and Discogs (`providers`)
//! - Ordered, additive merging of provider answers (`orchestrator`)
//! - Keyword-based mood classification (`mood`)
//! - Bounded-concurrency batch processing and outcome counters
//!   (`enrichment_job`, `summary`)

pub mod enrichment_job;
pub mod error;
pub mod models;
pub mod mood;
pub mod orchestrator;
pub mod providers;
pub mod summary;
pub mod tags;

pub use enrichment_job::{EnrichmentConfig, EnrichmentJob};
pub use error::{MetadataError, Result};
pub use models::{LookupStatus, Mood, ProviderRecord, ProviderResponse, TagUpdate, TrackRecord};
pub use mood::classify;
pub use orchestrator::{LookupOrchestrator, LookupReport, ProviderAttempt};
pub use providers::{build_providers, MetadataProvider, ProviderSettings};
pub use summary::{FileOutcome, RunSummary, SummarySnapshot};
pub use tags::{LoftyTagStore, TagStore};
