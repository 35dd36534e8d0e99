//! Run Summary
//!
//! Outcome counters shared by every worker of a batch, plus a serializable
//! snapshot for the final report.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

use crate::models::TagUpdate;

/// Terminal outcome of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Fields were written back
    Updated(TagUpdate),
    /// Genre, year and mood were already present
    AlreadyComplete,
    /// Artist or title is missing; nothing was queried
    MissingIdentity,
    /// Providers answered but had nothing usable
    NotFound,
    /// The file could not be read or written, or every provider failed
    Error(String),
}

impl FileOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            FileOutcome::Updated(_) => "updated",
            FileOutcome::AlreadyComplete => "already_complete",
            FileOutcome::MissingIdentity => "missing_identity",
            FileOutcome::NotFound => "not_found",
            FileOutcome::Error(_) => "error",
        }
    }
}

/// Counters for one batch invocation
#[derive(Debug)]
pub struct RunSummary {
    started_at: DateTime<Utc>,
    total: AtomicUsize,
    updated: AtomicUsize,
    already_complete: AtomicUsize,
    missing_identity: AtomicUsize,
    not_found: AtomicUsize,
    errors: AtomicUsize,
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            total: AtomicUsize::new(0),
            updated: AtomicUsize::new(0),
            already_complete: AtomicUsize::new(0),
            missing_identity: AtomicUsize::new(0),
            not_found: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        }
    }

    /// Count one finished file under exactly one outcome counter
    pub fn record(&self, outcome: &FileOutcome) {
        let counter = match outcome {
            FileOutcome::Updated(_) => &self.updated,
            FileOutcome::AlreadyComplete => &self.already_complete,
            FileOutcome::MissingIdentity => &self.missing_identity,
            FileOutcome::NotFound => &self.not_found,
            FileOutcome::Error(_) => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SummarySnapshot {
        SummarySnapshot {
            total: self.total.load(Ordering::Relaxed),
            updated: self.updated.load(Ordering::Relaxed),
            already_complete: self.already_complete.load(Ordering::Relaxed),
            missing_identity: self.missing_identity.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Point-in-time copy of a [`RunSummary`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummarySnapshot {
    pub total: usize,
    pub updated: usize,
    pub already_complete: usize,
    pub missing_identity: usize,
    pub not_found: usize,
    pub errors: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SummarySnapshot {
    /// Every counted file sits under exactly one outcome
    pub fn is_consistent(&self) -> bool {
        self.updated + self.already_complete + self.missing_identity + self.not_found + self.errors
            == self.total
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Lines of the summary block, rules included
    pub fn report_lines(&self) -> Vec<String> {
        let rule = "=".repeat(50);
        vec![
            rule.clone(),
            "PROCESSING SUMMARY".to_string(),
            rule.clone(),
            format!("Total files: {}", self.total),
            format!("Updated: {}", self.updated),
            format!("Already complete: {}", self.already_complete),
            format!("Missing artist/title: {}", self.missing_identity),
            format!("Not found: {}", self.not_found),
            format!("Errors: {}", self.errors),
            format!(
                "Elapsed: {:.1}s",
                self.elapsed().num_milliseconds() as f64 / 1000.0
            ),
            rule,
        ]
    }

    /// Emit the summary block through the log stream
    pub fn log(&self) {
        for line in self.report_lines() {
            info!("{}", line);
        }
    }
}
