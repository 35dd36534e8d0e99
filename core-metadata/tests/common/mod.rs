//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use core_metadata::{
    MetadataError, MetadataProvider, ProviderResponse, Result, TagStore, TagUpdate, TrackRecord,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Tag store over an in-memory map; writes are applied to the stored record
#[derive(Default)]
pub struct MemoryTagStore {
    records: Mutex<HashMap<PathBuf, TrackRecord>>,
    writes: AtomicUsize,
}

impl MemoryTagStore {
    pub fn new(records: Vec<TrackRecord>) -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(records.into_iter().map(|r| (r.path.clone(), r)).collect()),
            writes: AtomicUsize::new(0),
        })
    }

    pub fn get(&self, path: &str) -> TrackRecord {
        self.records.lock().unwrap()[Path::new(path)].clone()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TagStore for MemoryTagStore {
    async fn read(&self, path: &Path) -> Result<TrackRecord> {
        self.records
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| MetadataError::UnreadableFile {
                path: path.to_path_buf(),
                reason: "not in store".to_string(),
            })
    }

    async fn write(&self, path: &Path, update: &TagUpdate) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(path)
            .ok_or_else(|| MetadataError::WriteDenied {
                path: path.to_path_buf(),
                reason: "not in store".to_string(),
            })?;

        if let Some(genre) = &update.genre {
            record.genre = Some(genre.clone());
        }
        if let Some(year) = update.year {
            record.year = Some(year);
        }
        if let Some(mood) = update.mood {
            record.mood = Some(mood.to_string());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Provider answering every lookup with the same response
pub struct ScriptedProvider {
    name: &'static str,
    response: ProviderResponse,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(name: &'static str, response: ProviderResponse) -> Arc<Self> {
        Arc::new(Self {
            name,
            response,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn lookup(&self, _artist: &str, _title: &str) -> ProviderResponse {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}

pub fn as_chain(providers: &[&Arc<ScriptedProvider>]) -> Vec<Arc<dyn MetadataProvider>> {
    providers
        .iter()
        .map(|p| Arc::clone(*p) as Arc<dyn MetadataProvider>)
        .collect()
}

pub fn track(path: &str) -> TrackRecord {
    TrackRecord::new(path)
        .with_artist("Artist")
        .with_title("Title")
}

/// Minimal MPEG-1 Layer III stream: silent 128 kbps / 44.1 kHz frames
pub fn silent_mp3() -> Vec<u8> {
    const FRAME_LEN: usize = 417;
    let mut frame = vec![0u8; FRAME_LEN];
    frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
    frame.repeat(12)
}
