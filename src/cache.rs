//! Single-slot cache of the last successful scan
//!
//! The cache is keyed on a cheap fingerprint of the history log, its size and
//! access time, so an unchanged log is never rescanned. Only successful scans
//! are stored: a log without any upgrade yet is rescanned on every request so a
//! newly appended upgrade shows up immediately.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

/// File metadata used to decide whether the log changed since the last scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub size: u64,
    pub accessed: SystemTime,
}

impl Fingerprint {
    pub fn from_metadata(metadata: &fs::Metadata) -> io::Result<Self> {
        Ok(Self {
            size: metadata.len(),
            accessed: metadata.accessed()?,
        })
    }

    /// Sample the current fingerprint of the file at `path`
    pub fn of(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::from_metadata(&fs::metadata(path)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub payload: String,
}

#[derive(Debug, Default)]
pub struct HistoryCache {
    entry: Mutex<Option<CacheEntry>>,
}

impl HistoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached payload, if the stored fingerprint matches `current` exactly
    pub fn check(&self, current: &Fingerprint) -> Option<String> {
        self.lock()
            .as_ref()
            .filter(|entry| entry.fingerprint == *current)
            .map(|entry| entry.payload.clone())
    }

    /// Replace the cached entry, last writer wins
    pub fn update(&self, fingerprint: Fingerprint, payload: String) {
        *self.lock() = Some(CacheEntry {
            fingerprint,
            payload,
        });
    }

    pub fn entry(&self) -> Option<CacheEntry> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> MutexGuard<'_, Option<CacheEntry>> {
        // The slot is always written whole, so a poisoned lock still holds a valid entry
        self.entry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
