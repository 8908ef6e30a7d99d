//! Cache-checked lookup of the last system upgrade
//!
//! All file access runs on tokio's blocking pool so a long scan of a large
//! history log never stalls the task accepting connections. Concurrent misses
//! may scan at the same time; the cache slot is last-writer-wins.

use crate::cache::{Fingerprint, HistoryCache};
use crate::config::ServiceConfig;
use crate::scanner::{scan_file, ScanResult};
use crate::schema::UpgradeResponse;
use anyhow::{Context, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct UpgradeService {
    history_log: Arc<PathBuf>,
    scan_delay: Duration,
    cache: Arc<HistoryCache>,
    scans: Arc<AtomicUsize>,
}

impl UpgradeService {
    pub fn new(history_log: impl Into<PathBuf>, scan_delay: Duration) -> Self {
        Self {
            history_log: Arc::new(history_log.into()),
            scan_delay,
            cache: Arc::new(HistoryCache::new()),
            scans: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.history_log.clone(), config.scan_delay())
    }

    pub fn history_log(&self) -> &Path {
        &self.history_log
    }

    pub fn cache(&self) -> &HistoryCache {
        &self.cache
    }

    /// Number of full scans started so far
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    /// Cached payload if the log is unchanged since it was computed (blocking)
    pub fn cached_payload(&self) -> io::Result<Option<String>> {
        if self.cache.entry().is_none() {
            return Ok(None);
        }

        let fingerprint = Fingerprint::of(self.history_log.as_path())?;
        Ok(self.cache.check(&fingerprint))
    }

    /// Scan the log and cache the payload if an upgrade was found (blocking)
    ///
    /// The fingerprint is sampled after the scan, so the access time written by
    /// reading the log is part of it.
    pub fn refresh(&self) -> io::Result<String> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        let started = Instant::now();

        let report = scan_file(self.history_log.as_path())?;
        let payload = UpgradeResponse::from(report.result).to_json();

        match report.result {
            ScanResult::Found(window) => {
                tracing::info!(
                    "Found upgrade {}..{} after {} blocks in {:?}",
                    window.start,
                    window.end,
                    report.blocks_examined,
                    started.elapsed()
                );
                let fingerprint = Fingerprint::of(self.history_log.as_path())?;
                self.cache.update(fingerprint, payload.clone());
            }
            ScanResult::NotFound => {
                tracing::warn!(
                    "No upgrade in {} ({} blocks scanned)",
                    self.history_log.display(),
                    report.blocks_examined
                );
            }
        }

        Ok(payload)
    }

    /// Serialized response for the most recent upgrade
    pub async fn last_upgrade(&self) -> Result<String> {
        let service = self.clone();
        let cached = in_current_span_blocking(move || service.cached_payload())
            .await
            .context("Cache check task failed")?
            .with_context(|| format!("Failed to stat {}", self.history_log.display()))?;

        if let Some(payload) = cached {
            tracing::debug!("Cache hit for {}", self.history_log.display());
            return Ok(payload);
        }

        tracing::debug!("Cache miss for {}", self.history_log.display());

        if !self.scan_delay.is_zero() {
            tokio::time::sleep(self.scan_delay).await;
        }

        let service = self.clone();
        in_current_span_blocking(move || service.refresh())
            .await
            .context("Scan task failed")?
            .with_context(|| format!("Failed to scan {}", self.history_log.display()))
    }
}

/// Run `f` on the blocking pool inside the caller's span and subscriber,
/// so its log lines carry the request id
async fn in_current_span_blocking<F, T>(f: F) -> Result<T, tokio::task::JoinError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let span = tracing::Span::current();
    let dispatch = tracing::dispatcher::get_default(|dispatch| dispatch.clone());

    tokio::task::spawn_blocking(move || {
        tracing::dispatcher::with_default(&dispatch, || span.in_scope(f))
    })
    .await
}
