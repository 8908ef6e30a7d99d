//! Finding the most recent full-system upgrade in a history log

use crate::classifier::classify;
use crate::history_reader::{HistoryBlocks, LogBlock};
use std::io;
use std::path::Path;

/// Start and end of one upgrade run, in Unix seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeWindow {
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanResult {
    Found(UpgradeWindow),
    NotFound,
}

/// Outcome of a scan together with how many blocks were examined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    pub result: ScanResult,
    pub blocks_examined: usize,
}

/// Pull blocks newest first until one classifies as a full-system upgrade
///
/// Read errors abort the scan; unrecognized or malformed blocks are skipped.
pub fn scan<I>(blocks: I) -> io::Result<ScanReport>
where
    I: IntoIterator<Item = io::Result<LogBlock>>,
{
    let mut blocks_examined = 0;

    for block in blocks {
        let block = block?;
        blocks_examined += 1;

        if let Some(window) = classify(&block) {
            return Ok(ScanReport {
                result: ScanResult::Found(window),
                blocks_examined,
            });
        }
    }

    Ok(ScanReport {
        result: ScanResult::NotFound,
        blocks_examined,
    })
}

/// Scan the history log at `path`
///
/// The file is opened read-only and closed before this returns.
pub fn scan_file(path: impl AsRef<Path>) -> io::Result<ScanReport> {
    scan(HistoryBlocks::open(path)?)
}
