//! Last system upgrade lookup
//!
//! Scans an apt history log from its newest entry backwards for the most
//! recent full-system upgrade and serves its start and end time over HTTP.

pub mod cache;
pub mod classifier;
pub mod config;
pub mod history_reader;
pub mod scanner;
pub mod schema;
pub mod server;
pub mod service;

// Re-export commonly used types
pub use cache::{Fingerprint, HistoryCache};
pub use config::ServiceConfig;
pub use history_reader::{HistoryBlocks, LogBlock, ReverseLines};
pub use scanner::{scan, scan_file, ScanResult, UpgradeWindow};
pub use schema::UpgradeResponse;
pub use server::HistoryServer;
pub use service::UpgradeService;
