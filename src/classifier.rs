//! Recognizing full-system upgrades in history blocks

use crate::history_reader::LogBlock;
use crate::scanner::UpgradeWindow;
use chrono::{Local, NaiveDateTime, TimeZone};

pub const COMMANDLINE_TAG: &str = "Commandline:";
pub const START_DATE_TAG: &str = "Start-Date:";
pub const END_DATE_TAG: &str = "End-Date:";

/// Package manager binary whose invocations are considered
pub const PACKAGE_MANAGER: &str = "apt-get";

/// Subcommands that upgrade the whole system
pub const UPGRADE_SUBCOMMANDS: [&str; 2] = ["upgrade", "dist-upgrade"];

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Return the upgrade window of a block, if it logs a full-system upgrade
///
/// Blocks without a command line, other commands, and upgrades whose start or
/// end date is missing or unparseable all yield `None`.
pub fn classify(block: &LogBlock) -> Option<UpgradeWindow> {
    let command = strip_options(block.get(COMMANDLINE_TAG)?);
    if !is_full_upgrade(&command) {
        return None;
    }

    let start = parse_time(block.get(START_DATE_TAG)?)?;
    let end = parse_time(block.get(END_DATE_TAG)?)?;

    Some(UpgradeWindow { start, end })
}

/// Drop command line options (`-y`, `--fix-missing`, ...) keeping argument order
pub fn strip_options(tokens: &[String]) -> Vec<&str> {
    tokens
        .iter()
        .map(String::as_str)
        .filter(|token| !token.starts_with('-'))
        .collect()
}

fn is_full_upgrade(command: &[&str]) -> bool {
    match command {
        [binary, subcommand, ..] => {
            *binary == PACKAGE_MANAGER && UPGRADE_SUBCOMMANDS.contains(subcommand)
        }
        _ => false,
    }
}

/// Parse a `[date, time]` token pair into Unix seconds
///
/// The log records wall-clock time, so the pair is interpreted in the local
/// timezone. An ambiguous time (DST fold) resolves to the earlier instant.
pub fn parse_time(tokens: &[String]) -> Option<i64> {
    let [date, time, ..] = tokens else {
        return None;
    };

    let naive = NaiveDateTime::parse_from_str(&format!("{} {}", date, time), TIME_FORMAT).ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|datetime| datetime.timestamp())
}
