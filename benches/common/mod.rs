//! Common utilities for benchmarks

use rand::seq::SliceRandom;
use rand::Rng;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const PACKAGES: [&str; 8] = [
    "vim", "curl", "htop", "git", "nginx", "postgresql-15", "python3-pip", "build-essential",
];

const COMMANDS: [&str; 3] = ["install", "remove", "purge"];

/// Create a history log of `num_entries` random non-upgrade runs
///
/// When `upgrade_at_end` is set the newest entry is an upgrade, otherwise the oldest one is.
pub fn create_history_log(dir: &Path, num_entries: usize, upgrade_at_end: bool) -> PathBuf {
    let log_path = dir.join(format!("history-{}-{}.log", num_entries, upgrade_at_end));
    let mut file = BufWriter::new(File::create(&log_path).expect("Failed to create history log"));
    let mut rng = rand::thread_rng();

    if !upgrade_at_end {
        write_entry(&mut file, "apt-get -y upgrade", "libc6:amd64 (2.36-9, 2.36-9+deb12u4)");
    }

    for _ in 0..num_entries {
        let package = PACKAGES.choose(&mut rng).unwrap();
        let command = COMMANDS.choose(&mut rng).unwrap();
        let version = format!("{}.{}.{}-1", rng.gen_range(0..10), rng.gen_range(0..30), rng.gen_range(0..100));

        write_entry(
            &mut file,
            &format!("apt-get {} {}", command, package),
            &format!("{}:amd64 ({})", package, version),
        );
    }

    if upgrade_at_end {
        write_entry(&mut file, "apt-get dist-upgrade", "libc6:amd64 (2.36-9, 2.36-9+deb12u4)");
    }

    file.flush().expect("Failed to flush history log");
    log_path
}

fn write_entry(file: &mut impl Write, commandline: &str, packages: &str) {
    write!(
        file,
        "\nStart-Date: 2024-01-01  00:00:00\nCommandline: {}\nRequested-By: admin (1000)\nUpgrade: {}\nEnd-Date: 2024-01-01  00:01:00\n",
        commandline, packages
    )
    .expect("Failed to write entry");
}
