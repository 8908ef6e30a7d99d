//! Common test utilities and helpers

#![allow(dead_code)]

use apt_last_upgrade::{HistoryServer, ServiceConfig, UpgradeResponse, UpgradeService};
use chrono::{Local, NaiveDateTime, TimeZone};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Render one apt history entry, including the blank line that precedes it
pub fn history_block(commandline: &str, start: &str, end: &str) -> String {
    format!(
        "\nStart-Date: {}\nCommandline: {}\nRequested-By: admin (1000)\nUpgrade: libssl3:amd64 (3.0.11-1, 3.0.13-1)\nEnd-Date: {}\n",
        start.replacen(' ', "  ", 1),
        commandline,
        end.replacen(' ', "  ", 1),
    )
}

pub fn upgrade_block(start: &str, end: &str) -> String {
    history_block("apt-get upgrade", start, end)
}

pub fn install_block(package: &str) -> String {
    history_block(
        &format!("apt-get install {}", package),
        "2023-12-31 23:00:00",
        "2023-12-31 23:00:10",
    )
}

/// Create `history.log` inside a fresh temporary directory
pub fn create_history_log(blocks: &[String]) -> (PathBuf, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("history.log");

    let mut file = BufWriter::new(File::create(&path).expect("Failed to create history log"));
    for block in blocks {
        file.write_all(block.as_bytes()).expect("Failed to write block");
    }
    file.flush().expect("Failed to flush history log");

    (path, temp_dir)
}

/// Create a large history log of installs with a single upgrade near the top or bottom
pub fn create_large_history_log(num_installs: usize, upgrade_first: bool) -> (PathBuf, TempDir) {
    let mut blocks: Vec<String> = (0..num_installs)
        .map(|i| install_block(&format!("package-{}", i)))
        .collect();
    let upgrade = upgrade_block("2024-01-01 00:00:00", "2024-01-01 00:10:00");

    if upgrade_first {
        blocks.insert(0, upgrade);
    } else {
        blocks.push(upgrade);
    }

    create_history_log(&blocks)
}

pub fn append_to_log(path: &Path, content: &str) {
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .expect("Failed to open history log");
    file.write_all(content.as_bytes()).expect("Failed to append");
}

/// Unix timestamp of a local wall-clock time `YYYY-MM-DD HH:MM:SS`
pub fn local_timestamp(s: &str) -> i64 {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").expect("Invalid time");
    Local
        .from_local_datetime(&naive)
        .earliest()
        .expect("Nonexistent local time")
        .timestamp()
}

/// Bind a server on an ephemeral localhost port and run it in the background
pub async fn spawn_server(history_log: &Path, scan_delay_ms: u64) -> (SocketAddr, UpgradeService) {
    let config = ServiceConfig {
        listen_addr: IpAddr::from([127, 0, 0, 1]),
        listen_port: 0,
        history_log: history_log.to_path_buf(),
        scan_delay_ms,
    };

    let server = HistoryServer::bind(&config).await.expect("Failed to bind server");
    let addr = server.local_addr().expect("Failed to get local address");
    let service = server.service().clone();

    tokio::spawn(server.run());
    (addr, service)
}

/// Minimal HTTP/1.1 request, returns status code and body
pub async fn http_request(addr: SocketAddr, method: &str, path: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.expect("Failed to connect");
    let request = format!(
        "{} {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        method, path, addr
    );
    stream.write_all(request.as_bytes()).await.expect("Failed to send request");

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.expect("Failed to read response");
    let raw = String::from_utf8(raw).expect("Response is not UTF-8");

    let (head, body) = raw.split_once("\r\n\r\n").expect("Malformed response");
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .expect("Missing status code");

    (status, body.to_string())
}

pub async fn http_get(addr: SocketAddr, path: &str) -> (u16, UpgradeResponse) {
    let (status, body) = http_request(addr, "GET", path).await;
    let response = serde_json::from_str(&body).expect("Body is not a JSON response");
    (status, response)
}
