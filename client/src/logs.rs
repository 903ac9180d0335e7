//! Live log viewer model.
//!
//! The report service streams pipeline logs as Server-Sent Events. Each
//! `data:` line carries a JSON entry; entries land in a bounded [`LogBuffer`]
//! that drops the oldest entry once full.

use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::config::MAX_LOG_ENTRIES;
use crate::error::ClientResult;

/// Log level for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    pub fn icon(&self) -> &'static str {
        match self {
            LogLevel::Info => "ℹ️",
            LogLevel::Success => "✅",
            LogLevel::Warning => "⚠️",
            LogLevel::Error => "❌",
        }
    }
}

/// A single log entry as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Local receive time, `HH:MM:SS`.
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
    pub indent: u8,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}{}",
            self.timestamp,
            self.level.icon(),
            "   ".repeat(self.indent as usize),
            self.message
        )
    }
}

#[derive(Deserialize)]
struct WireEntry {
    #[serde(default)]
    level: LogLevel,
    message: String,
    #[serde(default)]
    indent: u8,
}

/// Parse one SSE line into an entry.
///
/// Comment lines (`:keep-alive`), other SSE fields and empty data are skipped.
/// Data that is not a JSON entry becomes an info entry with the raw text.
pub fn parse_sse_line(line: &str) -> Option<LogEntry> {
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data).trim_end();
    if data.is_empty() {
        return None;
    }

    let timestamp = chrono::Local::now().format("%H:%M:%S").to_string();
    let entry = match serde_json::from_str::<WireEntry>(data) {
        Ok(wire) => LogEntry {
            timestamp,
            level: wire.level,
            message: wire.message,
            indent: wire.indent,
        },
        Err(_) => LogEntry {
            timestamp,
            level: LogLevel::Info,
            message: data.to_string(),
            indent: 0,
        },
    };
    Some(entry)
}

/// Ring buffer of recent entries.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    evicted: u64,
}

impl LogBuffer {
    /// Capacity is at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            evicted: 0,
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.evicted += 1;
        }
        self.entries.push_back(entry);
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries dropped to make room since creation.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(MAX_LOG_ENTRIES)
    }
}

/// Longest SSE line kept; longer lines are dropped whole.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Splits a byte stream into lines, holding partial lines between chunks.
///
/// `pending` never holds a newline, so each chunk is scanned once.
#[derive(Debug, Default)]
struct LineSplitter {
    pending: Vec<u8>,
    oversized: bool,
}

impl LineSplitter {
    fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            self.append(&rest[..pos]);
            if self.oversized {
                log::warn!("Dropped log line longer than {} bytes", MAX_LINE_BYTES);
            } else {
                let text = String::from_utf8_lossy(&self.pending);
                lines.push(text.trim_end_matches('\r').to_string());
            }
            self.pending.clear();
            self.oversized = false;
            rest = &rest[pos + 1..];
        }
        self.append(rest);
        lines
    }

    fn append(&mut self, bytes: &[u8]) {
        if self.oversized {
            return;
        }
        if self.pending.len() + bytes.len() > MAX_LINE_BYTES {
            self.oversized = true;
            self.pending = Vec::new();
        } else {
            self.pending.extend_from_slice(bytes);
        }
    }
}

/// Follow the log stream at `url` until the server closes it.
///
/// Every entry is pushed into `buffer` and then passed to `on_entry`.
pub async fn follow_logs<F>(client: &Client, url: Url, buffer: &mut LogBuffer, mut on_entry: F) -> ClientResult<()>
where
    F: FnMut(&LogEntry),
{
    log::info!("📡 Connecting to log stream {}", url);
    let response = client
        .get(url)
        .header(ACCEPT, "text/event-stream")
        .send()
        .await?
        .error_for_status()?;

    let mut stream = response.bytes_stream();
    let mut splitter = LineSplitter::default();

    while let Some(chunk) = stream.next().await {
        for line in splitter.feed(&chunk?) {
            if let Some(entry) = parse_sse_line(&line) {
                on_entry(&entry);
                buffer.push(entry);
            }
        }
    }

    log::info!("Log stream closed");
    Ok(())
}
