//! Live pipeline log, fanned out to SSE subscribers.
//!
//! Every upload step is published on a global broadcast channel. Entries are
//! echoed to stdout and serialized as `{"level", "message", "indent"}` for
//! `GET /api/logs`. Subscribers that fall behind lose the oldest entries.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

/// Entries buffered per lagging subscriber.
const CHANNEL_CAPACITY: usize = 100;

/// Severity shown by the log viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One published log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth for sub-steps
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            indent: 0,
        }
    }

    pub fn nested(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.level {
            LogLevel::Info => "  ",
            LogLevel::Success => "✓ ",
            LogLevel::Warning => "⚠️ ",
            LogLevel::Error => "❌",
        };
        write!(f, "{}{} {}", "   ".repeat(self.indent as usize + 1), marker, self.message)
    }
}

/// Global log broadcaster
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::default);

/// Publishes entries to stdout and every live subscriber
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
}

impl LogBroadcaster {
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an entry. Returns how many subscribers received it.
    pub fn publish(&self, entry: LogEntry) -> usize {
        println!("{}", entry);
        self.sender.send(entry).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }
}

pub fn info(message: impl Into<String>) {
    LOG_BROADCASTER.publish(LogEntry::new(LogLevel::Info, message));
}

pub fn success(message: impl Into<String>) {
    LOG_BROADCASTER.publish(LogEntry::new(LogLevel::Success, message));
}

pub fn warning(message: impl Into<String>) {
    LOG_BROADCASTER.publish(LogEntry::new(LogLevel::Warning, message));
}

pub fn error(message: impl Into<String>) {
    LOG_BROADCASTER.publish(LogEntry::new(LogLevel::Error, message));
}

/// Info entry one level deep
pub fn detail(message: impl Into<String>) {
    LOG_BROADCASTER.publish(LogEntry::new(LogLevel::Info, message).nested(1));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let entry = LogEntry::new(LogLevel::Success, "Report ready").nested(1);
        assert_eq!(
            serde_json::to_string(&entry).unwrap(),
            r#"{"level":"success","message":"Report ready","indent":1}"#
        );
    }

    #[tokio::test]
    async fn test_subscribers_receive_entries() {
        let broadcaster = LogBroadcaster::with_capacity(4);
        assert_eq!(broadcaster.publish(LogEntry::new(LogLevel::Info, "nobody listening")), 0);

        let mut rx = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 1);
        assert_eq!(broadcaster.publish(LogEntry::new(LogLevel::Warning, "heads up")), 1);
        let entry = rx.recv().await.unwrap();
        assert_eq!(entry.level, LogLevel::Warning);
        assert_eq!(entry.message, "heads up");

        drop(rx);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
