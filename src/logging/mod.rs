// Logging module - warning capture for end-of-run summaries
//
// The library reports skipped input (malformed patch lines, unknown element
// types, missing renderers) through `tracing::warn!`. This layer keeps those
// warnings in a bounded buffer so the CLI can summarise them after a render
// instead of leaving them scattered through stderr.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Maximum number of warnings to keep in memory
const MAX_ENTRIES: usize = 200;

/// A single warning or error captured from tracing
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    /// The tracing target (module path)
    pub target: String,
    pub message: String,
}

/// Severity of a captured entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
}

impl LogLevel {
    fn from_level(level: &Level) -> Option<Self> {
        match *level {
            Level::ERROR => Some(Self::Error),
            Level::WARN => Some(Self::Warn),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
        }
    }
}

#[derive(Default)]
struct Collected {
    entries: VecDeque<LogEntry>,
    /// Total seen, including entries evicted from the buffer
    total: usize,
}

/// Bounded buffer of warnings, shared between the layer and the CLI
#[derive(Clone, Default)]
pub struct WarningCollector {
    inner: Arc<Mutex<Collected>>,
}

impl WarningCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Collected> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add an entry, evicting the oldest when full
    pub fn add(&self, entry: LogEntry) {
        let mut collected = self.lock();
        if collected.entries.len() >= MAX_ENTRIES {
            collected.entries.pop_front();
        }
        collected.entries.push_back(entry);
        collected.total += 1;
    }

    /// Retained entries (most recent last)
    #[allow(dead_code)]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().entries.iter().cloned().collect()
    }

    /// Every warning seen since the last clear
    pub fn total(&self) -> usize {
        self.lock().total
    }

    #[allow(dead_code)]
    pub fn clear(&self) {
        let mut collected = self.lock();
        collected.entries.clear();
        collected.total = 0;
    }

    /// Tracing layer feeding this collector
    pub fn layer(&self) -> WarningLayer {
        WarningLayer {
            collector: self.clone(),
        }
    }

    /// Human-readable summary, or `None` when nothing was collected
    pub fn summary(&self, limit: usize) -> Option<String> {
        let collected = self.lock();
        if collected.total == 0 {
            return None;
        }

        let mut out = format!("{} warning(s) while processing:\n", collected.total);
        let skip = collected.entries.len().saturating_sub(limit);
        if skip > 0 || collected.total > collected.entries.len() {
            out.push_str(&format!(
                "  ... {} earlier warning(s) omitted\n",
                collected.total - collected.entries.len() + skip
            ));
        }
        for entry in collected.entries.iter().skip(skip) {
            out.push_str(&format!(
                "  {} [{}] {}: {}\n",
                entry.timestamp.format("%H:%M:%S"),
                entry.level.as_str(),
                entry.target,
                entry.message
            ));
        }
        Some(out)
    }
}

/// Tracing layer that records WARN and ERROR events
pub struct WarningLayer {
    collector: WarningCollector,
}

impl<S> Layer<S> for WarningLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let Some(level) = LogLevel::from_level(metadata.level()) else {
            return;
        };

        let mut message = String::new();
        let mut visitor = MessageVisitor(&mut message);
        event.record(&mut visitor);

        self.collector.add(LogEntry {
            timestamp: Utc::now(),
            level,
            target: metadata.target().to_string(),
            message,
        });
    }
}

/// Visitor to extract the message from a tracing event
struct MessageVisitor<'a>(&'a mut String);

impl tracing::field::Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.0 = format!("{:?}", value);
            // Remove the quotes that Debug adds
            if self.0.starts_with('"') && self.0.ends_with('"') && self.0.len() >= 2 {
                *self.0 = self.0[1..self.0.len() - 1].to_string();
            }
        }
    }
}
