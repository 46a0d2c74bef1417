//! Observability sink for mapper events.
//!
//! The mapper reports skipped entries, conflicts and archive failures through
//! an [`EventSink`] handed to it at construction. [`TracingSink`] forwards
//! events to `tracing`; [`MemorySink`] keeps them for inspection.

use std::fmt;

use parking_lot::Mutex;

/// Severity of a mapper event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventLevel {
    /// Routine progress (archive loaded, entry shadowed).
    Info,

    /// Something was skipped (path conflict, unreadable archive).
    Warning,

    /// An unexpected failure.
    Exception,
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventLevel::Info => write!(f, "info"),
            EventLevel::Warning => write!(f, "warning"),
            EventLevel::Exception => write!(f, "exception"),
        }
    }
}

/// One reported event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub level: EventLevel,

    /// Human-readable description.
    pub message: String,

    /// Archive the event concerns, if any.
    pub archive: Option<String>,

    /// Archive entry the event concerns, if any.
    pub entry: Option<String>,
}

impl Event {
    /// Create an event with no archive or entry attached.
    pub fn new(level: EventLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            archive: None,
            entry: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Warning, message)
    }

    pub fn exception(message: impl Into<String>) -> Self {
        Self::new(EventLevel::Exception, message)
    }

    /// Attach the archive this event concerns.
    pub fn with_archive(mut self, archive: impl Into<String>) -> Self {
        self.archive = Some(archive.into());
        self
    }

    /// Attach the archive entry this event concerns.
    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = Some(entry.into());
        self
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// Receives mapper events.
pub trait EventSink: Send + Sync + fmt::Debug {
    fn emit(&self, event: Event);
}

/// Forwards events to `tracing`.
///
/// Info events become `info!`, warnings `warn!`, exceptions `error!`. The
/// archive and entry are attached as structured fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: Event) {
        let archive = event.archive.as_deref().unwrap_or("");
        let entry = event.entry.as_deref().unwrap_or("");
        match event.level {
            EventLevel::Info => {
                tracing::info!(archive = %archive, entry = %entry, "{}", event.message)
            }
            EventLevel::Warning => {
                tracing::warn!(archive = %archive, entry = %entry, "{}", event.message)
            }
            EventLevel::Exception => {
                tracing::error!(archive = %archive, entry = %entry, "{}", event.message)
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: Event) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Messages of events at the given level, in emission order.
    pub fn messages(&self, level: EventLevel) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.level == level)
            .map(|e| e.message.clone())
            .collect()
    }

    /// Number of events at the given level.
    pub fn count(&self, level: EventLevel) -> usize {
        self.events.lock().iter().filter(|e| e.level == level).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: Event) {
        self.events.lock().push(event);
    }
}
