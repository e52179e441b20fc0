use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use jiff::Timestamp;
use serde::Serialize;

/// Severity of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Level {
    Info,
    Warn,
    Error,
}

/// One recorded event
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: Timestamp,
    pub level: Level,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

/// Handle returned by [`Logger::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&LogEntry) + Send + Sync>;

/// Bounded, append-only structured log shared across the process
///
/// Cloning is cheap and every clone appends to the same buffer. When the
/// buffer is full the oldest entry is evicted.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

struct Inner {
    capacity: usize,
    entries: Mutex<VecDeque<LogEntry>>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
}

impl Logger {
    /// Default number of retained entries
    pub const DEFAULT_CAPACITY: usize = 500;

    /// Create a logger retaining at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);

        Self {
            inner: Arc::new(Inner {
                capacity,
                entries: Mutex::new(VecDeque::with_capacity(capacity)),
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Maximum retained entries
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Append an entry, mirror it to `tracing` and notify subscribers
    pub fn record(&self, level: Level, message: impl Into<String>, extra: Option<serde_json::Value>) {
        let entry = LogEntry {
            timestamp: Timestamp::now(),
            level,
            message: message.into(),
            extra,
        };

        mirror(&entry);

        {
            let mut entries = self.inner.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if entries.len() == self.inner.capacity {
                entries.pop_front();
            }
            entries.push_back(entry.clone());
        }

        // Listeners run outside the buffer lock so they may read the log
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(&entry))).is_err() {
                tracing::warn!("log subscriber panicked; entry delivered to remaining subscribers");
            }
        }
    }

    pub fn info(&self, message: impl Into<String>, extra: Option<serde_json::Value>) {
        self.record(Level::Info, message, extra);
    }

    pub fn warn(&self, message: impl Into<String>, extra: Option<serde_json::Value>) {
        self.record(Level::Warn, message, extra);
    }

    pub fn error(&self, message: impl Into<String>, extra: Option<serde_json::Value>) {
        self.record(Level::Error, message, extra);
    }

    /// Register a listener invoked synchronously for every new entry
    ///
    /// A panicking listener is isolated; logging and other listeners
    /// continue.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&LogEntry) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener; returns whether it was registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.inner.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Copy of the buffer, oldest first
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Drop every buffered entry
    pub fn clear(&self) {
        self.inner.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn len(&self) -> usize {
        self.inner.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("capacity", &self.inner.capacity)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Forward an entry to the `tracing` console at the matching severity
fn mirror(entry: &LogEntry) {
    let extra = entry.extra.as_ref().map(ToString::to_string);

    match entry.level {
        Level::Info => tracing::info!(target: "fieldnote::log", extra = extra.as_deref(), "{}", entry.message),
        Level::Warn => tracing::warn!(target: "fieldnote::log", extra = extra.as_deref(), "{}", entry.message),
        Level::Error => tracing::error!(target: "fieldnote::log", extra = extra.as_deref(), "{}", entry.message),
    }
}
