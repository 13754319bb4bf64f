//! Looper configuration.

use std::time::Duration;

/// Configuration for a [`Looper`](super::Looper).
#[derive(Debug, Clone)]
pub struct LooperConfig {
    /// Human-readable name, used in logs.
    pub name: String,
    /// Name of the dedicated worker thread. Derived from `name` when `None`.
    pub thread_name: Option<String>,
    /// Upper bound on a single timed wait for a not-yet-due event.
    pub max_wait: Duration,
}

impl Default for LooperConfig {
    fn default() -> Self {
        Self {
            name: "looper".to_string(),
            thread_name: None,
            max_wait: Duration::from_micros((i64::MAX / 1000).unsigned_abs()),
        }
    }
}

impl LooperConfig {
    /// Set the looper name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the worker thread name.
    #[must_use]
    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = Some(thread_name.into());
        self
    }

    /// Set the wait cap.
    #[must_use]
    pub const fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Worker thread name, falling back to `looper-<name>`.
    pub fn worker_thread_name(&self) -> String {
        self.thread_name
            .clone()
            .unwrap_or_else(|| format!("looper-{}", self.name))
    }
}
