//! Batch-trigger scheduler.
//!
//! The scheduler decides when an organization pass should run. It fires:
//! - once, unconditionally, at startup;
//! - when the number of distinct pending paths reaches the batch size;
//! - when pending paths exist and no event was accepted for the timeout.
//!
//! It is a plain state machine driven with explicit [`Instant`]s, so the
//! caller owns the clock. Every returned [`Trigger`] moves the scheduler into
//! the flushing state and drains the buffer; the caller runs exactly one pass
//! and then calls [`Scheduler::complete`]. No trigger fires while flushing, so
//! two conditions that become true together produce a single pass.

use crate::buffer::EventBuffer;
use crate::events::WatchEvent;
use crate::file_category::TempFileFilter;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// Thresholds for the two triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerConfig {
    /// Distinct pending paths that trigger a pass.
    pub batch_size: usize,
    /// Silence after the last accepted event that triggers a pass.
    pub timeout: Duration,
    /// How often the silence condition is checked.
    pub poll_interval: Duration,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Why a pass was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The one pass run when the process starts.
    Startup,
    /// The buffer reached the batch size.
    BatchFull { pending: usize },
    /// No event arrived for at least the timeout.
    Silence { pending: usize, idle: Duration },
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Startup => write!(f, "startup"),
            Trigger::BatchFull { pending } => write!(f, "batch limit reached ({pending} files)"),
            Trigger::Silence { pending, idle } => {
                write!(f, "silence for {}s ({pending} files)", idle.as_secs())
            }
        }
    }
}

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for a trigger condition.
    Idle,
    /// A pass is running.
    Flushing,
}

/// What happened to an incoming event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Added to the buffer, or refreshed an already pending path.
    Accepted { pending: usize },
    /// The event was for a directory.
    IgnoredDirectory,
    /// The path carries a temp suffix.
    IgnoredTemporary,
}

/// Decides when passes run. See the module docs for the trigger rules.
#[derive(Debug)]
pub struct Scheduler {
    config: TriggerConfig,
    temp_filter: TempFileFilter,
    buffer: EventBuffer,
    state: SchedulerState,
    started: bool,
}

impl Scheduler {
    pub fn new(config: TriggerConfig, temp_filter: TempFileFilter) -> Self {
        Self {
            config,
            temp_filter,
            buffer: EventBuffer::new(),
            state: SchedulerState::Idle,
            started: false,
        }
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Distinct paths waiting for the next pass.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Fires the startup pass. Returns `Some` exactly once.
    ///
    /// # Example
    ///
    /// ```
    /// use tidywatch::{Scheduler, TempFileFilter, Trigger, TriggerConfig};
    ///
    /// let mut scheduler = Scheduler::new(TriggerConfig::default(), TempFileFilter::default());
    /// assert_eq!(scheduler.startup(), Some(Trigger::Startup));
    /// scheduler.complete();
    /// assert_eq!(scheduler.startup(), None);
    /// ```
    pub fn startup(&mut self) -> Option<Trigger> {
        if self.started || self.state == SchedulerState::Flushing {
            return None;
        }
        self.started = true;
        Some(self.begin_flush(Trigger::Startup))
    }

    /// Filters an event into the buffer, then checks the count condition.
    ///
    /// Directory and temp-file events are dropped. Before [`startup`] has
    /// fired, events are buffered but never trigger.
    ///
    /// # Arguments
    ///
    /// * `event` - The converted filesystem notification
    /// * `now` - When the event was received
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::{Duration, Instant};
    /// use tidywatch::{Scheduler, TempFileFilter, Trigger, TriggerConfig, WatchEvent};
    ///
    /// let config = TriggerConfig {
    ///     batch_size: 2,
    ///     timeout: Duration::from_secs(300),
    ///     poll_interval: Duration::from_secs(1),
    /// };
    /// let mut scheduler = Scheduler::new(config, TempFileFilter::default());
    /// scheduler.startup();
    /// scheduler.complete();
    ///
    /// let now = Instant::now();
    /// assert_eq!(scheduler.record(&WatchEvent::created("/dl/a.jpg"), now), None);
    /// assert_eq!(scheduler.record(&WatchEvent::created("/dl/a.part"), now), None);
    /// assert_eq!(
    ///     scheduler.record(&WatchEvent::created("/dl/b.pdf"), now),
    ///     Some(Trigger::BatchFull { pending: 2 })
    /// );
    /// ```
    ///
    /// [`startup`]: Scheduler::startup
    pub fn record(&mut self, event: &WatchEvent, now: Instant) -> Option<Trigger> {
        match self.admit(event, now) {
            Admission::Accepted { pending } => self.check_batch(pending),
            Admission::IgnoredDirectory | Admission::IgnoredTemporary => None,
        }
    }

    /// Filters an event into the buffer without evaluating any trigger.
    pub fn admit(&mut self, event: &WatchEvent, now: Instant) -> Admission {
        let path = event.path();
        if event.is_dir() {
            return Admission::IgnoredDirectory;
        }
        if self.temp_filter.is_temp_file(path) {
            debug!(path = %path.display(), "ignoring temp file");
            return Admission::IgnoredTemporary;
        }

        self.buffer.insert(path, now);
        let pending = self.buffer.len();
        debug!(
            kind = event.kind(),
            path = %path.display(),
            "Buffer: {}/{} files waiting",
            pending,
            self.config.batch_size
        );
        Admission::Accepted { pending }
    }

    fn check_batch(&mut self, pending: usize) -> Option<Trigger> {
        if !self.started || self.state != SchedulerState::Idle {
            return None;
        }
        if pending >= self.config.batch_size {
            return Some(self.begin_flush(Trigger::BatchFull { pending }));
        }
        None
    }

    /// Checks the silence condition. Called on every poll tick.
    ///
    /// Fires when paths are pending and nothing was accepted for at least the
    /// timeout. Fires once: the buffer is drained with the trigger.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::{Duration, Instant};
    /// use tidywatch::{Scheduler, TempFileFilter, Trigger, TriggerConfig, WatchEvent};
    ///
    /// let mut scheduler = Scheduler::new(TriggerConfig::default(), TempFileFilter::default());
    /// scheduler.startup();
    /// scheduler.complete();
    ///
    /// let start = Instant::now();
    /// scheduler.record(&WatchEvent::created("/dl/a.jpg"), start);
    /// assert_eq!(scheduler.poll(start + Duration::from_secs(299)), None);
    ///
    /// let later = start + Duration::from_secs(300);
    /// assert!(matches!(scheduler.poll(later), Some(Trigger::Silence { pending: 1, .. })));
    /// scheduler.complete();
    /// assert_eq!(scheduler.poll(later + Duration::from_secs(1)), None);
    /// ```
    pub fn poll(&mut self, now: Instant) -> Option<Trigger> {
        if !self.started || self.state != SchedulerState::Idle || self.buffer.is_empty() {
            return None;
        }

        let idle = self.buffer.idle_for(now);
        if idle >= self.config.timeout {
            let pending = self.buffer.len();
            return Some(self.begin_flush(Trigger::Silence { pending, idle }));
        }
        None
    }

    fn begin_flush(&mut self, trigger: Trigger) -> Trigger {
        self.state = SchedulerState::Flushing;
        let drained = self.buffer.drain();
        debug!(%trigger, drained = drained.len(), "flushing event buffer");
        trigger
    }

    /// Marks the running pass as finished.
    pub fn complete(&mut self) {
        self.state = SchedulerState::Idle;
    }
}
