//! Deduplicating set of paths waiting for the next organization pass.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Paths accepted since the last flush, plus the time of the latest one.
///
/// Repeated notifications for the same path collapse into one entry; the
/// buffer records presence only, never the event kind or order.
#[derive(Debug, Default)]
pub struct EventBuffer {
    pending: HashSet<PathBuf>,
    last_event: Option<Instant>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts a path at `now`. Returns true if the path was not already pending.
    pub fn insert(&mut self, path: &Path, now: Instant) -> bool {
        self.last_event = Some(now);
        self.pending.insert(path.to_path_buf())
    }

    /// Number of distinct pending paths.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.pending.contains(path)
    }

    /// Time of the most recently accepted event, if any.
    pub fn last_event(&self) -> Option<Instant> {
        self.last_event
    }

    /// Time elapsed between the last accepted event and `now`.
    ///
    /// Zero when no event was ever accepted or `now` is earlier than it.
    pub fn idle_for(&self, now: Instant) -> Duration {
        self.last_event
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or_default()
    }

    /// Empties the buffer and hands back what was pending.
    ///
    /// `last_event` is kept, so a flush never resets the silence clock.
    pub fn drain(&mut self) -> Vec<PathBuf> {
        self.pending.drain().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_collapse() {
        let mut buffer = EventBuffer::new();
        let now = Instant::now();

        assert!(buffer.insert(Path::new("/dl/a.jpg"), now));
        assert!(!buffer.insert(Path::new("/dl/a.jpg"), now));
        assert!(buffer.insert(Path::new("/dl/b.jpg"), now));

        assert_eq!(buffer.len(), 2);
        assert!(buffer.contains(Path::new("/dl/a.jpg")));
    }

    #[test]
    fn test_duplicate_still_refreshes_last_event() {
        let mut buffer = EventBuffer::new();
        let start = Instant::now();
        let later = start + Duration::from_secs(30);

        buffer.insert(Path::new("/dl/a.jpg"), start);
        buffer.insert(Path::new("/dl/a.jpg"), later);

        assert_eq!(buffer.last_event(), Some(later));
        assert_eq!(buffer.idle_for(later + Duration::from_secs(5)), Duration::from_secs(5));
    }

    #[test]
    fn test_drain_empties_buffer() {
        let mut buffer = EventBuffer::new();
        let now = Instant::now();
        buffer.insert(Path::new("/dl/a.jpg"), now);
        buffer.insert(Path::new("/dl/b.pdf"), now);

        let mut drained = buffer.drain();
        drained.sort();

        assert_eq!(
            drained,
            vec![PathBuf::from("/dl/a.jpg"), PathBuf::from("/dl/b.pdf")]
        );
        assert!(buffer.is_empty());
        assert_eq!(buffer.last_event(), Some(now));
    }

    #[test]
    fn test_idle_for_without_events() {
        let buffer = EventBuffer::new();
        assert_eq!(buffer.idle_for(Instant::now()), Duration::ZERO);
    }
}
