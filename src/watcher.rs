//! Directory watching and the trigger loop.
//!
//! [`DirectoryWatcher`] wraps a non-recursive `notify` watcher and forwards
//! every relevant notification into a channel. [`run`] is the single consumer
//! of that channel: it owns the [`Scheduler`], checks the silence condition on
//! a fixed tick and runs organization passes one at a time. A pass runs on the
//! blocking pool and is awaited, so events that arrive meanwhile wait in the
//! channel and count toward the next cycle.

use crate::events::WatchEvent;
use crate::file_organizer::{Organize, PassReport};
use crate::scheduler::{Scheduler, Trigger};
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Errors raised while setting up the watch. Fatal at startup.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to create file watcher: {0}")]
    Init(#[source] notify::Error),

    #[error("failed to watch {}: {source}", .path.display())]
    Register {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Non-recursive watch on one directory.
///
/// Notifications stop when this value is dropped.
pub struct DirectoryWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl DirectoryWatcher {
    /// Starts watching `root`, sending converted events to `sender`.
    ///
    /// # Errors
    ///
    /// Returns `WatchError` if the watcher cannot be created or the directory
    /// cannot be watched.
    pub fn start(root: &Path, sender: UnboundedSender<WatchEvent>) -> Result<Self, WatchError> {
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| Self::handle_raw_event(res, &sender),
            Config::default(),
        )
        .map_err(WatchError::Init)?;

        watcher
            .watch(root, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Register {
                path: root.to_path_buf(),
                source,
            })?;

        debug!("Started watching directory: {:?}", root);
        Ok(Self {
            _watcher: watcher,
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn handle_raw_event(res: notify::Result<Event>, sender: &UnboundedSender<WatchEvent>) {
        match res {
            Ok(event) => {
                for converted in convert_event(&event) {
                    if sender.send(converted).is_err() {
                        debug!("Scheduler stopped, dropping event {:?}", event.kind);
                        return;
                    }
                }
            }
            Err(e) => {
                error!("File system watcher error: {}", e);
            }
        }
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        debug!("Stopped watching directory: {:?}", self.root);
    }
}

/// Converts a raw `notify` event into scheduler events.
///
/// Creates, content/metadata changes and renames are kept; a rename is
/// reported by its destination. Removals, accesses and the source half of a
/// split rename are dropped. Directory-ness is sampled here, at conversion
/// time.
pub fn convert_event(event: &Event) -> Vec<WatchEvent> {
    match event.kind {
        EventKind::Create(_) => event
            .paths
            .iter()
            .map(|path| WatchEvent::Created {
                path: path.clone(),
                is_dir: path.is_dir(),
            })
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [from, to, ..] => vec![WatchEvent::Moved {
                from: Some(from.clone()),
                to: to.clone(),
                is_dir: to.is_dir(),
            }],
            _ => Vec::new(),
        },
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Vec::new(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event
            .paths
            .iter()
            .map(|to| WatchEvent::Moved {
                from: None,
                to: to.clone(),
                is_dir: to.is_dir(),
            })
            .collect(),
        // Some backends cannot tell the two halves apart; keep whichever side still exists.
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .filter(|path| path.exists())
            .map(|to| WatchEvent::Moved {
                from: None,
                to: to.clone(),
                is_dir: to.is_dir(),
            })
            .collect(),
        EventKind::Modify(_) => event
            .paths
            .iter()
            .map(|path| WatchEvent::Modified {
                path: path.clone(),
                is_dir: path.is_dir(),
            })
            .collect(),
        EventKind::Remove(_) | EventKind::Access(_) | EventKind::Any | EventKind::Other => {
            Vec::new()
        }
    }
}

/// Counters for one run of the trigger loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Organization passes executed, startup pass included.
    pub passes: usize,
    /// Events received from the watcher.
    pub events: usize,
}

/// Runs the trigger loop until `shutdown` resolves or the event channel closes.
///
/// The startup pass runs before anything else. After that, every received
/// event is fed to the scheduler and the silence condition is polled at the
/// scheduler's poll interval. `on_pass` is called after every pass.
pub async fn run<O, S, F>(
    mut scheduler: Scheduler,
    organizer: Arc<O>,
    mut events: UnboundedReceiver<WatchEvent>,
    shutdown: S,
    mut on_pass: F,
) -> RunStats
where
    O: Organize + Send + Sync + 'static,
    S: Future<Output = ()>,
    F: FnMut(Trigger, &PassReport),
{
    let mut stats = RunStats::default();

    if let Some(trigger) = scheduler.startup() {
        info!("=== Fresh start: organizing existing files ===");
        run_pass(&mut scheduler, &organizer, trigger, &mut on_pass).await;
        stats.passes += 1;
    }

    let mut ticker = tokio::time::interval(scheduler.config().poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    tokio::pin!(shutdown);

    loop {
        let trigger = tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Shutdown requested, stopping watcher");
                break;
            }
            event = events.recv() => match event {
                Some(event) => {
                    stats.events += 1;
                    scheduler.record(&event, Instant::now())
                }
                None => {
                    info!("Event channel closed, stopping");
                    break;
                }
            },
            _ = ticker.tick() => scheduler.poll(Instant::now()),
        };

        if let Some(trigger) = trigger {
            run_pass(&mut scheduler, &organizer, trigger, &mut on_pass).await;
            stats.passes += 1;
        }
    }

    if scheduler.pending() > 0 {
        info!(
            pending = scheduler.pending(),
            "Leaving pending files for the next startup pass"
        );
    }
    stats
}

async fn run_pass<O, F>(
    scheduler: &mut Scheduler,
    organizer: &Arc<O>,
    trigger: Trigger,
    on_pass: &mut F,
) where
    O: Organize + Send + Sync + 'static,
    F: FnMut(Trigger, &PassReport),
{
    info!("--- {}: organizing now ---", trigger);

    let organizer = Arc::clone(organizer);
    let report = match tokio::task::spawn_blocking(move || organizer.organize()).await {
        Ok(report) => report,
        Err(e) => {
            error!("Organization pass did not finish: {}", e);
            PassReport::default()
        }
    };

    scheduler.complete();
    on_pass(trigger, &report);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_category::TempFileFilter;
    use crate::scheduler::TriggerConfig;
    use notify::event::{CreateKind, DataChange, RemoveKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc::unbounded_channel;

    #[derive(Default)]
    struct CountingOrganizer {
        passes: AtomicUsize,
    }

    impl Organize for CountingOrganizer {
        fn organize(&self) -> PassReport {
            self.passes.fetch_add(1, Ordering::SeqCst);
            PassReport::default()
        }
    }

    fn scheduler(timeout: Duration, poll_interval: Duration) -> Scheduler {
        Scheduler::new(
            TriggerConfig {
                batch_size: 10,
                timeout,
                poll_interval,
            },
            TempFileFilter::default(),
        )
    }

    #[test]
    fn test_convert_create_and_modify() {
        let event = Event::new(EventKind::Create(CreateKind::File)).add_path("/dl/a.jpg".into());
        assert_eq!(convert_event(&event), vec![WatchEvent::created("/dl/a.jpg")]);

        let event = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path("/dl/a.jpg".into());
        assert_eq!(convert_event(&event), vec![WatchEvent::modified("/dl/a.jpg")]);
    }

    #[test]
    fn test_convert_rename_uses_destination() {
        let event = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path("/dl/a.crdownload".into())
            .add_path("/dl/a.zip".into());
        assert_eq!(
            convert_event(&event),
            vec![WatchEvent::moved("/dl/a.crdownload", "/dl/a.zip")]
        );

        let event = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
            .add_path("/dl/b.zip".into());
        assert_eq!(
            convert_event(&event),
            vec![WatchEvent::Moved {
                from: None,
                to: PathBuf::from("/dl/b.zip"),
                is_dir: false
            }]
        );

        let event = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::From)))
            .add_path("/dl/c.zip".into());
        assert!(convert_event(&event).is_empty());
    }

    #[test]
    fn test_convert_ignores_removals() {
        let event = Event::new(EventKind::Remove(RemoveKind::File)).add_path("/dl/a.jpg".into());
        assert!(convert_event(&event).is_empty());
    }

    #[tokio::test]
    async fn test_startup_then_batch_trigger() {
        let organizer = Arc::new(CountingOrganizer::default());
        let (tx, rx) = unbounded_channel();

        for n in 0..10 {
            tx.send(WatchEvent::created(format!("/dl/file{n}.pdf"))).unwrap();
        }
        drop(tx);

        let mut triggers = Vec::new();
        let stats = run(
            scheduler(Duration::from_secs(300), Duration::from_secs(1)),
            Arc::clone(&organizer),
            rx,
            std::future::pending(),
            |trigger, _| triggers.push(trigger),
        )
        .await;

        assert_eq!(stats, RunStats { passes: 2, events: 10 });
        assert_eq!(organizer.passes.load(Ordering::SeqCst), 2);
        assert_eq!(
            triggers,
            vec![Trigger::Startup, Trigger::BatchFull { pending: 10 }]
        );
    }

    #[tokio::test]
    async fn test_silence_trigger_fires_once() {
        let organizer = Arc::new(CountingOrganizer::default());
        let (tx, rx) = unbounded_channel();
        tx.send(WatchEvent::created("/dl/a.jpg")).unwrap();

        let stats = run(
            scheduler(Duration::from_millis(100), Duration::from_millis(20)),
            Arc::clone(&organizer),
            rx,
            tokio::time::sleep(Duration::from_millis(600)),
            |_, _| {},
        )
        .await;

        // Keep the sender alive for the whole run.
        drop(tx);
        assert_eq!(stats.passes, 2);
        assert_eq!(organizer.passes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop() {
        let organizer = Arc::new(CountingOrganizer::default());
        let (_tx, rx) = unbounded_channel::<WatchEvent>();

        let stats = run(
            scheduler(Duration::from_secs(300), Duration::from_secs(1)),
            organizer,
            rx,
            async {},
            |_, _| {},
        )
        .await;

        assert_eq!(stats, RunStats { passes: 1, events: 0 });
    }
}
