use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use skiff_core::{ActivityEvent, ArchiveClient, ArchiveError, ListOptions};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::notify::{ChangeListener, ChangeNotifier, NotifyTrigger};

// how often a full stat listing corrects the optimistic counters
const STATS_RESCAN_INTERVAL: Duration = Duration::from_secs(10);

// how much time to wait between coalesced 'changed' deliveries
const EMIT_CHANGED_WAIT: Duration = Duration::from_millis(30);

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("archive gateway error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("monitor was destroyed")]
    Destroyed,
}

#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    pub rescan_interval: Duration,
    pub notify_quantum: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            rescan_interval: STATS_RESCAN_INTERVAL,
            notify_quantum: EMIT_CHANGED_WAIT,
        }
    }
}

struct MonitorInner {
    client: ArchiveClient,
    downloaded: AtomicU64,
    blocks: AtomicU64,
    rescan_in_flight: AtomicBool,
    changed: NotifyTrigger,
}

impl MonitorInner {
    /// The activity feed does not say which file a block belongs to, so the
    /// count is bumped unconditionally; the next rescan corrects any drift.
    fn record_download(&self) {
        self.downloaded.fetch_add(1, Ordering::Relaxed);
        self.changed.trigger();
    }

    /// Authoritative correction step: the listing's totals overwrite the
    /// optimistic counters. Single-flight — a call that lands while another
    /// is awaiting the listing returns without touching anything.
    async fn rescan(&self) -> Result<(), ArchiveError> {
        if self.rescan_in_flight.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let result = self
            .client
            .list_directory(
                "/",
                ListOptions {
                    recursive: true,
                    include_stat: true,
                },
            )
            .await;
        self.rescan_in_flight.store(false, Ordering::SeqCst);

        let entries = result?;
        let mut downloaded = 0u64;
        let mut blocks = 0u64;
        for stat in entries.iter().filter_map(|entry| entry.stat.as_ref()) {
            downloaded += stat.downloaded;
            blocks += stat.blocks;
        }
        self.downloaded.store(downloaded, Ordering::SeqCst);
        self.blocks.store(blocks, Ordering::SeqCst);
        self.changed.trigger();
        Ok(())
    }
}

/// Eventually-consistent view of one archive's download completion: a
/// recurring full rescan plus optimistic per-event increments in between.
pub struct ProgressMonitor {
    inner: Arc<MonitorInner>,
    notifier: ChangeNotifier,
    rescan_interval: Duration,
    timer: Option<JoinHandle<()>>,
    events: Option<JoinHandle<()>>,
    started: bool,
    destroyed: bool,
}

impl ProgressMonitor {
    pub fn new(client: ArchiveClient) -> Self {
        Self::with_config(client, MonitorConfig::default())
    }

    pub fn with_config(client: ArchiveClient, config: MonitorConfig) -> Self {
        let notifier = ChangeNotifier::new(config.notify_quantum);
        let inner = Arc::new(MonitorInner {
            client,
            downloaded: AtomicU64::new(0),
            blocks: AtomicU64::new(0),
            rescan_in_flight: AtomicBool::new(false),
            changed: notifier.handle(),
        });
        Self {
            inner,
            notifier,
            rescan_interval: config.rescan_interval,
            timer: None,
            events: None,
            started: false,
            destroyed: false,
        }
    }

    /// Rescans once so `current` reflects real state before returning, then
    /// subscribes to download notifications and schedules recurring rescans.
    /// Listing or subscription failures surface to the caller; a started
    /// monitor is left untouched by repeat calls.
    pub async fn start(&mut self) -> Result<(), MonitorError> {
        if self.destroyed {
            return Err(MonitorError::Destroyed);
        }
        if self.started {
            return Ok(());
        }

        self.inner.rescan().await?;
        let mut activity = self.inner.client.subscribe_activity().await?;

        let inner = Arc::clone(&self.inner);
        self.events = Some(tokio::spawn(async move {
            loop {
                match activity.recv().await {
                    Ok(Some(ActivityEvent::Download { .. })) => inner.record_download(),
                    Ok(Some(_)) => {}
                    Ok(None) => break,
                    Err(err) => {
                        log::warn!("activity feed error: {err}");
                        break;
                    }
                }
            }
        }));

        let inner = Arc::clone(&self.inner);
        let interval = self.rescan_interval;
        self.timer = Some(tokio::spawn(async move {
            let mut ticks = tokio::time::interval(interval);
            // the first tick fires immediately; start() already rescanned
            ticks.tick().await;
            loop {
                ticks.tick().await;
                if let Err(err) = inner.rescan().await {
                    log::warn!("stats rescan failed: {err}");
                }
            }
        }));

        self.started = true;
        Ok(())
    }

    pub async fn rescan(&self) -> Result<(), MonitorError> {
        if self.destroyed {
            return Err(MonitorError::Destroyed);
        }
        Ok(self.inner.rescan().await?)
    }

    /// Completion percentage, clamped to 0..=100. An archive with no known
    /// blocks reports 0 regardless of the optimistic count.
    pub fn current(&self) -> u8 {
        let blocks = self.inner.blocks.load(Ordering::SeqCst);
        if blocks == 0 {
            return 0;
        }
        let downloaded = self.inner.downloaded.load(Ordering::SeqCst);
        let percent = (downloaded as f64 / blocks as f64 * 100.0).round() as u64;
        percent.min(100) as u8
    }

    pub fn is_complete(&self) -> bool {
        let blocks = self.inner.blocks.load(Ordering::SeqCst);
        self.inner.downloaded.load(Ordering::SeqCst) >= blocks
    }

    pub fn subscribe(&self) -> ChangeListener {
        self.notifier.subscribe()
    }

    /// Stops the rescan timer and the activity consumer and closes the
    /// changed signal. Idempotent; the monitor cannot be restarted.
    pub fn destroy(&mut self) {
        if let Some(task) = self.timer.take() {
            task.abort();
        }
        if let Some(task) = self.events.take() {
            task.abort();
        }
        self.notifier.close();
        self.destroyed = true;
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        self.destroy();
    }
}
