//! Uploads the backup automatically once local data has stopped changing for a while.
//!
//! Stores report changes through a `ChangeNotifier`. A background task waits until no change has
//! arrived for the quiescence delay (a trailing-edge debounce) and then uploads once. Uploads run
//! inside that task, so two never overlap; changes that arrive during an upload start a new delay
//! once it finishes.

use crate::error::Error;
use crate::model::Collection;
use crate::sync::UploadOutcome;
use crate::Result;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Performs the upload for `AutoSync`. Implemented by `BackupSync`.
#[async_trait::async_trait]
pub trait Uploader: Send + Sync {
    async fn is_available(&self) -> bool;

    async fn upload(&self) -> Result<UploadOutcome>;
}

/// Why a due upload did not happen.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Disabled,
    Unavailable,
}

serde_plain::derive_display_from_serialize!(SkipReason);

/// Callbacks through which `AutoSync` reports what it does. Nothing fails silently: every due
/// upload ends in exactly one of `on_end`, `on_error` or `on_skipped`.
pub trait SyncHooks: Send + Sync {
    fn on_start(&self);

    fn on_end(&self, outcome: &UploadOutcome);

    fn on_error(&self, error: &Error);

    fn on_skipped(&self, reason: SkipReason);
}

/// `SyncHooks` that write to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHooks;

impl SyncHooks for LogHooks {
    fn on_start(&self) {
        debug!("Auto-sync upload started");
    }

    fn on_end(&self, outcome: &UploadOutcome) {
        info!("Auto-sync uploaded the backup to {}", outcome.path);
    }

    fn on_error(&self, error: &Error) {
        error!("Auto-sync failed: {error:#}");
    }

    fn on_skipped(&self, reason: SkipReason) {
        warn!("Auto-sync skipped: {reason}");
    }
}

#[derive(Debug)]
enum Signal {
    Changed(Collection),
    /// Upload now if a change is pending, then stop.
    Flush(oneshot::Sender<()>),
    /// Stop without uploading pending changes.
    Shutdown,
}

/// Handed to the stores so that they can report changes. A notifier that is not connected to an
/// `AutoSync`, or whose `AutoSync` has stopped, discards changes.
#[derive(Debug, Clone, Default)]
pub struct ChangeNotifier {
    tx: Option<mpsc::UnboundedSender<Signal>>,
}

impl ChangeNotifier {
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Reports that `collection` was written. Only backed-up collections are passed on.
    pub fn notify(&self, collection: Collection) {
        if !collection.is_backed_up() {
            return;
        }
        if let Some(tx) = &self.tx {
            if tx.send(Signal::Changed(collection)).is_err() {
                trace!("Auto-sync has stopped, dropping the change to {collection}");
            }
        }
    }
}

/// The handle of the background auto-sync task. Dropping it stops the task the same way
/// `shutdown` does, without waiting.
pub struct AutoSync {
    tx: mpsc::UnboundedSender<Signal>,
    enabled: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl AutoSync {
    /// Starts the task on the current tokio runtime. Returns the handle and the notifier to give
    /// to the stores.
    pub fn spawn(
        uploader: Arc<dyn Uploader>,
        hooks: Arc<dyn SyncHooks>,
        delay: Duration,
        enabled: bool,
    ) -> (Self, ChangeNotifier) {
        let (tx, rx) = mpsc::unbounded_channel();
        let enabled = Arc::new(AtomicBool::new(enabled));
        let task = tokio::spawn(run(rx, uploader, hooks, delay, enabled.clone()));
        let notifier = ChangeNotifier {
            tx: Some(tx.clone()),
        };
        (
            Self {
                tx,
                enabled,
                task: Some(task),
            },
            notifier,
        )
    }

    pub fn notifier(&self) -> ChangeNotifier {
        ChangeNotifier {
            tx: Some(self.tx.clone()),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Uploads immediately if a change is waiting for its delay, waits for that upload, and stops.
    pub async fn flush(mut self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Signal::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
        self.join().await;
    }

    /// Stops the task. A pending change is dropped and no upload fires afterwards. An upload that
    /// is already running completes first.
    pub async fn shutdown(mut self) {
        let _ = self.tx.send(Signal::Shutdown);
        self.join().await;
    }

    async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("The auto-sync task ended abnormally: {e}");
            }
        }
    }
}

impl Drop for AutoSync {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.tx.send(Signal::Shutdown);
        }
    }
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<Signal>,
    uploader: Arc<dyn Uploader>,
    hooks: Arc<dyn SyncHooks>,
    delay: Duration,
    enabled: Arc<AtomicBool>,
) {
    while let Some(signal) = rx.recv().await {
        match signal {
            Signal::Changed(collection) => debug!("{collection} changed, auto-sync is due"),
            Signal::Flush(done) => {
                let _ = done.send(());
                return;
            }
            Signal::Shutdown => return,
        }

        // Restart the delay on every change until it elapses undisturbed.
        let flush = loop {
            tokio::select! {
                signal = rx.recv() => match signal {
                    Some(Signal::Changed(collection)) => {
                        trace!("{collection} changed, restarting the auto-sync delay");
                    }
                    Some(Signal::Flush(done)) => break Some(done),
                    Some(Signal::Shutdown) | None => {
                        debug!("Auto-sync stopped with a change pending");
                        return;
                    }
                },
                _ = tokio::time::sleep(delay) => break None,
            }
        };

        upload(uploader.as_ref(), hooks.as_ref(), &enabled).await;

        if let Some(done) = flush {
            let _ = done.send(());
            return;
        }
    }
}

async fn upload(uploader: &dyn Uploader, hooks: &dyn SyncHooks, enabled: &AtomicBool) {
    if !enabled.load(Ordering::SeqCst) {
        hooks.on_skipped(SkipReason::Disabled);
        return;
    }
    if !uploader.is_available().await {
        hooks.on_skipped(SkipReason::Unavailable);
        return;
    }
    hooks.on_start();
    match uploader.upload().await {
        Ok(outcome) => hooks.on_end(&outcome),
        Err(e) => hooks.on_error(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::time::{sleep, Instant};

    const DELAY: Duration = Duration::from_millis(500);

    #[derive(Default)]
    struct FakeUploader {
        calls: Mutex<Vec<Instant>>,
        unavailable: AtomicBool,
        fail: AtomicBool,
        busy_for: Mutex<Option<Duration>>,
        running: AtomicUsize,
        max_running: AtomicUsize,
    }

    impl FakeUploader {
        fn calls(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Uploader for FakeUploader {
        async fn is_available(&self) -> bool {
            !self.unavailable.load(Ordering::SeqCst)
        }

        async fn upload(&self) -> Result<UploadOutcome> {
            let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(running, Ordering::SeqCst);
            self.calls.lock().unwrap().push(Instant::now());
            let busy_for = *self.busy_for.lock().unwrap();
            if let Some(busy) = busy_for {
                sleep(busy).await;
            }
            self.running.fetch_sub(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                bail!("network went away");
            }
            Ok(UploadOutcome {
                path: "Backups/subtrack-backup.json".to_string(),
                digest: "abc".to_string(),
                created_at: Utc::now(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingHooks {
        events: Mutex<Vec<String>>,
    }

    impl RecordingHooks {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl SyncHooks for RecordingHooks {
        fn on_start(&self) {
            self.events.lock().unwrap().push("start".to_string());
        }

        fn on_end(&self, _: &UploadOutcome) {
            self.events.lock().unwrap().push("end".to_string());
        }

        fn on_error(&self, error: &Error) {
            self.events.lock().unwrap().push(format!("error: {error}"));
        }

        fn on_skipped(&self, reason: SkipReason) {
            self.events.lock().unwrap().push(format!("skipped: {reason}"));
        }
    }

    fn start(
        enabled: bool,
    ) -> (
        Arc<FakeUploader>,
        Arc<RecordingHooks>,
        AutoSync,
        ChangeNotifier,
    ) {
        let uploader = Arc::new(FakeUploader::default());
        let hooks = Arc::new(RecordingHooks::default());
        let (auto, notifier) = AutoSync::spawn(uploader.clone(), hooks.clone(), DELAY, enabled);
        (uploader, hooks, auto, notifier)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_into_one_upload() {
        let (uploader, hooks, auto, notifier) = start(true);
        let begin = Instant::now();
        notifier.notify(Collection::Subscriptions);
        sleep(Duration::from_millis(100)).await;
        notifier.notify(Collection::Categories);
        sleep(Duration::from_millis(100)).await;
        notifier.notify(Collection::Settings);
        sleep(Duration::from_secs(5)).await;

        let calls = uploader.calls();
        assert_eq!(calls.len(), 1);
        let fired_after = calls[0] - begin;
        assert!(fired_after >= Duration::from_millis(700), "{fired_after:?}");
        assert!(fired_after < Duration::from_millis(750), "{fired_after:?}");
        assert_eq!(hooks.events(), vec!["start", "end"]);
        auto.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_upload_separately() {
        let (uploader, _hooks, auto, notifier) = start(true);
        notifier.notify(Collection::Lists);
        sleep(Duration::from_secs(1)).await;
        notifier.notify(Collection::Lists);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(uploader.calls().len(), 2);
        auto.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reference_data_does_not_trigger() {
        let (uploader, _hooks, auto, notifier) = start(true);
        notifier.notify(Collection::CurrencyRates);
        notifier.notify(Collection::Templates);
        sleep(Duration::from_secs(2)).await;
        assert!(uploader.calls().is_empty());
        auto.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drops_pending_change() {
        let (uploader, hooks, auto, notifier) = start(true);
        notifier.notify(Collection::PaymentMethods);
        sleep(Duration::from_millis(100)).await;
        auto.shutdown().await;
        notifier.notify(Collection::PaymentMethods);
        sleep(Duration::from_secs(5)).await;
        assert!(uploader.calls().is_empty());
        assert!(hooks.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_the_timer() {
        let (uploader, _hooks, auto, notifier) = start(true);
        notifier.notify(Collection::Subscriptions);
        drop(auto);
        sleep(Duration::from_secs(5)).await;
        assert!(uploader.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_uploads_now() {
        let (uploader, _hooks, auto, notifier) = start(true);
        let begin = Instant::now();
        notifier.notify(Collection::Subscriptions);
        auto.flush().await;
        let calls = uploader.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0] - begin < DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_without_changes_does_nothing() {
        let (uploader, _hooks, auto, _notifier) = start(true);
        auto.flush().await;
        assert!(uploader.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_and_disabled_are_reported() {
        let (uploader, hooks, auto, notifier) = start(false);
        notifier.notify(Collection::Settings);
        sleep(Duration::from_secs(1)).await;

        auto.set_enabled(true);
        uploader.unavailable.store(true, Ordering::SeqCst);
        notifier.notify(Collection::Settings);
        sleep(Duration::from_secs(1)).await;

        assert!(uploader.calls().is_empty());
        assert_eq!(
            hooks.events(),
            vec!["skipped: disabled", "skipped: unavailable"]
        );
        auto.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_reported_and_not_retried() {
        let (uploader, hooks, auto, notifier) = start(true);
        uploader.fail.store(true, Ordering::SeqCst);
        notifier.notify(Collection::Lists);
        sleep(Duration::from_secs(5)).await;
        assert_eq!(uploader.calls().len(), 1);
        assert_eq!(hooks.events(), vec!["start", "error: network went away"]);
        auto.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_changes_during_upload_do_not_overlap() {
        let (uploader, _hooks, auto, notifier) = start(true);
        *uploader.busy_for.lock().unwrap() = Some(Duration::from_secs(1));
        notifier.notify(Collection::Subscriptions);
        // The first upload runs from 500ms to 1500ms.
        sleep(Duration::from_millis(600)).await;
        notifier.notify(Collection::Subscriptions);
        notifier.notify(Collection::Categories);
        sleep(Duration::from_secs(5)).await;

        assert_eq!(uploader.calls().len(), 2);
        assert_eq!(uploader.max_running.load(Ordering::SeqCst), 1);
        auto.shutdown().await;
    }
}
