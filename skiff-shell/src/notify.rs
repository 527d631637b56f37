use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Coalesces rapid change triggers into at most one delivered signal per
/// quantum, trailing edge: the signal fires once the burst that opened the
/// window has settled, and triggers that land inside the window are absorbed
/// into that same signal.
pub struct ChangeNotifier {
    trigger: mpsc::UnboundedSender<()>,
    listener: watch::Receiver<u64>,
    task: Option<JoinHandle<()>>,
}

/// Clonable trigger half, for handing into spawned tasks.
#[derive(Clone)]
pub struct NotifyTrigger {
    tx: mpsc::UnboundedSender<()>,
}

impl NotifyTrigger {
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

/// Subscription half. `changed` resolves once per delivered signal and
/// returns `false` after the notifier is closed.
#[derive(Clone)]
pub struct ChangeListener {
    rx: watch::Receiver<u64>,
}

impl ChangeListener {
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    pub fn revision(&self) -> u64 {
        *self.rx.borrow()
    }
}

impl ChangeNotifier {
    pub fn new(quantum: Duration) -> Self {
        let (trigger, mut pending) = mpsc::unbounded_channel::<()>();
        let (deliver, listener) = watch::channel(0u64);
        let task = tokio::spawn(async move {
            let mut revision = 0u64;
            while pending.recv().await.is_some() {
                tokio::time::sleep(quantum).await;
                while pending.try_recv().is_ok() {}
                revision += 1;
                if deliver.send(revision).is_err() {
                    break;
                }
            }
        });
        Self {
            trigger,
            listener,
            task: Some(task),
        }
    }

    pub fn trigger(&self) {
        let _ = self.trigger.send(());
    }

    pub fn handle(&self) -> NotifyTrigger {
        NotifyTrigger {
            tx: self.trigger.clone(),
        }
    }

    pub fn subscribe(&self) -> ChangeListener {
        ChangeListener {
            rx: self.listener.clone(),
        }
    }

    /// Stops delivery; every listener observes closure. Idempotent.
    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ChangeNotifier {
    fn drop(&mut self) {
        self.close();
    }
}
