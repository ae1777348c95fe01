//! Debounced automatic transfer of newly added attachments
//!
//! `Add` notifications accumulate ids; every `Modify` restarts a settle
//! timer. When the timer runs out without being restarted, the pending ids
//! are taken as one batch and handed to the transfer engine on a detached
//! task, so restarting the timer later never cancels a running batch.
//!
//! ```text
//! idle --add--> accumulating --modify--> accumulating (timer restarted)
//!                    |
//!                 timer expires
//!                    v
//!               executing --done--> idle
//! ```

use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::model::ItemId;
use crate::prefs::{Preferences, Settings};
use crate::store::{NotifyEvent, NotifyType, Observer};
use crate::suppress::NotifySuppressor;
use crate::transfer::{BatchReport, TransferEngine, TransferOptions};
use crate::Result;

/// Ids waiting for the next batch, and the timer that will flush them.
#[derive(Debug, Default)]
pub struct PendingChangeSet {
    ids: Vec<ItemId>,
    timer: Option<JoinHandle<()>>,
    /// Bumped on every restart; a timer only fires if it is still current
    generation: u64,
}

impl PendingChangeSet {
    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    pub fn is_timer_armed(&self) -> bool {
        self.timer.is_some()
    }

    fn abort_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

struct Shared {
    engine: TransferEngine,
    prefs: Arc<dyn Preferences>,
    suppressor: NotifySuppressor,
    pending: Mutex<PendingChangeSet>,
    last_report: Mutex<Option<Arc<BatchReport>>>,
    executions: watch::Sender<u64>,
}

impl Shared {
    fn pending(&self) -> MutexGuard<'_, PendingChangeSet> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_add(&self, ids: &[ItemId]) {
        if !Settings::load_lenient(self.prefs.as_ref()).automove {
            return;
        }
        self.pending().ids.extend_from_slice(ids);
    }

    fn restart_timer(self: &Arc<Self>) {
        let delay = Settings::load_lenient(self.prefs.as_ref()).settle_delay;

        let mut pending = self.pending();
        pending.abort_timer();
        pending.generation += 1;
        let generation = pending.generation;

        let shared = Arc::clone(self);
        pending.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            shared.fire(generation);
        }));
    }

    fn fire(self: &Arc<Self>, generation: u64) {
        let ids = {
            let mut pending = self.pending();
            if pending.generation != generation {
                return;
            }
            pending.timer = None;
            mem::take(&mut pending.ids)
        };

        if ids.is_empty() {
            tracing::debug!("Settle timer expired with nothing pending");
            return;
        }

        tokio::spawn(Arc::clone(self).run_batch(ids));
    }

    async fn run_batch(self: Arc<Self>, ids: Vec<ItemId>) {
        tracing::info!(count = ids.len(), "Running automatic transfer batch");
        match self.execute(&ids).await {
            Ok(report) => {
                *self
                    .last_report
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(report));
            }
            Err(e) => tracing::warn!("Automatic transfer failed: {}", e),
        }
        self.executions.send_modify(|n| *n += 1);
    }

    async fn execute(&self, ids: &[ItemId]) -> Result<BatchReport> {
        let items = self.engine.store().get_many(ids).await?;
        let settings = Settings::load(self.prefs.as_ref())?;
        let options = TransferOptions {
            ignore_linked: true,
            into_subfolder: settings.subfolder_enabled,
            subdir_template: settings.subdir_template,
        };
        self.engine
            .transfer_many(settings.file_behavior.into(), &items, &settings.dst_dir, &options)
            .await
    }
}

/// Host observer that transfers new attachments once they settle.
#[derive(Clone)]
pub struct AutoMoveObserver {
    shared: Arc<Shared>,
}

impl AutoMoveObserver {
    pub fn new(
        engine: TransferEngine,
        prefs: Arc<dyn Preferences>,
        suppressor: NotifySuppressor,
    ) -> Self {
        let (executions, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                engine,
                prefs,
                suppressor,
                pending: Mutex::new(PendingChangeSet::default()),
                last_report: Mutex::new(None),
                executions,
            }),
        }
    }

    /// Ids collected for the next batch.
    pub fn pending_ids(&self) -> Vec<ItemId> {
        self.shared.pending().ids().to_vec()
    }

    pub fn is_timer_armed(&self) -> bool {
        self.shared.pending().is_timer_armed()
    }

    /// Number of batches that have finished.
    pub fn executions(&self) -> u64 {
        *self.shared.executions.borrow()
    }

    /// Watch the finished-batch counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.executions.subscribe()
    }

    pub fn last_report(&self) -> Option<Arc<BatchReport>> {
        self.shared
            .last_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Cancel the pending timer. Batches already running are unaffected.
    pub fn shutdown(&self) {
        self.shared.pending().abort_timer();
    }
}

#[async_trait]
impl Observer for AutoMoveObserver {
    async fn notify(&self, event: NotifyEvent, notify_type: NotifyType, ids: &[ItemId]) {
        if notify_type != NotifyType::Item {
            return;
        }
        if self.shared.suppressor.is_suppressed() {
            tracing::debug!(?event, count = ids.len(), "Notification suppressed");
            return;
        }
        match event {
            NotifyEvent::Add => self.shared.on_add(ids),
            NotifyEvent::Modify => self.shared.restart_timer(),
            NotifyEvent::Delete => {}
        }
    }
}
