use std::sync::Mutex;
use std::sync::mpsc;

use bevy::prelude::*;
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};
use tokio::sync::oneshot;

use super::repo::{DRINK_ITEM_TYPE, ProfileStore, StoreError};
use super::retry::{RetryPolicy, retry_with_backoff};
use crate::game::inventory::InventoryDelta;

/// Push one won item to the store. Returns the quantity now stored.
///
/// The remote row is read once to resolve the target, and only the absolute
/// write is retried, so a write whose acknowledgement got lost is never
/// counted twice.
pub async fn persist_delta<S: ProfileStore>(
    store: &S,
    owner_id: &str,
    delta: &InventoryDelta,
    policy: &RetryPolicy,
) -> Result<u32, StoreError> {
    let existing = retry_with_backoff(policy, "inventory lookup", move || {
        store.find_item(owner_id, &delta.item_id, DRINK_ITEM_TYPE)
    })
    .await?;

    let target = existing.map_or(1, |row| row.quantity.saturating_add(1));
    if target != delta.local_quantity {
        debug!(
            "Remote quantity of {} resolves to {target}, local holds {}",
            delta.item_id, delta.local_quantity
        );
    }

    retry_with_backoff(policy, "inventory write", move || {
        store.upsert_item(owner_id, &delta.item_id, target, Some(&delta.image_ref))
    })
    .await?;

    Ok(target)
}

pub async fn persist_balance<S: ProfileStore>(
    store: &S,
    owner_id: &str,
    balance: u32,
    policy: &RetryPolicy,
) -> Result<(), StoreError> {
    retry_with_backoff(policy, "balance write", move || {
        store.set_balance(owner_id, balance)
    })
    .await
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistJob {
    Balance { owner_id: String, balance: u32 },
    Item { owner_id: String, delta: InventoryDelta },
}

impl PersistJob {
    pub fn describe(&self) -> String {
        match self {
            PersistJob::Balance { balance, .. } => format!("balance {balance}"),
            PersistJob::Item { delta, .. } => format!("item {}", delta.item_id),
        }
    }
}

/// Terminal result of a job, sent back to the Bevy world.
#[derive(Debug)]
pub struct PersistReport {
    pub job: PersistJob,
    pub outcome: Result<(), String>,
}

enum WorkerMsg {
    Job(PersistJob),
    /// Answered once every job queued before it has finished.
    Flush(oneshot::Sender<()>),
}

/// Sender side of the persist worker.
#[derive(Resource, Clone)]
pub struct PersistQueue(UnboundedSender<WorkerMsg>);

impl PersistQueue {
    pub fn submit(&self, job: PersistJob) {
        if let Err(e) = self.0.send(WorkerMsg::Job(job)) {
            if let WorkerMsg::Job(job) = e.0 {
                error!("Persist worker is gone, dropping {}", job.describe());
            }
        }
    }

    /// Wait until everything submitted so far has been written or given up on.
    /// Profile loads go through here so they never read a stale row.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.0.send(WorkerMsg::Flush(tx)).is_err() {
            warn!("Persist worker is gone, nothing to flush");
            return;
        }
        if rx.await.is_err() {
            warn!("Persist worker stopped before flushing");
        }
    }
}

/// Finished jobs waiting to be turned into toasts.
#[derive(Resource)]
pub struct PersistReports(Mutex<mpsc::Receiver<PersistReport>>);

impl PersistReports {
    pub fn drain(&self) -> Vec<PersistReport> {
        match self.0.lock() {
            Ok(rx) => rx.try_iter().collect(),
            Err(poisoned) => poisoned.into_inner().try_iter().collect(),
        }
    }
}

async fn run_job<S: ProfileStore>(store: &S, job: &PersistJob, policy: &RetryPolicy) -> Result<(), StoreError> {
    match job {
        PersistJob::Balance { owner_id, balance } => {
            persist_balance(store, owner_id, *balance, policy).await
        }
        PersistJob::Item { owner_id, delta } => {
            persist_delta(store, owner_id, delta, policy).await.map(|_| ())
        }
    }
}

/// Start the single task that applies jobs in submission order.
pub fn spawn_persist_worker<S>(
    handle: &tokio::runtime::Handle,
    store: S,
    policy: RetryPolicy,
) -> (PersistQueue, PersistReports)
where
    S: ProfileStore + 'static,
{
    let (job_tx, mut job_rx) = unbounded_channel::<WorkerMsg>();
    let (report_tx, report_rx) = mpsc::channel::<PersistReport>();

    handle.spawn(async move {
        while let Some(msg) = job_rx.recv().await {
            let job = match msg {
                WorkerMsg::Job(job) => job,
                WorkerMsg::Flush(done) => {
                    let _ = done.send(());
                    continue;
                }
            };
            let outcome = match run_job(&store, &job, &policy).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    error!("Failed to persist {}: {e}", job.describe());
                    Err(e.to_string())
                }
            };
            if report_tx.send(PersistReport { job, outcome }).is_err() {
                break;
            }
        }
    });

    (PersistQueue(job_tx), PersistReports(Mutex::new(report_rx)))
}
