//! The scheduling loop: claim ready tasks, hand them to runners, record
//! terminal outcomes.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::error::StoreError;
use crate::runner::{RunOutcome, TaskRunner};
use crate::store::{StatusPatch, TaskStore, UpdateOutcome};
use crate::task::{Task, TaskStatus};

/// Periodically claims ready tasks and executes them under a fixed
/// concurrency bound.
///
/// All task-row mutations go through the store's version-gated
/// `update_status`; the scheduler holds no locks on rows. The only shared
/// mutable state is the in-flight id set, touched by the loop on claim and
/// by runner completions on other worker threads.
pub struct Scheduler<S, R> {
    store: Arc<S>,
    runner: Arc<R>,
    max_concurrent: usize,
    poll_interval: Duration,
    in_flight: Mutex<HashSet<String>>,
    done: AtomicBool,
    /// Wakes the loop for an extra pass right after a terminal write.
    wake: Notify,
    /// Signaled when the in-flight set empties; `drain` waits on this.
    idle: Notify,
    fatal: Notify,
    fatal_flag: AtomicBool,
}

impl<S: TaskStore + 'static, R: TaskRunner + 'static> Scheduler<S, R> {
    pub(crate) fn new(
        store: Arc<S>,
        runner: R,
        max_concurrent: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            runner: Arc::new(runner),
            max_concurrent,
            poll_interval,
            in_flight: Mutex::new(HashSet::new()),
            done: AtomicBool::new(false),
            wake: Notify::new(),
            idle: Notify::new(),
            fatal: Notify::new(),
            fatal_flag: AtomicBool::new(false),
        }
    }

    /// Run the scheduling loop until [`stop`](Self::stop) is called or the
    /// store fails fatally.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                max_concurrent = self.max_concurrent,
                poll_ms = self.poll_interval.as_millis() as u64,
                "scheduler started"
            );

            let mut ticker = interval(self.poll_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = self.wake.notified() => {}
                }

                if self.done.load(Ordering::Relaxed) {
                    break;
                }

                if let Err(e) = self.tick().await {
                    error!(error = %e, "store failure in scheduling tick, initiating shutdown");
                    self.done.store(true, Ordering::Relaxed);
                    self.fatal_flag.store(true, Ordering::Relaxed);
                    self.fatal.notify_waiters();
                    break;
                }
            }

            debug!("scheduler loop exited");
        })
    }

    /// Halt further scheduling ticks. In-flight runners keep going until
    /// their natural terminal write; use [`drain`](Self::drain) to wait for
    /// them.
    pub fn stop(&self) {
        self.done.store(true, Ordering::Relaxed);
        self.wake.notify_one();
    }

    /// Wait until no tasks are in flight. Returns false if `timeout`
    /// elapsed first.
    pub async fn drain(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.idle.notified();
                if self.in_flight.lock().unwrap().is_empty() {
                    break;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }

    /// Resolves once a fatal store error has taken the loop down.
    pub async fn until_fatal(&self) {
        let notified = self.fatal.notified();
        if self.fatal_flag.load(Ordering::Relaxed) {
            return;
        }
        notified.await;
    }

    /// Ids currently being executed, sorted for stable output.
    pub fn running_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.in_flight.lock().unwrap().iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn slots_available(&self) -> usize {
        self.max_concurrent
            .saturating_sub(self.in_flight.lock().unwrap().len())
    }

    /// One scheduling pass: compute free slots, claim that many ready tasks
    /// in FIFO order, and hand each claim to a runner.
    async fn tick(self: &Arc<Self>) -> Result<(), StoreError> {
        let free = self
            .max_concurrent
            .saturating_sub(self.in_flight.lock().unwrap().len());
        if free == 0 {
            return Ok(());
        }

        for task in self.ready_tasks().await?.into_iter().take(free) {
            let Some((_, version)) = self.store.get_with_version(&task.id).await? else {
                continue;
            };

            let outcome = self
                .store
                .update_status(
                    &task.id,
                    TaskStatus::Running,
                    version,
                    StatusPatch::started(Utc::now().timestamp_millis()),
                )
                .await?;

            match outcome {
                UpdateOutcome::Claimed => {
                    debug!(id = %task.id, "claimed task");
                    self.in_flight.lock().unwrap().insert(task.id.clone());
                    self.spawn_runner(task);
                }
                // Another pass or a racing writer advanced the row first.
                UpdateOutcome::Stale => {}
            }
        }

        Ok(())
    }

    /// Tasks in `queued` or `waiting` whose every dependency is completed,
    /// FIFO by `created_at` with id as tiebreaker.
    async fn ready_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let tasks = self.store.list_all().await?;

        let completed: HashSet<&str> = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .map(|t| t.id.as_str())
            .collect();

        let mut ready: Vec<Task> = tasks
            .iter()
            .filter(|t| matches!(t.status, TaskStatus::Queued | TaskStatus::Waiting))
            .filter(|t| t.dependencies.iter().all(|d| completed.contains(d.as_str())))
            .cloned()
            .collect();

        ready.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(ready)
    }

    fn spawn_runner(self: &Arc<Self>, task: Task) {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = scheduler.runner.run(&task).await;
            scheduler.finish(&task.id, outcome).await;
        });
    }

    /// Record a runner's terminal outcome and free its slot.
    async fn finish(&self, id: &str, outcome: RunOutcome) {
        let now = Utc::now().timestamp_millis();
        let (status, patch) = match outcome {
            RunOutcome::Success => (TaskStatus::Completed, StatusPatch::finished(now)),
            RunOutcome::Failure(reason) => {
                warn!(id = %id, error = %reason, "task failed");
                (TaskStatus::Failed, StatusPatch::failed(now, reason))
            }
        };

        // The version is re-read rather than derived from the claim:
        // recovery or another maintenance writer may have advanced the row
        // while the task ran.
        match self.store.get_with_version(id).await {
            Ok(Some((_, version))) => {
                match self.store.update_status(id, status, version, patch).await {
                    Ok(UpdateOutcome::Claimed) => {
                        debug!(id = %id, status = %status, "terminal write committed");
                    }
                    Ok(UpdateOutcome::Stale) => {
                        warn!(id = %id, "terminal write lost a version race, dropping outcome");
                    }
                    Err(e) => {
                        error!(id = %id, error = %e, "terminal write failed");
                    }
                }
            }
            Ok(None) => warn!(id = %id, "task disappeared before terminal write"),
            Err(e) => error!(id = %id, error = %e, "could not re-read task for terminal write"),
        }

        let now_empty = {
            let mut in_flight = self.in_flight.lock().unwrap();
            in_flight.remove(id);
            in_flight.is_empty()
        };
        if now_empty {
            self.idle.notify_waiters();
        }

        // Schedule an extra pass immediately instead of waiting for the
        // next tick.
        self.wake.notify_one();
    }
}
