use std::sync::Arc;
use std::time::Duration;

use super::scheduler::Scheduler;
use crate::runner::TaskRunner;
use crate::store::TaskStore;

/// Builder for configuring a Scheduler.
pub struct SchedulerBuilder<S, R> {
    store: Arc<S>,
    runner: R,
    max_concurrent: usize,
    poll_interval: Duration,
}

impl<S: TaskStore + 'static, R: TaskRunner + 'static> SchedulerBuilder<S, R> {
    /// Create a new builder over the given store and runner.
    pub fn new(store: Arc<S>, runner: R) -> Self {
        Self {
            store,
            runner,
            max_concurrent: 1,
            poll_interval: Duration::from_millis(100),
        }
    }

    /// Set the maximum number of concurrently running tasks.
    ///
    /// # Panics
    ///
    /// Panics if `n` is 0.
    pub fn max_concurrent(mut self, n: usize) -> Self {
        assert!(n > 0, "max_concurrent must be at least 1");
        self.max_concurrent = n;
        self
    }

    /// Set the scheduling poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Build the scheduler.
    pub fn build(self) -> Scheduler<S, R> {
        Scheduler::new(self.store, self.runner, self.max_concurrent, self.poll_interval)
    }
}
