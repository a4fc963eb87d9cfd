//! Startup recovery for tasks interrupted mid-execution.

use tracing::{debug, info};

use crate::error::StoreError;
use crate::store::{StatusPatch, TaskStore, UpdateOutcome};
use crate::task::TaskStatus;

/// Error recorded on tasks that were found running after a restart.
pub const INTERRUPTED_ERROR: &str = "Task was interrupted by system restart";

/// Requeue every task found in `running` state.
///
/// A task observed running at startup is evidence of an unclean shutdown:
/// its runner no longer exists, so the safest move is back to `queued` with
/// `started_at` cleared. Runs before the scheduler's first tick. A stale
/// update means some other actor already moved the task and is ignored,
/// which also makes a second recovery pass a no-op.
///
/// Returns the number of tasks requeued.
pub async fn recover_interrupted<S: TaskStore + ?Sized>(store: &S) -> Result<usize, StoreError> {
    let orphans = store.list_by_status(TaskStatus::Running).await?;
    let mut recovered = 0;

    for task in orphans {
        let outcome = store
            .update_status(
                &task.id,
                TaskStatus::Queued,
                task.version,
                StatusPatch::interrupted(INTERRUPTED_ERROR),
            )
            .await?;

        match outcome {
            UpdateOutcome::Claimed => {
                info!(id = %task.id, "requeued interrupted task");
                recovered += 1;
            }
            UpdateOutcome::Stale => {
                debug!(id = %task.id, "interrupted task already moved, skipping");
            }
        }
    }

    Ok(recovered)
}
