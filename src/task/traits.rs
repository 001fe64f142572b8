use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use log::error;

use crate::error::DbPilotError;

use super::model::Task;
use super::task_status::TaskStatus;

/// Result of one executor invocation, persisted by the scheduler.
///
/// Every invocation terminates, so an outcome only exists in a terminal
/// state. `result` holds the human-readable detail on success, or the
/// structured error on failure.
#[derive(Debug)]
pub struct TaskOutcome {
    pub result: Result<String, DbPilotError>,
}

impl TaskOutcome {
    pub fn terminated(result: Result<String, DbPilotError>) -> Self {
        Self { result }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn status(&self) -> TaskStatus {
        match &self.result {
            Ok(_) => TaskStatus::Done,
            Err(_) => TaskStatus::Failed,
        }
    }

    /// Detail string for display: the success message, or the error text
    pub fn detail(&self) -> String {
        match &self.result {
            Ok(detail) => detail.clone(),
            Err(e) => e.to_string(),
        }
    }
}

/// Runs one kind of task to a terminal outcome.
///
/// The scheduler guarantees at most one concurrent invocation per task id;
/// distinct tasks may run concurrently on the same executor.
pub trait TaskExecutor: Send + Sync {
    fn run_once(&self, task: &Task) -> TaskOutcome;
}

/// Run `f` for a single task invocation and turn a panic inside it into a
/// terminal `InternalError` outcome, so one faulty task never takes down the
/// scheduler thread that runs it.
pub fn contain_faults<F>(label: &str, task_id: i64, internal_message: &str, f: F) -> TaskOutcome
where
    F: FnOnce() -> Result<String, DbPilotError>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => TaskOutcome::terminated(result),
        Err(payload) => {
            error!(
                "{} PANIC RECOVER (task_id {}): {}",
                label,
                task_id,
                panic_message(payload.as_ref())
            );
            TaskOutcome::terminated(Err(DbPilotError::InternalError(
                internal_message.to_string(),
            )))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
