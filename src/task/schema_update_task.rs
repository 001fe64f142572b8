use std::sync::Arc;

use log::{debug, info, Level};
use logging_timer::timer;

use crate::driver::{DriverGuard, DriverOpener};
use crate::error::DbPilotError;
use crate::migration::{
    check_statement, ChangeOrigin, InteractiveChange, MigrationResolver, MigrationType,
};
use crate::services::{IssueService, PrincipalService};
use crate::utils::Utils;

use super::model::Task;
use super::settings::SchemaUpdateSettings;
use super::traits::{contain_faults, TaskExecutor, TaskOutcome};

const INTERNAL_ERROR_MESSAGE: &str = "encountered internal error when executing sql";

/// Applies one schema migration to the task's target database.
///
/// Every invocation terminates. Failures, including panics raised by a
/// driver, come back as the outcome's error rather than unwinding into the
/// scheduler. Re-running a task derives the same migration version, so a
/// driver that already recorded it can detect the replay.
pub struct SchemaUpdateTaskExecutor {
    drivers: Arc<dyn DriverOpener>,
    principals: Arc<dyn PrincipalService>,
    issues: Arc<dyn IssueService>,
}

impl SchemaUpdateTaskExecutor {
    pub fn new(
        drivers: Arc<dyn DriverOpener>,
        principals: Arc<dyn PrincipalService>,
        issues: Arc<dyn IssueService>,
    ) -> Self {
        Self {
            drivers,
            principals,
            issues,
        }
    }

    fn run(&self, task: &Task) -> Result<String, DbPilotError> {
        let database = task.database.as_ref().ok_or_else(|| {
            DbPilotError::Error("missing database when updating schema".to_string())
        })?;
        let instance = &database.instance;

        let settings = SchemaUpdateSettings::from_json(&task.payload)?;

        let origin = match &settings.vcs_push_event {
            Some(event) => ChangeOrigin::VcsPush(event),
            None => ChangeOrigin::Interactive(InteractiveChange {
                task_id: task.id,
                task_name: &task.name,
                created_ts: task.created_ts,
                creator_id: task.creator_id,
                database_name: &database.name,
                migration_type: settings.migration_type,
            }),
        };
        let mut mi = MigrationResolver::new(self.principals.as_ref()).resolve(origin)?;

        if let Some(issue) = Utils::log_and_discard(
            self.issues.find_issue(task.pipeline_id),
            &format!(
                "Failed to fetch containing issue for composing the migration info (task_id {})",
                task.id
            ),
        ) {
            mi.issue_id = issue.id.to_string();
        }

        let sql = check_statement(mi.migration_type, &settings.statement)?;

        let driver = self
            .drivers
            .open(
                instance.engine,
                &database.connection_config(),
                &database.connection_context(),
            )
            .map_err(|e| {
                DbPilotError::ConnectionError(format!(
                    "failed to connect instance: {} with user: {}. {}",
                    instance.name, instance.username, e
                ))
            })?;
        let mut driver = DriverGuard::new(driver, format!("{}/{}", instance.name, database.name));

        debug!(
            "Start sql migration... instance: {}, database: {}, engine: {}, type: {}, sql: {}",
            instance.name, database.name, mi.engine, mi.migration_type, sql
        );

        let needs_setup = driver.needs_setup_migration().map_err(|e| {
            DbPilotError::DriverError(format!(
                "failed to check migration setup for instance: {}, {}",
                instance.name, e
            ))
        })?;
        if needs_setup {
            return Err(DbPilotError::Error(format!(
                "missing migration schema for instance: {}",
                instance.name
            )));
        }

        driver.execute_migration(&mi, &sql)?;

        let detail = match mi.migration_type {
            MigrationType::Baseline => format!(
                "Established baseline version {} for database '{}'",
                mi.version, database.name
            ),
            MigrationType::Migrate => format!(
                "Applied migration version {} to database '{}'",
                mi.version, database.name
            ),
        };
        info!("{} (task_id {})", detail, task.id);

        Ok(detail)
    }
}

impl TaskExecutor for SchemaUpdateTaskExecutor {
    fn run_once(&self, task: &Task) -> TaskOutcome {
        let _tmr = timer!(Level::Debug; "SchemaUpdateTaskExecutor::run_once", "task_id {}", task.id);
        contain_faults(
            "SchemaUpdateTaskExecutor",
            task.id,
            INTERNAL_ERROR_MESSAGE,
            || self.run(task),
        )
    }
}
