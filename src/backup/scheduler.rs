use std::sync::Arc;

use chrono::{Datelike, NaiveDateTime, Timelike};
use log::{debug, error, info, warn};

use crate::error::DbPilotError;
use crate::task::contain_faults;

use super::status::{BackupStatus, BackupStorageBackend, BackupType};
use super::store::{Backup, BackupCreate, BackupFind, BackupPatch, BackupStore};

/// What a dumper needs to know about the database a setting points at
#[derive(Debug, Clone, PartialEq)]
pub struct BackupTarget {
    pub database_id: i64,
    pub database_name: String,
    /// Latest migration version applied to the database, empty if none
    pub migration_history_version: String,
}

/// Produces the dump file for a backup row. Implemented outside this crate
/// on top of the engine drivers.
pub trait BackupDumper: Send + Sync {
    fn target(&self, database_id: i64) -> Result<BackupTarget, DbPilotError>;

    fn dump(&self, target: &BackupTarget, backup: &Backup) -> Result<(), DbPilotError>;
}

/// Periodic driver for automatic backups.
///
/// The caller invokes [`run_tick`](Self::run_tick) once per hour. Each
/// matching setting yields one `AUTOMATIC` backup that is created in
/// `PENDING_CREATE` and patched to `DONE` or `FAILED` exactly once.
pub struct BackupScheduler {
    store: BackupStore,
    dumper: Arc<dyn BackupDumper>,
    backup_dir: String,
    system_bot_id: i64,
}

impl BackupScheduler {
    pub fn new(
        store: BackupStore,
        dumper: Arc<dyn BackupDumper>,
        backup_dir: impl Into<String>,
        system_bot_id: i64,
    ) -> Self {
        Self {
            store,
            dumper,
            backup_dir: backup_dir.into(),
            system_bot_id,
        }
    }

    /// Run every backup due at `now` (local wall-clock time).
    ///
    /// A failure for one database is logged and does not stop the others.
    /// Returns the backups that reached a terminal status during this tick.
    pub fn run_tick(&self, now: NaiveDateTime) -> Result<Vec<Backup>, DbPilotError> {
        let hour = now.hour() as i32;
        let day_of_week = now.weekday().num_days_from_sunday() as i32;

        let settings = self.store.find_backup_settings_match(hour, day_of_week)?;
        debug!(
            "Backup tick ({}, {}) matched {} setting(s)",
            hour,
            day_of_week,
            settings.len()
        );

        let mut finished = Vec::new();
        for setting in settings {
            match self.run_one(setting.database_id, now) {
                Ok(Some(backup)) => finished.push(backup),
                Ok(None) => {}
                Err(e) => error!(
                    "Automatic backup for database {} failed: {}",
                    setting.database_id, e
                ),
            }
        }

        Ok(finished)
    }

    fn run_one(&self, database_id: i64, now: NaiveDateTime) -> Result<Option<Backup>, DbPilotError> {
        let target = self.dumper.target(database_id)?;
        let name = backup_name(&target.database_name, now);

        let existing = self.store.find_backup_list(&BackupFind {
            database_id: Some(database_id),
            name: Some(name.clone()),
            ..Default::default()
        })?;
        // UNIQUE(database_id, name) allows at most one row
        let backup = match existing.into_iter().next() {
            Some(backup) if backup.status.is_terminal() => {
                warn!(
                    "Backup '{}' already exists for database {}, skipping",
                    name, database_id
                );
                return Ok(None);
            }
            Some(backup) => {
                warn!(
                    "Backup {} ('{}') was left in {} by an earlier run, dumping it again",
                    backup.id, backup.name, backup.status
                );
                backup
            }
            None => {
                let backup = self.store.create_backup(&BackupCreate {
                    creator_id: self.system_bot_id,
                    database_id,
                    name: name.clone(),
                    backup_type: BackupType::Automatic,
                    storage_backend: BackupStorageBackend::Local,
                    migration_history_version: target.migration_history_version.clone(),
                    path: format!("{}/db/{}/{}.sql", self.backup_dir, database_id, name),
                    comment: String::new(),
                })?;
                info!("Created backup '{}' for database {}", backup.name, database_id);
                backup
            }
        };

        let dumper = Arc::clone(&self.dumper);
        let outcome = contain_faults(
            "Backup runner",
            backup.id,
            "encountered internal error when dumping database",
            || dumper.dump(&target, &backup).map(|_| backup.path.clone()),
        );

        let status = match &outcome.result {
            Ok(path) => {
                info!("Backup '{}' written to {}", backup.name, path);
                BackupStatus::Done
            }
            Err(e) => {
                error!("Backup '{}' failed: {}", backup.name, e);
                BackupStatus::Failed
            }
        };

        let patched = self
            .store
            .patch_backup(&BackupPatch {
                id: backup.id,
                updater_id: self.system_bot_id,
                status,
            })
            .inspect_err(|e| {
                error!(
                    "Backup {} ('{}') is stuck in {} after the dump: {}",
                    backup.id,
                    backup.name,
                    BackupStatus::PendingCreate,
                    e
                )
            })?;

        Ok(Some(patched))
    }
}

/// `{database}-{YYYYMMDDThhmmss}-autobackup`
pub fn backup_name(database_name: &str, now: NaiveDateTime) -> String {
    format!(
        "{}-{}-autobackup",
        database_name,
        now.format("%Y%m%dT%H%M%S")
    )
}
