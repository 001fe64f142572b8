use log::info;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::DbPilotError;

use super::settings::{BackupSetting, BackupSettingUpsert};
use super::status::{BackupStatus, BackupStorageBackend, BackupType};

const BACKUP_COLUMNS: &str = "id, creator_id, created_ts, updater_id, updated_ts, database_id, \
     name, status, type, storage_backend, migration_history_version, path, comment";

const BACKUP_SETTING_COLUMNS: &str =
    "id, creator_id, created_ts, updater_id, updated_ts, database_id, enabled, hour, day_of_week";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub id: i64,
    pub creator_id: i64,
    pub created_ts: i64,
    pub updater_id: i64,
    pub updated_ts: i64,
    pub database_id: i64,
    pub name: String,
    pub status: BackupStatus,
    pub backup_type: BackupType,
    pub storage_backend: BackupStorageBackend,
    /// Last applied migration version when the snapshot was taken
    pub migration_history_version: String,
    pub path: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackupCreate {
    pub creator_id: i64,
    pub database_id: i64,
    pub name: String,
    pub backup_type: BackupType,
    pub storage_backend: BackupStorageBackend,
    pub migration_history_version: String,
    pub path: String,
    pub comment: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackupFind {
    pub id: Option<i64>,
    pub database_id: Option<i64>,
    pub name: Option<String>,
}

/// Status is the only patchable field of a backup
#[derive(Debug, Clone, PartialEq)]
pub struct BackupPatch {
    pub id: i64,
    pub updater_id: i64,
    pub status: BackupStatus,
}

/// Persistence for backups and backup settings.
#[derive(Clone)]
pub struct BackupStore {
    db: Database,
}

impl BackupStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a backup in `PENDING_CREATE`
    pub fn create_backup(&self, create: &BackupCreate) -> Result<Backup, DbPilotError> {
        let conn = self.db.get_connection()?;
        Database::immediate_transaction(&conn, |conn| Self::create_backup_locked(conn, create))
    }

    /// Returns `NotFound` if nothing matches and `Conflict` if more than one row does.
    pub fn find_backup(&self, find: &BackupFind) -> Result<Backup, DbPilotError> {
        let mut list = self.find_backup_list(find)?;
        match list.len() {
            0 => Err(DbPilotError::NotFound(format!("backup not found: {:?}", find))),
            1 => Ok(list.remove(0)),
            n => Err(DbPilotError::Conflict(format!(
                "found {} backups with filter {:?}, expect 1",
                n, find
            ))),
        }
    }

    pub fn find_backup_list(&self, find: &BackupFind) -> Result<Vec<Backup>, DbPilotError> {
        let conn = self.db.get_connection()?;
        Self::find_backup_list_locked(&conn, find)
    }

    /// Move a backup to a new status.
    ///
    /// Fails with `InvalidStateTransition` unless the move is strictly forward
    /// out of `PENDING_CREATE`, and with `NotFound` if the backup does not exist.
    pub fn patch_backup(&self, patch: &BackupPatch) -> Result<Backup, DbPilotError> {
        let conn = self.db.get_connection()?;
        Database::immediate_transaction(&conn, |conn| Self::patch_backup_locked(conn, patch))
    }

    /// Returns `NotFound` if the database has no backup setting.
    pub fn find_backup_setting(&self, database_id: i64) -> Result<BackupSetting, DbPilotError> {
        let conn = self.db.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM backup_setting WHERE database_id = ?",
            BACKUP_SETTING_COLUMNS
        ))?;
        let mut list = stmt
            .query_map([database_id], backup_setting_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        match list.len() {
            0 => Err(DbPilotError::NotFound(format!(
                "backup setting not found for database {}",
                database_id
            ))),
            1 => Ok(list.remove(0)),
            n => Err(DbPilotError::Conflict(format!(
                "found {} backup settings for database {}, expect 1",
                n, database_id
            ))),
        }
    }

    /// Insert the setting for a database, or replace the existing one.
    pub fn upsert_backup_setting(
        &self,
        upsert: &BackupSettingUpsert,
    ) -> Result<BackupSetting, DbPilotError> {
        upsert.validate()?;

        let conn = self.db.get_connection()?;
        let setting = Database::immediate_transaction(&conn, |conn| {
            let setting = conn.query_row(
                &format!(
                    "INSERT INTO backup_setting (
                        creator_id, updater_id, database_id, enabled, hour, day_of_week
                    ) VALUES (?, ?, ?, ?, ?, ?)
                    ON CONFLICT(database_id) DO UPDATE SET
                        updater_id = excluded.updater_id,
                        updated_ts = strftime('%s', 'now'),
                        enabled = excluded.enabled,
                        hour = excluded.hour,
                        day_of_week = excluded.day_of_week
                    RETURNING {}",
                    BACKUP_SETTING_COLUMNS
                ),
                params![
                    upsert.updater_id,
                    upsert.updater_id,
                    upsert.database_id,
                    upsert.enabled,
                    upsert.hour,
                    upsert.day_of_week,
                ],
                backup_setting_from_row,
            )?;
            Ok(setting)
        })?;

        info!(
            "Backup setting for database {} set to enabled: {}, hour: {}, day_of_week: {}",
            setting.database_id, setting.enabled, setting.hour, setting.day_of_week
        );

        Ok(setting)
    }

    /// Enabled settings that fire for the tick. Agrees with
    /// [`BackupSetting::matches`](super::settings::BackupSetting::matches).
    pub fn find_backup_settings_match(
        &self,
        hour: i32,
        day_of_week: i32,
    ) -> Result<Vec<BackupSetting>, DbPilotError> {
        let conn = self.db.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {}
            FROM backup_setting
            WHERE
                enabled = 1
                AND (
                    (hour = ?1 AND day_of_week = ?2)
                    OR
                    (hour = ?1 AND day_of_week = -1)
                    OR
                    (hour = -1 AND day_of_week = ?2)
                )
            ORDER BY database_id",
            BACKUP_SETTING_COLUMNS
        ))?;

        let list = stmt
            .query_map(params![hour, day_of_week], backup_setting_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(list)
    }

    fn create_backup_locked(conn: &Connection, create: &BackupCreate) -> Result<Backup, DbPilotError> {
        let backup = conn.query_row(
            &format!(
                "INSERT INTO backup (
                    creator_id, updater_id, database_id, name, status, type,
                    storage_backend, migration_history_version, path, comment
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                RETURNING {}",
                BACKUP_COLUMNS
            ),
            params![
                create.creator_id,
                create.creator_id,
                create.database_id,
                create.name,
                BackupStatus::PendingCreate.as_str(),
                create.backup_type.as_str(),
                create.storage_backend.as_str(),
                create.migration_history_version,
                create.path,
                create.comment,
            ],
            backup_from_row,
        )?;

        Ok(backup)
    }

    fn find_backup_list_locked(
        conn: &Connection,
        find: &BackupFind,
    ) -> Result<Vec<Backup>, DbPilotError> {
        let mut where_clause = vec!["1 = 1"];
        let mut args: Vec<Value> = Vec::new();
        if let Some(id) = find.id {
            where_clause.push("id = ?");
            args.push(Value::Integer(id));
        }
        if let Some(database_id) = find.database_id {
            where_clause.push("database_id = ?");
            args.push(Value::Integer(database_id));
        }
        if let Some(name) = &find.name {
            where_clause.push("name = ?");
            args.push(Value::Text(name.clone()));
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM backup WHERE {} ORDER BY id",
            BACKUP_COLUMNS,
            where_clause.join(" AND ")
        ))?;

        let list = stmt
            .query_map(params_from_iter(args), backup_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(list)
    }

    fn patch_backup_locked(conn: &Connection, patch: &BackupPatch) -> Result<Backup, DbPilotError> {
        let find = BackupFind {
            id: Some(patch.id),
            ..Default::default()
        };
        let current = Self::find_backup_list_locked(conn, &find)?
            .into_iter()
            .next()
            .ok_or_else(|| DbPilotError::NotFound(format!("backup ID not found: {}", patch.id)))?;

        if !current.status.can_transition_to(patch.status) {
            return Err(DbPilotError::InvalidStateTransition(format!(
                "backup {} cannot move from {} to {}",
                patch.id, current.status, patch.status
            )));
        }

        let backup = conn.query_row(
            &format!(
                "UPDATE backup
                SET updater_id = ?, updated_ts = strftime('%s', 'now'), status = ?
                WHERE id = ?
                RETURNING {}",
                BACKUP_COLUMNS
            ),
            params![patch.updater_id, patch.status.as_str(), patch.id],
            backup_from_row,
        )?;

        Ok(backup)
    }
}

fn backup_from_row(row: &Row) -> rusqlite::Result<Backup> {
    let status: String = row.get(7)?;
    let backup_type: String = row.get(8)?;
    let storage_backend: String = row.get(9)?;

    Ok(Backup {
        id: row.get(0)?,
        creator_id: row.get(1)?,
        created_ts: row.get(2)?,
        updater_id: row.get(3)?,
        updated_ts: row.get(4)?,
        database_id: row.get(5)?,
        name: row.get(6)?,
        status: BackupStatus::from_string(&status).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(7, "status".to_string(), Type::Text)
        })?,
        backup_type: BackupType::from_string(&backup_type).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(8, "type".to_string(), Type::Text)
        })?,
        storage_backend: BackupStorageBackend::from_string(&storage_backend).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(9, "storage_backend".to_string(), Type::Text)
        })?,
        migration_history_version: row.get(10)?,
        path: row.get(11)?,
        comment: row.get(12)?,
    })
}

fn backup_setting_from_row(row: &Row) -> rusqlite::Result<BackupSetting> {
    Ok(BackupSetting {
        id: row.get(0)?,
        creator_id: row.get(1)?,
        created_ts: row.get(2)?,
        updater_id: row.get(3)?,
        updated_ts: row.get(4)?,
        database_id: row.get(5)?,
        enabled: row.get(6)?,
        hour: row.get(7)?,
        day_of_week: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::settings::{match_backup_settings, EVERY};
    use pretty_assertions::assert_eq;

    fn store() -> BackupStore {
        BackupStore::new(Database::open_in_memory().unwrap())
    }

    fn create(database_id: i64, name: &str) -> BackupCreate {
        BackupCreate {
            creator_id: 1,
            database_id,
            name: name.to_string(),
            backup_type: BackupType::Manual,
            storage_backend: BackupStorageBackend::Local,
            migration_history_version: "20211001123456.42".to_string(),
            path: format!("backup/db/{}/{}.sql", database_id, name),
            comment: "before release".to_string(),
        }
    }

    fn upsert(database_id: i64, enabled: bool, hour: i32, day_of_week: i32) -> BackupSettingUpsert {
        BackupSettingUpsert {
            updater_id: 1,
            database_id,
            enabled,
            hour,
            day_of_week,
        }
    }

    #[test]
    fn test_create_and_find_backup() {
        let store = store();
        let created = store.create_backup(&create(3, "shop-manual")).unwrap();

        assert_eq!(created.status, BackupStatus::PendingCreate);
        assert_eq!(created.backup_type, BackupType::Manual);

        let found = store
            .find_backup(&BackupFind {
                database_id: Some(3),
                name: Some("shop-manual".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(found, created);
    }

    #[test]
    fn test_find_backup_not_found_and_conflict() {
        let store = store();
        assert!(matches!(
            store.find_backup(&BackupFind {
                id: Some(99),
                ..Default::default()
            }),
            Err(DbPilotError::NotFound(_))
        ));

        store.create_backup(&create(3, "a")).unwrap();
        store.create_backup(&create(3, "b")).unwrap();
        assert!(matches!(
            store.find_backup(&BackupFind {
                database_id: Some(3),
                ..Default::default()
            }),
            Err(DbPilotError::Conflict(_))
        ));
        assert_eq!(
            store
                .find_backup_list(&BackupFind {
                    database_id: Some(3),
                    ..Default::default()
                })
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn test_patch_is_forward_only() {
        let store = store();
        let backup = store.create_backup(&create(3, "shop")).unwrap();

        let done = store
            .patch_backup(&BackupPatch {
                id: backup.id,
                updater_id: 2,
                status: BackupStatus::Done,
            })
            .unwrap();
        assert_eq!(done.status, BackupStatus::Done);
        assert_eq!(done.updater_id, 2);

        let err = store
            .patch_backup(&BackupPatch {
                id: backup.id,
                updater_id: 2,
                status: BackupStatus::Failed,
            })
            .unwrap_err();
        assert!(matches!(err, DbPilotError::InvalidStateTransition(_)));

        // The rejected patch left the row alone
        let found = store
            .find_backup(&BackupFind {
                id: Some(backup.id),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(found.status, BackupStatus::Done);
    }

    #[test]
    fn test_patch_missing_backup() {
        let store = store();
        let err = store
            .patch_backup(&BackupPatch {
                id: 7,
                updater_id: 1,
                status: BackupStatus::Done,
            })
            .unwrap_err();
        assert!(matches!(err, DbPilotError::NotFound(_)));
    }

    #[test]
    fn test_upsert_keeps_one_row_per_database() {
        let store = store();
        let first = store.upsert_backup_setting(&upsert(3, true, 2, EVERY)).unwrap();
        let second = store.upsert_backup_setting(&upsert(3, false, 5, 1)).unwrap();

        assert_eq!(first.id, second.id);
        let found = store.find_backup_setting(3).unwrap();
        assert_eq!(found.enabled, false);
        assert_eq!(found.hour, 5);
        assert_eq!(found.day_of_week, 1);

        assert!(matches!(
            store.find_backup_setting(4),
            Err(DbPilotError::NotFound(_))
        ));
    }

    #[test]
    fn test_upsert_rejects_out_of_range() {
        let store = store();
        assert!(store.upsert_backup_setting(&upsert(3, true, 24, EVERY)).is_err());
        assert!(store.upsert_backup_setting(&upsert(3, true, 1, 9)).is_err());
    }

    #[test]
    fn test_sql_match_agrees_with_predicate() {
        let store = store();
        let rows = [
            (1, true, 3, EVERY),
            (2, true, EVERY, 2),
            (3, true, 3, 2),
            (4, false, 3, 2),
            (5, true, EVERY, EVERY),
            (6, true, 23, 6),
            (7, true, 0, 0),
        ];
        for (database_id, enabled, hour, day) in rows {
            store
                .upsert_backup_setting(&upsert(database_id, enabled, hour, day))
                .unwrap();
        }

        let conn = store.db.get_connection().unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM backup_setting ORDER BY database_id",
                BACKUP_SETTING_COLUMNS
            ))
            .unwrap();
        let all: Vec<BackupSetting> = stmt
            .query_map([], backup_setting_from_row)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        drop(stmt);
        drop(conn);

        for day in 0..=6 {
            for hour in 0..=23 {
                let from_sql: Vec<i64> = store
                    .find_backup_settings_match(hour, day)
                    .unwrap()
                    .iter()
                    .map(|s| s.database_id)
                    .collect();
                let from_predicate: Vec<i64> = match_backup_settings(&all, hour, day)
                    .iter()
                    .map(|s| s.database_id)
                    .collect();
                assert_eq!(from_sql, from_predicate, "tick ({}, {})", hour, day);
            }
        }

        let at_3_2: Vec<i64> = store
            .find_backup_settings_match(3, 2)
            .unwrap()
            .iter()
            .map(|s| s.database_id)
            .collect();
        assert_eq!(at_3_2, vec![1, 2, 3]);
    }
}
