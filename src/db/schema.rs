pub const SCHEMA_VERSION: &str = "1";

pub const CREATE_SCHEMA_SQL: &str = r#"
BEGIN TRANSACTION;

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', '1');

CREATE TABLE IF NOT EXISTS backup (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    creator_id INTEGER NOT NULL,
    created_ts INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
    updater_id INTEGER NOT NULL,
    updated_ts INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
    database_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('PENDING_CREATE', 'DONE', 'FAILED')),
    type TEXT NOT NULL CHECK (type IN ('AUTOMATIC', 'MANUAL')),
    storage_backend TEXT NOT NULL CHECK (storage_backend IN ('LOCAL')),
    migration_history_version TEXT NOT NULL,
    path TEXT NOT NULL,
    comment TEXT NOT NULL DEFAULT '',
    UNIQUE (database_id, name)
);

CREATE INDEX IF NOT EXISTS idx_backup_database_id ON backup (database_id);

CREATE TABLE IF NOT EXISTS backup_setting (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    creator_id INTEGER NOT NULL,
    created_ts INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
    updater_id INTEGER NOT NULL,
    updated_ts INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
    database_id INTEGER NOT NULL UNIQUE,
    enabled INTEGER NOT NULL CHECK (enabled IN (0, 1)),
    hour INTEGER NOT NULL CHECK (hour >= -1 AND hour <= 23),
    day_of_week INTEGER NOT NULL CHECK (day_of_week >= -1 AND day_of_week <= 6)
);

COMMIT;
"#;
