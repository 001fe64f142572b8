mod scheduler;
mod settings;
mod status;
mod store;

pub use scheduler::{backup_name, BackupDumper, BackupScheduler, BackupTarget};
pub use settings::{match_backup_settings, BackupSetting, BackupSettingUpsert, EVERY};
pub use status::{BackupStatus, BackupStorageBackend, BackupType};
pub use store::{Backup, BackupCreate, BackupFind, BackupPatch, BackupStore};
