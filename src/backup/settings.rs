use serde::{Deserialize, Serialize};

use crate::error::DbPilotError;

/// Wildcard for `hour` ("every hour") or `day_of_week` ("every day")
pub const EVERY: i32 = -1;

/// Automatic backup policy for one database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSetting {
    pub id: i64,
    pub creator_id: i64,
    pub created_ts: i64,
    pub updater_id: i64,
    pub updated_ts: i64,
    pub database_id: i64,
    pub enabled: bool,
    /// 0-23, or -1 for every hour
    pub hour: i32,
    /// 0-6 with Sunday as 0, or -1 for every day
    pub day_of_week: i32,
}

impl BackupSetting {
    /// True when this policy fires for the tick `(hour, day_of_week)`.
    ///
    /// Matches an exact hour and day, an exact hour on every day, or every
    /// hour of an exact day. A setting with both fields set to -1 never
    /// matches. That gap is kept as is; changing it changes which policies
    /// fire for existing rows.
    pub fn matches(&self, hour: i32, day_of_week: i32) -> bool {
        self.enabled
            && ((self.hour == hour && self.day_of_week == day_of_week)
                || (self.hour == hour && self.day_of_week == EVERY)
                || (self.hour == EVERY && self.day_of_week == day_of_week))
    }
}

/// All settings in `settings` that fire for the tick, in input order.
pub fn match_backup_settings(
    settings: &[BackupSetting],
    hour: i32,
    day_of_week: i32,
) -> Vec<&BackupSetting> {
    settings
        .iter()
        .filter(|setting| setting.matches(hour, day_of_week))
        .collect()
}

/// Create or replace the backup setting of a database
#[derive(Debug, Clone, PartialEq)]
pub struct BackupSettingUpsert {
    pub updater_id: i64,
    pub database_id: i64,
    pub enabled: bool,
    pub hour: i32,
    pub day_of_week: i32,
}

impl BackupSettingUpsert {
    pub fn validate(&self) -> Result<(), DbPilotError> {
        if self.hour != EVERY && !(0..=23).contains(&self.hour) {
            return Err(DbPilotError::Error(format!(
                "hour must be 0-23 or -1, got: {}",
                self.hour
            )));
        }
        if self.day_of_week != EVERY && !(0..=6).contains(&self.day_of_week) {
            return Err(DbPilotError::Error(format!(
                "day_of_week must be 0-6 or -1, got: {}",
                self.day_of_week
            )));
        }
        Ok(())
    }
}
