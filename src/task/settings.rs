use crate::error::DbPilotError;
use crate::migration::MigrationType;
use crate::vcs::VcsPushEvent;
use serde::{Deserialize, Serialize};

/// Payload of a schema update task.
///
/// Stored as camelCase JSON in the task's `payload` column. New fields must
/// carry `#[serde(default)]` so rows written by older versions still decode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaUpdateSettings {
    pub statement: String,
    #[serde(default)]
    pub rollback_statement: String,
    /// Only meaningful for UI changes; VCS changes take the type from the file name
    #[serde(default)]
    pub migration_type: MigrationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs_push_event: Option<VcsPushEvent>,
}

impl SchemaUpdateSettings {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            rollback_statement: String::new(),
            migration_type: MigrationType::Migrate,
            vcs_push_event: None,
        }
    }

    pub fn to_json(&self) -> Result<String, DbPilotError> {
        serde_json::to_string(self).map_err(|e| {
            DbPilotError::Error(format!("Failed to serialize SchemaUpdateSettings: {}", e))
        })
    }

    pub fn from_json(json: &str) -> Result<Self, DbPilotError> {
        serde_json::from_str(json).map_err(|e| {
            DbPilotError::Error(format!("invalid database schema update payload: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_json_format() {
        let settings = SchemaUpdateSettings::new("ALTER TABLE t ADD c INT");
        let json = settings.to_json().unwrap();
        assert!(json.contains("\"statement\""));
        assert!(json.contains("\"migrationType\":\"MIGRATE\""));
        assert!(!json.contains("vcsPushEvent"));
    }

    #[test]
    fn test_settings_defaults_for_missing_fields() {
        let settings = SchemaUpdateSettings::from_json(r#"{"statement":"SELECT 1"}"#).unwrap();
        assert_eq!(settings, SchemaUpdateSettings::new("SELECT 1"));
    }

    #[test]
    fn test_settings_baseline_and_extra_fields() {
        let json = r#"{"statement":"","migrationType":"BASELINE","unknown_field":123}"#;
        let settings = SchemaUpdateSettings::from_json(json).unwrap();
        assert_eq!(settings.migration_type, MigrationType::Baseline);
    }

    #[test]
    fn test_settings_malformed() {
        let err = SchemaUpdateSettings::from_json("{not json").unwrap_err();
        assert!(err
            .to_string()
            .contains("invalid database schema update payload"));
    }
}
