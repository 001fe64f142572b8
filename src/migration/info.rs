use serde::{Deserialize, Serialize};

use crate::vcs::VcsPushEvent;

/// Where a migration came from
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MigrationEngine {
    /// Triggered interactively from the UI
    Ui,
    /// Triggered by a version-control push event
    Vcs,
}

impl MigrationEngine {
    pub fn full_name(&self) -> &'static str {
        match self {
            MigrationEngine::Ui => "UI",
            MigrationEngine::Vcs => "VCS",
        }
    }
}

impl std::fmt::Display for MigrationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MigrationType {
    /// Record the existing schema as the starting point; no statement is required
    Baseline,
    /// Apply an ad-hoc SQL statement
    #[default]
    Migrate,
}

impl MigrationType {
    pub fn full_name(&self) -> &'static str {
        match self {
            MigrationType::Baseline => "BASELINE",
            MigrationType::Migrate => "MIGRATE",
        }
    }

    /// Parse the type token used in migration file names
    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "BASELINE" => Some(MigrationType::Baseline),
            "MIGRATE" => Some(MigrationType::Migrate),
            _ => None,
        }
    }
}

impl std::fmt::Display for MigrationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

/// Identity and provenance of one schema change, handed to the driver which
/// records it in the instance's migration history.
///
/// `version` is unique within `namespace` and is what the history ledger uses
/// to order changes and detect replays.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationInfo {
    pub engine: MigrationEngine,
    pub migration_type: MigrationType,
    pub version: String,
    pub namespace: String,
    pub database: String,
    pub description: String,
    pub creator: String,
    pub issue_id: String,
    /// Engine specific. For VCS migrations, the JSON of [`MigrationInfoPayload`].
    pub payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MigrationInfoPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs_push_event: Option<VcsPushEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_type_from_string() {
        assert_eq!(MigrationType::from_string("migrate"), Some(MigrationType::Migrate));
        assert_eq!(MigrationType::from_string("BASELINE"), Some(MigrationType::Baseline));
        assert_eq!(MigrationType::from_string("Baseline"), Some(MigrationType::Baseline));
        assert_eq!(MigrationType::from_string("data"), None);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&MigrationEngine::Ui).unwrap(), "\"UI\"");
        assert_eq!(serde_json::to_string(&MigrationEngine::Vcs).unwrap(), "\"VCS\"");
        assert_eq!(
            serde_json::to_string(&MigrationType::Baseline).unwrap(),
            "\"BASELINE\""
        );
        assert_eq!(MigrationType::default(), MigrationType::Migrate);
        assert_eq!(format!("{}", MigrationEngine::Vcs), "VCS");
    }
}
