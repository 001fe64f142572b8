use serde::{Deserialize, Serialize};

/// Status of a backup row.
///
/// `PendingCreate` is set when the row is created. The task that created it
/// moves it exactly once to `Done` or `Failed`, and a terminal row never
/// changes again.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackupStatus {
    PendingCreate,
    Done,
    Failed,
}

impl BackupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupStatus::PendingCreate => "PENDING_CREATE",
            BackupStatus::Done => "DONE",
            BackupStatus::Failed => "FAILED",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING_CREATE" => Some(BackupStatus::PendingCreate),
            "DONE" => Some(BackupStatus::Done),
            "FAILED" => Some(BackupStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BackupStatus::Done | BackupStatus::Failed)
    }

    /// Only strictly forward moves out of `PendingCreate` are allowed
    pub fn can_transition_to(&self, next: BackupStatus) -> bool {
        matches!(
            (self, next),
            (BackupStatus::PendingCreate, BackupStatus::Done)
                | (BackupStatus::PendingCreate, BackupStatus::Failed)
        )
    }
}

impl std::fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BackupType {
    Automatic,
    Manual,
}

impl BackupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupType::Automatic => "AUTOMATIC",
            BackupType::Manual => "MANUAL",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "AUTOMATIC" => Some(BackupType::Automatic),
            "MANUAL" => Some(BackupType::Manual),
            _ => None,
        }
    }
}

impl std::fmt::Display for BackupType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BackupStorageBackend {
    Local,
}

impl BackupStorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupStorageBackend::Local => "LOCAL",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "LOCAL" => Some(BackupStorageBackend::Local),
            _ => None,
        }
    }
}

impl std::fmt::Display for BackupStorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
