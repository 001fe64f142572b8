use serde::{Deserialize, Serialize};

/// A commit's worth of file changes delivered by a version-control webhook.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileCommit {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub created_ts: i64,
    #[serde(default)]
    pub url: String,
    pub author_name: String,
    #[serde(default)]
    pub author_email: String,
    #[serde(default)]
    pub added: Vec<String>,
}

/// The push event that caused a migration, kept verbatim for audit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VcsPushEvent {
    #[serde(default)]
    pub vcs_type: String,
    /// Repository directory under which migration files live
    pub base_directory: String,
    pub file_commit: FileCommit,
}
