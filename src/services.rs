//! Lookups the executor consumes from the surrounding server.
//!
//! Both are used only to enrich migration metadata, so callers treat every
//! failure here as non-fatal.

use crate::error::DbPilotError;

#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub id: i64,
    pub name: String,
    pub pipeline_id: i64,
}

pub trait PrincipalService: Send + Sync {
    fn compose_principal(&self, id: i64) -> Result<Principal, DbPilotError>;
}

pub trait IssueService: Send + Sync {
    /// Find the issue whose pipeline contains the task
    fn find_issue(&self, pipeline_id: i64) -> Result<Issue, DbPilotError>;
}
