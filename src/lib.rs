//! dbpilot runs versioned schema migrations and scheduled backups against
//! database instances and reports outcomes to chat webhooks.

pub mod backup;
pub mod config;
pub mod db;
pub mod driver;
pub mod error;
pub mod migration;
pub mod services;
pub mod task;
pub mod utils;
pub mod vcs;
pub mod webhook;
