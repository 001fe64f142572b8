//! The contract the executor needs from a database driver.
//!
//! Drivers themselves live outside this crate. The executor only opens one,
//! checks that its migration history storage exists, executes one migration,
//! and closes it.

use std::ops::{Deref, DerefMut};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::DbPilotError;
use crate::migration::MigrationInfo;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EngineKind {
    Mysql,
    Postgres,
    Tidb,
    Clickhouse,
    Snowflake,
}

impl EngineKind {
    pub fn full_name(&self) -> &'static str {
        match self {
            EngineKind::Mysql => "MYSQL",
            EngineKind::Postgres => "POSTGRES",
            EngineKind::Tidb => "TIDB",
            EngineKind::Clickhouse => "CLICKHOUSE",
            EngineKind::Snowflake => "SNOWFLAKE",
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

#[derive(Clone, PartialEq)]
pub struct ConnectionConfig {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: String,
    pub database: String,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}

/// Labels carried for logging on the driver side
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionContext {
    pub environment_name: String,
    pub instance_name: String,
}

pub trait Driver: Send {
    /// True when the instance has no migration history storage yet
    fn needs_setup_migration(&mut self) -> Result<bool, DbPilotError>;

    /// Run `statement` and record `info` in the migration history.
    fn execute_migration(&mut self, info: &MigrationInfo, statement: &str)
        -> Result<(), DbPilotError>;

    fn close(&mut self);
}

pub trait DriverOpener: Send + Sync {
    fn open(
        &self,
        engine: EngineKind,
        config: &ConnectionConfig,
        context: &ConnectionContext,
    ) -> Result<Box<dyn Driver>, DbPilotError>;
}

/// Owns an open driver and closes it when dropped, including during unwinding.
pub struct DriverGuard {
    driver: Box<dyn Driver>,
    label: String,
}

impl DriverGuard {
    pub fn new(driver: Box<dyn Driver>, label: impl Into<String>) -> Self {
        Self {
            driver,
            label: label.into(),
        }
    }
}

impl Deref for DriverGuard {
    type Target = dyn Driver;

    fn deref(&self) -> &Self::Target {
        self.driver.as_ref()
    }
}

impl DerefMut for DriverGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.driver.as_mut()
    }
}

impl Drop for DriverGuard {
    fn drop(&mut self) {
        debug!("Closing driver connection for {}", self.label);
        self.driver.close();
    }
}
