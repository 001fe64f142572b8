use crate::driver::{ConnectionConfig, ConnectionContext, EngineKind};

/// The database instance a task targets, with the credentials stored for it
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub id: i64,
    pub name: String,
    pub engine: EngineKind,
    pub environment_name: String,
    pub host: String,
    pub port: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetDatabase {
    pub id: i64,
    pub name: String,
    pub instance: Instance,
}

impl TargetDatabase {
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            username: self.instance.username.clone(),
            password: self.instance.password.clone(),
            host: self.instance.host.clone(),
            port: self.instance.port.clone(),
            database: self.name.clone(),
        }
    }

    pub fn connection_context(&self) -> ConnectionContext {
        ConnectionContext {
            environment_name: self.instance.environment_name.clone(),
            instance_name: self.instance.name.clone(),
        }
    }
}

/// A unit of work handed to an executor by the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// Assigned monotonically by the task store
    pub id: i64,
    pub name: String,
    pub creator_id: i64,
    pub pipeline_id: i64,
    /// Unix seconds
    pub created_ts: i64,
    /// JSON payload, decoded by the executor for the task's type
    pub payload: String,
    pub database: Option<TargetDatabase>,
}
