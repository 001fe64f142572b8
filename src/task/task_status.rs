use serde::{Deserialize, Serialize};

/// Terminal state of one executor invocation, as reported to the scheduler
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Done,
    Failed,
}

impl TaskStatus {
    pub fn full_name(&self) -> &'static str {
        match self {
            TaskStatus::Done => "Done",
            TaskStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_name())
    }
}
