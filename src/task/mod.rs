mod model;
mod schema_update_task;
mod settings;
mod task_status;
mod traits;

pub use model::{Instance, TargetDatabase, Task};
pub use schema_update_task::SchemaUpdateTaskExecutor;
pub use settings::SchemaUpdateSettings;
pub use task_status::TaskStatus;
pub use traits::{contain_faults, TaskExecutor, TaskOutcome};
