mod info;
mod resolver;

pub use info::{MigrationEngine, MigrationInfo, MigrationInfoPayload, MigrationType};
pub use resolver::{
    check_statement, interactive_version, parse_migration_file, ChangeOrigin, InteractiveChange,
    MigrationFile, MigrationResolver,
};
