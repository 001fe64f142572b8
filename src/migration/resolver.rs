use log::{error, warn};

use crate::error::DbPilotError;
use crate::services::PrincipalService;
use crate::utils::Utils;
use crate::vcs::VcsPushEvent;

use super::info::{MigrationEngine, MigrationInfo, MigrationInfoPayload, MigrationType};

const VERSION_TIME_FORMAT: &str = "%Y%m%d%H%M%S";
const FILE_NAME_TEMPLATE: &str = "{VERSION}__{DB_NAME}__{TYPE}__{DESCRIPTION}.sql";

/// A change requested from the UI, identified by the task that carries it.
#[derive(Debug, Clone)]
pub struct InteractiveChange<'a> {
    pub task_id: i64,
    pub task_name: &'a str,
    /// Unix seconds at which the task was created
    pub created_ts: i64,
    pub creator_id: i64,
    pub database_name: &'a str,
    pub migration_type: MigrationType,
}

#[derive(Debug, Clone)]
pub enum ChangeOrigin<'a> {
    Interactive(InteractiveChange<'a>),
    VcsPush(&'a VcsPushEvent),
}

/// Fields decoded from a migration file path
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationFile {
    pub version: String,
    pub database: String,
    pub migration_type: MigrationType,
    pub description: String,
}

/// Derives [`MigrationInfo`] for a pending change.
pub struct MigrationResolver<'a> {
    principals: &'a dyn PrincipalService,
}

impl<'a> MigrationResolver<'a> {
    pub fn new(principals: &'a dyn PrincipalService) -> Self {
        Self { principals }
    }

    pub fn resolve(&self, origin: ChangeOrigin<'_>) -> Result<MigrationInfo, DbPilotError> {
        match origin {
            ChangeOrigin::Interactive(change) => Ok(self.resolve_interactive(&change)),
            ChangeOrigin::VcsPush(event) => Self::resolve_push_event(event),
        }
    }

    fn resolve_interactive(&self, change: &InteractiveChange<'_>) -> MigrationInfo {
        // Not critical enough to fail the migration, the creator stays blank
        let creator = Utils::log_and_discard(
            self.principals.compose_principal(change.creator_id),
            &format!(
                "Failed to fetch creator for composing the migration info (task_id {})",
                change.task_id
            ),
        )
        .map(|principal| principal.name)
        .unwrap_or_default();

        MigrationInfo {
            engine: MigrationEngine::Ui,
            migration_type: change.migration_type,
            version: interactive_version(change.created_ts, change.task_id),
            namespace: change.database_name.to_string(),
            database: change.database_name.to_string(),
            description: change.task_name.to_string(),
            creator,
            issue_id: String::new(),
            payload: String::new(),
        }
    }

    fn resolve_push_event(event: &VcsPushEvent) -> Result<MigrationInfo, DbPilotError> {
        let mut matches = event
            .file_commit
            .added
            .iter()
            .filter_map(|path| parse_migration_file(path, &event.base_directory).map(|f| (path, f)));

        let Some((_, file)) = matches.next() else {
            // The commit was validated when the issue was created, so this
            // means the stored event and the convention disagree.
            error!(
                "No added file in commit {} matches {} under '{}'",
                event.file_commit.id, FILE_NAME_TEMPLATE, event.base_directory
            );
            return Err(DbPilotError::InvalidChangeFormat(format!(
                "no added file in commit '{}' matches {} under base directory '{}'",
                event.file_commit.id, FILE_NAME_TEMPLATE, event.base_directory
            )));
        };

        for (ignored, _) in matches {
            warn!(
                "Commit {} adds more than one migration file, ignoring '{}'",
                event.file_commit.id, ignored
            );
        }

        let payload = serde_json::to_string(&MigrationInfoPayload {
            vcs_push_event: Some(event.clone()),
        })?;

        Ok(MigrationInfo {
            engine: MigrationEngine::Vcs,
            migration_type: file.migration_type,
            version: file.version,
            namespace: file.database.clone(),
            database: file.database,
            description: file.description,
            creator: event.file_commit.author_name.clone(),
            issue_id: String::new(),
            payload,
        })
    }
}

/// `YYYYMMDDhhmmss.<task id>` from the task's creation time in UTC.
///
/// The fixed-width timestamp orders versions across seconds and the task id
/// keeps versions created within the same second distinct. The same task
/// always yields the same version.
///
/// The id is not zero-padded, so within one second versions compare as
/// strings rather than by id: `...56.10` sorts before `...56.9`. Only the
/// order across seconds is meaningful.
pub fn interactive_version(created_ts: i64, task_id: i64) -> String {
    format!(
        "{}.{}",
        Utils::utc_from_unix(created_ts).format(VERSION_TIME_FORMAT),
        task_id
    )
}

/// Only a baseline may carry an empty statement. Returns the trimmed statement.
pub fn check_statement(
    migration_type: MigrationType,
    statement: &str,
) -> Result<String, DbPilotError> {
    let sql = statement.trim();
    if migration_type != MigrationType::Baseline && sql.is_empty() {
        return Err(DbPilotError::EmptyStatement);
    }
    Ok(sql.to_string())
}

/// Match `path` against `{base}/{VERSION}__{DB_NAME}__{TYPE}__{DESCRIPTION}.sql`.
///
/// The file must sit directly under `base_directory`. `VERSION` is digits and
/// dots, `TYPE` is `migrate` or `baseline`, and underscores in `DESCRIPTION`
/// become spaces.
pub fn parse_migration_file(path: &str, base_directory: &str) -> Option<MigrationFile> {
    let base = base_directory.trim_matches('/');
    let relative = if base.is_empty() {
        path.trim_start_matches('/')
    } else {
        path.trim_start_matches('/')
            .strip_prefix(base)?
            .strip_prefix('/')?
    };

    if relative.contains('/') {
        return None;
    }

    let stem = relative.strip_suffix(".sql")?;
    let mut parts = stem.splitn(4, "__");
    let version = parts.next()?;
    let database = parts.next()?;
    let migration_type = MigrationType::from_string(parts.next()?)?;
    let description = parts.next()?;

    let version_ok = version.starts_with(|c: char| c.is_ascii_digit())
        && version.chars().all(|c| c.is_ascii_digit() || c == '.');
    if !version_ok || database.is_empty() || description.is_empty() {
        return None;
    }

    Some(MigrationFile {
        version: version.to_string(),
        database: database.to_string(),
        migration_type,
        description: description.replace('_', " "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::Principal;
    use crate::vcs::FileCommit;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    struct FixedPrincipals(Option<&'static str>);

    impl PrincipalService for FixedPrincipals {
        fn compose_principal(&self, id: i64) -> Result<Principal, DbPilotError> {
            match self.0 {
                Some(name) => Ok(Principal {
                    id,
                    name: name.to_string(),
                    email: format!("{}@example.com", name.to_ascii_lowercase()),
                }),
                None => Err(DbPilotError::NotFound(format!("principal {}", id))),
            }
        }
    }

    fn change(task_id: i64, created_ts: i64) -> InteractiveChange<'static> {
        InteractiveChange {
            task_id,
            task_name: "Update shop schema",
            created_ts,
            creator_id: 101,
            database_name: "shop",
            migration_type: MigrationType::Migrate,
        }
    }

    fn push_event(added: &[&str]) -> VcsPushEvent {
        VcsPushEvent {
            vcs_type: "GITLAB_SELF_HOST".to_string(),
            base_directory: "migrations".to_string(),
            file_commit: FileCommit {
                id: "c0ffee".to_string(),
                title: "Add orders".to_string(),
                author_name: "Kim Lee".to_string(),
                author_email: "kim@example.com".to_string(),
                added: added.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_interactive_resolution() {
        let principals = FixedPrincipals(Some("Alice"));
        let resolver = MigrationResolver::new(&principals);

        // 2021-10-01 12:34:56 UTC
        let mi = resolver
            .resolve(ChangeOrigin::Interactive(change(42, 1_633_091_696)))
            .unwrap();

        assert_eq!(
            mi,
            MigrationInfo {
                engine: MigrationEngine::Ui,
                migration_type: MigrationType::Migrate,
                version: "20211001123456.42".to_string(),
                namespace: "shop".to_string(),
                database: "shop".to_string(),
                description: "Update shop schema".to_string(),
                creator: "Alice".to_string(),
                issue_id: String::new(),
                payload: String::new(),
            }
        );
    }

    #[test]
    fn test_interactive_creator_lookup_failure_is_not_fatal() {
        let principals = FixedPrincipals(None);
        let resolver = MigrationResolver::new(&principals);

        let mi = resolver
            .resolve(ChangeOrigin::Interactive(change(7, 0)))
            .unwrap();
        assert_eq!(mi.creator, "");
        assert_eq!(mi.version, "19700101000000.7");
    }

    #[test]
    fn test_interactive_baseline_keeps_type() {
        let principals = FixedPrincipals(Some("Alice"));
        let resolver = MigrationResolver::new(&principals);
        let mut c = change(1, 0);
        c.migration_type = MigrationType::Baseline;

        let mi = resolver.resolve(ChangeOrigin::Interactive(c)).unwrap();
        assert_eq!(mi.migration_type, MigrationType::Baseline);
    }

    #[test]
    fn test_push_event_resolution() {
        let principals = FixedPrincipals(None);
        let resolver = MigrationResolver::new(&principals);
        let event = push_event(&[
            "README.md",
            "migrations/0002.1__shop__migrate__create_orders_table.sql",
        ]);

        let mi = resolver.resolve(ChangeOrigin::VcsPush(&event)).unwrap();
        assert_eq!(mi.engine, MigrationEngine::Vcs);
        assert_eq!(mi.migration_type, MigrationType::Migrate);
        assert_eq!(mi.version, "0002.1");
        assert_eq!(mi.namespace, "shop");
        assert_eq!(mi.database, "shop");
        assert_eq!(mi.description, "create orders table");
        assert_eq!(mi.creator, "Kim Lee");

        let payload: MigrationInfoPayload = serde_json::from_str(&mi.payload).unwrap();
        assert_eq!(payload.vcs_push_event, Some(event));
    }

    #[test]
    fn test_push_event_first_match_wins() {
        let principals = FixedPrincipals(None);
        let resolver = MigrationResolver::new(&principals);
        let event = push_event(&[
            "migrations/0003__shop__baseline__initial.sql",
            "migrations/0004__shop__migrate__later.sql",
        ]);

        let mi = resolver.resolve(ChangeOrigin::VcsPush(&event)).unwrap();
        assert_eq!(mi.version, "0003");
        assert_eq!(mi.migration_type, MigrationType::Baseline);
    }

    #[test]
    fn test_push_event_without_matching_file() {
        let principals = FixedPrincipals(None);
        let resolver = MigrationResolver::new(&principals);
        let event = push_event(&["migrations/notes.sql", "other/0001__shop__migrate__x.sql"]);

        let err = resolver.resolve(ChangeOrigin::VcsPush(&event)).unwrap_err();
        assert!(matches!(err, DbPilotError::InvalidChangeFormat(_)));
    }

    #[test]
    fn test_parse_migration_file() {
        assert_eq!(
            parse_migration_file("migrations/1.2__db1__MIGRATE__add_col.sql", "migrations/"),
            Some(MigrationFile {
                version: "1.2".to_string(),
                database: "db1".to_string(),
                migration_type: MigrationType::Migrate,
                description: "add col".to_string(),
            })
        );

        // Description may itself contain the separator
        assert_eq!(
            parse_migration_file("0001__db1__migrate__a__b.sql", "")
                .map(|f| f.description),
            Some("a  b".to_string())
        );

        // Rejections
        assert_eq!(parse_migration_file("migrations/sub/0001__db__migrate__x.sql", "migrations"), None);
        assert_eq!(parse_migration_file("migrationsx/0001__db__migrate__x.sql", "migrations"), None);
        assert_eq!(parse_migration_file("migrations/0001__db__migrate__x.txt", "migrations"), None);
        assert_eq!(parse_migration_file("migrations/v1__db__migrate__x.sql", "migrations"), None);
        assert_eq!(parse_migration_file("migrations/0001__db__data__x.sql", "migrations"), None);
        assert_eq!(parse_migration_file("migrations/0001____migrate__x.sql", "migrations"), None);
        assert_eq!(parse_migration_file("migrations/0001__db__migrate.sql", "migrations"), None);
    }

    #[test]
    fn test_check_statement() {
        assert_eq!(
            check_statement(MigrationType::Migrate, "  CREATE TABLE t (id INT);\n").unwrap(),
            "CREATE TABLE t (id INT);"
        );
        assert!(matches!(
            check_statement(MigrationType::Migrate, "  \n "),
            Err(DbPilotError::EmptyStatement)
        ));
        assert_eq!(check_statement(MigrationType::Baseline, "").unwrap(), "");
    }

    #[test]
    fn test_same_second_versions_compare_as_strings() {
        let ninth = interactive_version(1633091696, 9);
        let tenth = interactive_version(1633091696, 10);

        assert_eq!(ninth, "20211001123456.9");
        assert_eq!(tenth, "20211001123456.10");
        assert!(tenth < ninth);
        assert!(ninth < interactive_version(1633091697, 1));
    }

    proptest! {
        #[test]
        fn prop_versions_in_same_second_are_distinct(
            ts in 0i64..4_102_444_800,
            a in 1i64..1_000_000,
            b in 1i64..1_000_000,
        ) {
            prop_assume!(a != b);
            prop_assert_ne!(interactive_version(ts, a), interactive_version(ts, b));
        }

        #[test]
        fn prop_later_seconds_sort_after(
            ts in 0i64..4_102_444_800,
            delta in 1i64..10_000_000,
            a in 1i64..1_000_000,
            b in 1i64..1_000_000,
        ) {
            prop_assert!(interactive_version(ts, a) < interactive_version(ts + delta, b));
        }

        #[test]
        fn prop_version_is_deterministic(ts in 0i64..4_102_444_800, id in 1i64..1_000_000) {
            prop_assert_eq!(interactive_version(ts, id), interactive_version(ts, id));
        }
    }
}
