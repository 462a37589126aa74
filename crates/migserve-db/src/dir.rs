//! Discovery of `.sql` migration files on the local filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use migserve_common::{Error, Result};

fn is_sql_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "sql")
}

/// A migration source must exist and be a directory or a single `.sql` file.
pub(crate) fn validate_migration_path(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::NotFound(format!(
            "migration path {}",
            path.display()
        )));
    }
    if path.is_dir() || is_sql_file(path) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "{} is neither a directory nor a .sql file",
            path.display()
        )))
    }
}

/// Collect `.sql` files under `root`, recursively, sorted by file name.
pub fn collect_sql_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut to_visit = vec![root.to_path_buf()];

    while let Some(current) = to_visit.pop() {
        if current.is_dir() {
            for entry in fs::read_dir(&current)? {
                to_visit.push(entry?.path());
            }
        } else if is_sql_file(&current) {
            files.push(current);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Tracking id of `file`: its path relative to `root`, or its file name
/// when `root` is the file itself.
pub(crate) fn migration_id(root: &Path, file: &Path) -> String {
    let relative = match file.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel,
        _ => Path::new(file.file_name().unwrap_or(file.as_os_str())),
    };
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::MigrationStore;

    #[test]
    fn collects_nested_sql_files_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("002_users.sql"), "").unwrap();
        fs::write(dir.path().join("nested/001_init.sql"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = collect_sql_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| migration_id(dir.path(), f))
            .collect();
        assert_eq!(names, ["nested/001_init.sql", "002_users.sql"]);
    }

    #[test]
    fn single_file_id_is_its_name() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("001_init.sql");
        assert_eq!(migration_id(&file, &file), "001_init.sql");
    }

    #[test]
    fn missing_path_is_not_found() {
        let store = MigrationStore::in_memory().unwrap();
        let err = store
            .apply_dir(Path::new("./definitely_missing_migrations/"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn non_sql_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("invalid_migration.txt");
        fs::write(&file, "this is not sql").unwrap();

        let store = MigrationStore::in_memory().unwrap();
        assert!(matches!(
            store.apply_dir(&file),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn empty_directory_applies_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = MigrationStore::in_memory().unwrap();
        assert!(!store.apply_dir(dir.path()).unwrap());
    }

    #[test]
    fn apply_dir_runs_new_files_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("001_initial_schema.sql"),
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);",
        )
        .unwrap();
        fs::write(
            dir.path().join("002_seed.sql"),
            "INSERT INTO users (name) VALUES ('ada'), ('grace');",
        )
        .unwrap();

        let store = MigrationStore::in_memory().unwrap();
        assert!(store.apply_dir(dir.path()).unwrap());
        assert!(!store.apply_dir(dir.path()).unwrap());
        assert_eq!(store.query_i64("SELECT COUNT(*) FROM users").unwrap(), 2);

        fs::write(
            dir.path().join("003_more.sql"),
            "INSERT INTO users (name) VALUES ('linus');",
        )
        .unwrap();
        assert!(store.apply_dir(dir.path()).unwrap());
        assert_eq!(store.query_i64("SELECT COUNT(*) FROM users").unwrap(), 3);
    }

    #[test]
    fn empty_placeholder_file_does_not_stop_the_run() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("001_init.sql"), "CREATE TABLE items (x);").unwrap();
        fs::write(dir.path().join("002_placeholder.sql"), "").unwrap();
        fs::write(
            dir.path().join("003_more.sql"),
            "INSERT INTO items (x) VALUES (1);",
        )
        .unwrap();

        let store = MigrationStore::in_memory().unwrap();
        assert!(store.apply_dir(dir.path()).unwrap());

        let ids: Vec<_> = store.applied().unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, ["001_init.sql", "002_placeholder.sql", "003_more.sql"]);
        assert_eq!(store.query_i64("SELECT COUNT(*) FROM items").unwrap(), 1);
    }

    #[test]
    fn single_sql_file_can_be_applied() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("001_init.sql");
        fs::write(&file, "CREATE TABLE solo (x);").unwrap();

        let store = MigrationStore::in_memory().unwrap();
        assert!(store.apply_dir(&file).unwrap());
        assert!(store.is_applied("001_init.sql").unwrap());
    }
}
