pub mod dir;
pub mod migrations;

pub use dir::collect_sql_files;
pub use migrations::{AppliedMigration, MigrationOutcome, MigrationStore};
