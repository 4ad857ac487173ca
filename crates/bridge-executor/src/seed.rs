//! Sample database for local testing

use crate::duckdb_engine::DuckDbEngine;
use bridge_core::Result;
use tracing::info;

/// Schema and rows loaded by [`seed_sample_database`]
pub const SAMPLE_DATABASE_SQL: &str = "
CREATE TABLE IF NOT EXISTS commits (
    id INTEGER PRIMARY KEY,
    author_name VARCHAR,
    commit_message VARCHAR,
    commit_date DATE,
    additions INTEGER,
    deletions INTEGER,
    file_path VARCHAR
);

INSERT INTO commits VALUES
    (1, 'Alice', 'Initial commit', '2024-01-01', 100, 0, 'main.go'),
    (2, 'Bob', 'Add README', '2024-01-02', 50, 5, 'README.md'),
    (3, 'Alice', 'Fix bug in parser', '2024-01-03', 25, 10, 'parser/parser.go'),
    (4, 'Charlie', 'Add tests', '2024-01-04', 200, 20, 'tests/test_main.go'),
    (5, 'Bob', 'Update dependencies', '2024-01-05', 30, 45, 'go.mod'),
    (6, 'Alice', 'Refactor handlers', '2024-01-06', 80, 60, 'handlers/api.go'),
    (7, 'Diana', 'Add documentation', '2024-01-07', 150, 10, 'docs/README.md'),
    (8, 'Charlie', 'Performance optimization', '2024-01-08', 40, 25, 'core/engine.go'),
    (9, 'Bob', 'Fix security issue', '2024-01-09', 15, 8, 'auth/auth.go'),
    (10, 'Alice', 'Add new feature', '2024-01-10', 120, 30, 'features/new.go');

CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY,
    name VARCHAR,
    description VARCHAR,
    stars INTEGER,
    forks INTEGER
);

INSERT INTO projects VALUES
    (1, 'rill', 'BI-as-code platform', 5000, 350),
    (2, 'duckdb', 'In-process SQL OLAP database', 15000, 1200),
    (3, 'psql-wire', 'PostgreSQL wire protocol', 500, 50);
";

/// Create and fill the `commits` and `projects` tables.
///
/// Meant for a fresh database; seeding twice fails on the primary keys.
pub fn seed_sample_database(engine: &DuckDbEngine) -> Result<()> {
    engine.execute_batch(SAMPLE_DATABASE_SQL)?;
    info!("Seeded sample tables: commits (10 rows), projects (3 rows)");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ExecutionContext;
    use crate::executor::QueryExecutor;
    use bridge_core::{BridgeError, WireValue};
    use std::sync::Arc;

    #[test]
    fn test_seed_creates_tables() {
        let engine = Arc::new(DuckDbEngine::open_in_memory().unwrap());
        seed_sample_database(&engine).unwrap();

        let executor = QueryExecutor::new(engine);
        let ctx = ExecutionContext::new();
        let projects = executor
            .execute("SELECT name, stars FROM projects ORDER BY id", &ctx)
            .unwrap();
        assert_eq!(projects.num_rows(), 3);
        assert_eq!(
            projects.rows()[1],
            vec![WireValue::Text("duckdb".into()), WireValue::Int4(15000)]
        );

        let authors = executor
            .execute("SELECT count(DISTINCT author_name) AS n FROM commits", &ctx)
            .unwrap();
        assert_eq!(authors.rows()[0][0], WireValue::Int8(4));
    }

    #[test]
    fn test_seed_twice_fails() {
        let engine = DuckDbEngine::open_in_memory().unwrap();
        seed_sample_database(&engine).unwrap();
        let err = seed_sample_database(&engine).unwrap_err();
        assert!(matches!(err, BridgeError::QueryExecution(_)));
    }
}
