//! Drain a backend cursor into a [`ResultBatch`]

use crate::engine::{ExecutionContext, RowCursor};
use bridge_core::{BackendValue, BridgeError, ColumnDescriptor, Result, ResultBatch};
use tracing::debug;

/// Build the full result batch for an open cursor.
///
/// Every row is read and normalized before anything is returned; the first
/// failing row aborts the whole batch.
pub fn materialize(cursor: &mut dyn RowCursor, ctx: &ExecutionContext) -> Result<ResultBatch> {
    let columns: Vec<ColumnDescriptor> = cursor
        .columns()?
        .into_iter()
        .map(ColumnDescriptor::from_backend)
        .collect();

    let mut rows = Vec::new();
    while let Some(values) = cursor.next_row()? {
        if ctx.is_cancelled() {
            return Err(BridgeError::Cancelled);
        }
        if values.len() != columns.len() {
            return Err(BridgeError::RowRead(format!(
                "row {} has {} values, expected {}",
                rows.len(),
                values.len(),
                columns.len()
            )));
        }
        rows.push(values.into_iter().map(BackendValue::normalize).collect());
    }

    debug!("Materialized {} rows x {} columns", rows.len(), columns.len());
    ResultBatch::try_new(columns, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::MockEngine;
    use bridge_core::{BackendColumn, OtherValue, PgType, WireValue};
    use chrono::NaiveDate;

    fn columns() -> Vec<BackendColumn> {
        vec![
            BackendColumn::new("id", "INTEGER"),
            BackendColumn::new("author_name", "VARCHAR"),
            BackendColumn::new("commit_date", "DATE"),
            BackendColumn::new("payload", "BLOB"),
        ]
    }

    fn row(id: i32, author: Option<&str>) -> Result<Vec<BackendValue>> {
        Ok(vec![
            BackendValue::Integer(id),
            author
                .map(|a| BackendValue::Text(a.to_string()))
                .unwrap_or(BackendValue::Null),
            BackendValue::Other(OtherValue::Date(
                NaiveDate::from_ymd_opt(2024, 1, id as u32).unwrap(),
            )),
            BackendValue::Bytes(format!("blob-{}", id).into_bytes()),
        ])
    }

    #[test]
    fn test_materialize_builds_descriptors_and_rows() {
        let engine = MockEngine::new(columns(), vec![row(1, Some("Alice")), row(2, None)]);
        let mut cursor = engine.cursor();

        let batch = materialize(&mut cursor, &ExecutionContext::new()).unwrap();

        let names: Vec<_> = batch.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "author_name", "commit_date", "payload"]);
        let types: Vec<_> = batch.columns().iter().map(|c| c.pg_type).collect();
        assert_eq!(
            types,
            vec![PgType::Int4, PgType::Text, PgType::Date, PgType::Bytea]
        );
        assert!(batch.columns().iter().all(|c| c.width == 256));

        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.tag().to_string(), "SELECT 2");
        assert_eq!(
            batch.rows()[0],
            vec![
                WireValue::Int4(1),
                WireValue::Text("Alice".into()),
                WireValue::Text("2024-01-01".into()),
                WireValue::Text("blob-1".into()),
            ]
        );
        assert_eq!(batch.rows()[1][1], WireValue::Null);
    }

    #[test]
    fn test_empty_cursor_gives_zero_rows() {
        let engine = MockEngine::new(columns(), vec![]);
        let batch = materialize(&mut engine.cursor(), &ExecutionContext::new()).unwrap();
        assert_eq!(batch.num_columns(), 4);
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.tag().to_string(), "SELECT 0");
    }

    #[test]
    fn test_row_read_failure_aborts_batch() {
        let engine = MockEngine::new(
            columns(),
            vec![
                row(1, Some("Alice")),
                Err(BridgeError::RowRead("conversion failed".into())),
                row(3, Some("Charlie")),
            ],
        );

        let err = materialize(&mut engine.cursor(), &ExecutionContext::new()).unwrap_err();
        assert_eq!(err, BridgeError::RowRead("conversion failed".into()));
    }

    #[test]
    fn test_short_row_is_rejected() {
        let engine = MockEngine::new(
            columns(),
            vec![Ok(vec![BackendValue::Integer(1)])],
        );
        let err = materialize(&mut engine.cursor(), &ExecutionContext::new()).unwrap_err();
        assert!(matches!(err, BridgeError::RowRead(_)));
    }

    #[test]
    fn test_column_introspection_failure() {
        let engine = MockEngine::new(columns(), vec![row(1, None)])
            .with_column_error(BridgeError::ColumnIntrospection("no schema".into()));
        let err = materialize(&mut engine.cursor(), &ExecutionContext::new()).unwrap_err();
        assert!(matches!(err, BridgeError::ColumnIntrospection(_)));
    }

    #[test]
    fn test_cancelled_context_stops_draining() {
        let engine = MockEngine::new(columns(), vec![row(1, None), row(2, None)]);
        let ctx = ExecutionContext::new();
        ctx.cancel();
        let err = materialize(&mut engine.cursor(), &ctx).unwrap_err();
        assert_eq!(err, BridgeError::Cancelled);
    }
}
