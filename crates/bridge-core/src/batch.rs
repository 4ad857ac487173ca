//! Materialized results and the response-writer contract

use crate::error::{BridgeError, Result};
use crate::schema::ColumnDescriptor;
use crate::types::WireValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status string that ends a statement's response, e.g. `SELECT 10` or `OK`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionTag {
    pub kind: String,
    pub rows: Option<usize>,
}

impl CompletionTag {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            rows: None,
        }
    }

    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows = Some(rows);
        self
    }

    /// Tag sent for an empty query
    pub fn ok() -> Self {
        Self::new("OK")
    }

    pub fn select(rows: usize) -> Self {
        Self::new("SELECT").with_rows(rows)
    }
}

impl fmt::Display for CompletionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rows {
            Some(rows) => write!(f, "{} {}", self.kind, rows),
            None => f.write_str(&self.kind),
        }
    }
}

/// Sink for a statement's rows, implemented by the protocol layer
pub trait DataWriter {
    type Error;

    /// Write one row; values are in column order
    fn row(&mut self, values: &[WireValue]) -> std::result::Result<(), Self::Error>;

    /// Finish the statement
    fn complete(&mut self, tag: &CompletionTag) -> std::result::Result<(), Self::Error>;
}

/// Fully materialized result of one statement
#[derive(Debug, Clone, PartialEq)]
pub struct ResultBatch {
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Vec<WireValue>>,
    tag: CompletionTag,
}

impl ResultBatch {
    /// Build a batch, rejecting rows whose width differs from the column count
    pub fn try_new(columns: Vec<ColumnDescriptor>, rows: Vec<Vec<WireValue>>) -> Result<Self> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(BridgeError::RowRead(format!(
                "row {} has {} values, expected {}",
                idx,
                row.len(),
                columns.len()
            )));
        }

        let tag = CompletionTag::select(rows.len());
        Ok(Self { columns, rows, tag })
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<WireValue>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn tag(&self) -> &CompletionTag {
        &self.tag
    }

    /// Replay the batch into `writer`: every row in order, then the completion tag
    pub fn write_to<W: DataWriter>(&self, writer: &mut W) -> std::result::Result<(), W::Error> {
        for row in &self.rows {
            writer.row(row)?;
        }
        writer.complete(&self.tag)
    }
}

/// What the bridge hands back for one query
#[derive(Debug, Clone, PartialEq)]
pub enum PreparedResponse {
    /// No rows, only a completion tag
    Complete(CompletionTag),
    /// Column descriptors plus materialized rows
    Rows(ResultBatch),
}

impl PreparedResponse {
    pub fn columns(&self) -> &[ColumnDescriptor] {
        match self {
            PreparedResponse::Complete(_) => &[],
            PreparedResponse::Rows(batch) => batch.columns(),
        }
    }

    pub fn tag(&self) -> &CompletionTag {
        match self {
            PreparedResponse::Complete(tag) => tag,
            PreparedResponse::Rows(batch) => batch.tag(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BackendColumn, ColumnDescriptor};

    #[derive(Default)]
    struct RecordingWriter {
        rows: Vec<Vec<WireValue>>,
        tags: Vec<String>,
        fail_at: Option<usize>,
    }

    impl DataWriter for RecordingWriter {
        type Error = String;

        fn row(&mut self, values: &[WireValue]) -> std::result::Result<(), String> {
            if self.fail_at == Some(self.rows.len()) {
                return Err("client went away".to_string());
            }
            self.rows.push(values.to_vec());
            Ok(())
        }

        fn complete(&mut self, tag: &CompletionTag) -> std::result::Result<(), String> {
            self.tags.push(tag.to_string());
            Ok(())
        }
    }

    fn columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::from_backend(BackendColumn::new("id", "INTEGER")),
            ColumnDescriptor::from_backend(BackendColumn::new("name", "VARCHAR")),
        ]
    }

    #[test]
    fn test_completion_tags() {
        assert_eq!(CompletionTag::ok().to_string(), "OK");
        assert_eq!(CompletionTag::select(10).to_string(), "SELECT 10");
        assert_eq!(CompletionTag::select(0).to_string(), "SELECT 0");
    }

    #[test]
    fn test_write_to_replays_rows_then_tag() {
        let rows = vec![
            vec![WireValue::Int4(1), WireValue::Text("Alice".into())],
            vec![WireValue::Int4(2), WireValue::Null],
        ];
        let batch = ResultBatch::try_new(columns(), rows.clone()).unwrap();
        assert_eq!(batch.tag().to_string(), "SELECT 2");

        let mut writer = RecordingWriter::default();
        batch.write_to(&mut writer).unwrap();
        assert_eq!(writer.rows, rows);
        assert_eq!(writer.tags, vec!["SELECT 2".to_string()]);
    }

    #[test]
    fn test_write_error_skips_completion() {
        let rows = vec![
            vec![WireValue::Int4(1), WireValue::Text("a".into())],
            vec![WireValue::Int4(2), WireValue::Text("b".into())],
        ];
        let batch = ResultBatch::try_new(columns(), rows).unwrap();

        let mut writer = RecordingWriter {
            fail_at: Some(1),
            ..Default::default()
        };
        assert!(batch.write_to(&mut writer).is_err());
        assert_eq!(writer.rows.len(), 1);
        assert!(writer.tags.is_empty());
    }

    #[test]
    fn test_row_width_must_match_columns() {
        let rows = vec![vec![WireValue::Int4(1)]];
        let err = ResultBatch::try_new(columns(), rows).unwrap_err();
        assert!(matches!(err, BridgeError::RowRead(_)));
    }

    #[test]
    fn test_prepared_response_accessors() {
        let complete = PreparedResponse::Complete(CompletionTag::ok());
        assert!(complete.columns().is_empty());
        assert_eq!(complete.tag().to_string(), "OK");

        let batch = ResultBatch::try_new(columns(), vec![]).unwrap();
        let rows = PreparedResponse::Rows(batch);
        assert_eq!(rows.columns().len(), 2);
        assert_eq!(rows.tag().to_string(), "SELECT 0");
    }
}
