//! Bridge results to pgwire responses

use bridge_core::{
    BridgeError, ColumnDescriptor, CompletionTag, DataWriter, PgType, PreparedResponse, WireValue,
};
use pgwire::api::Type;
use pgwire::api::results::{DataRowEncoder, FieldFormat, FieldInfo, QueryResponse, Response, Tag};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};
use pgwire::messages::data::DataRow;
use std::sync::Arc;

/// pgwire type for a bridge column type
pub fn pg_type(pg_type: PgType) -> Type {
    match pg_type {
        PgType::Bool => Type::BOOL,
        PgType::Int2 => Type::INT2,
        PgType::Int4 => Type::INT4,
        PgType::Int8 => Type::INT8,
        PgType::Float4 => Type::FLOAT4,
        PgType::Float8 => Type::FLOAT8,
        PgType::Date => Type::DATE,
        PgType::Time => Type::TIME,
        PgType::Timestamp => Type::TIMESTAMP,
        PgType::Interval => Type::INTERVAL,
        PgType::Bytea => Type::BYTEA,
        PgType::Uuid => Type::UUID,
        PgType::Json => Type::JSON,
        PgType::Text => Type::TEXT,
    }
}

/// Build the RowDescription fields for a set of column descriptors
pub fn descriptors_to_field_info(columns: &[ColumnDescriptor]) -> Vec<FieldInfo> {
    columns
        .iter()
        .map(|column| {
            FieldInfo::new(
                column.name.clone(),
                None,
                None,
                pg_type(column.pg_type),
                FieldFormat::Text,
            )
        })
        .collect()
}

/// Client-facing error carrying the SQLSTATE of `err`
pub fn bridge_error(err: BridgeError) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".to_string(),
        err.sqlstate().to_string(),
        err.to_string(),
    )))
}

fn encode_value(encoder: &mut DataRowEncoder, value: &WireValue) -> PgWireResult<()> {
    match value {
        WireValue::Null => encoder.encode_field::<Option<&str>>(&None),
        WireValue::Bool(v) => encoder.encode_field(v),
        WireValue::Int2(v) => encoder.encode_field(v),
        WireValue::Int4(v) => encoder.encode_field(v),
        WireValue::Int8(v) => encoder.encode_field(v),
        WireValue::Float4(v) => encoder.encode_field(v),
        WireValue::Float8(v) => encoder.encode_field(v),
        WireValue::Text(v) => encoder.encode_field(v),
    }
}

/// [`DataWriter`] that encodes rows into pgwire DataRows
pub struct PgRowWriter {
    fields: Arc<Vec<FieldInfo>>,
    rows: Vec<PgWireResult<DataRow>>,
    tag: Option<CompletionTag>,
}

impl PgRowWriter {
    pub fn new(columns: &[ColumnDescriptor]) -> Self {
        Self {
            fields: Arc::new(descriptors_to_field_info(columns)),
            rows: Vec::new(),
            tag: None,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Completion tag, once the batch has been fully written
    pub fn tag(&self) -> Option<&CompletionTag> {
        self.tag.as_ref()
    }

    /// pgwire appends the row count to the `SELECT` command tag itself
    pub fn into_response<'a>(self) -> Response<'a> {
        Response::Query(QueryResponse::new(
            self.fields,
            futures::stream::iter(self.rows),
        ))
    }
}

impl DataWriter for PgRowWriter {
    type Error = PgWireError;

    fn row(&mut self, values: &[WireValue]) -> PgWireResult<()> {
        let mut encoder = DataRowEncoder::new(Arc::clone(&self.fields));
        for value in values {
            encode_value(&mut encoder, value)?;
        }
        self.rows.push(encoder.finish());
        Ok(())
    }

    fn complete(&mut self, tag: &CompletionTag) -> PgWireResult<()> {
        self.tag = Some(tag.clone());
        Ok(())
    }
}

/// Turn a bridge response into the pgwire response for one statement
pub fn into_pg_response<'a>(prepared: &PreparedResponse) -> PgWireResult<Response<'a>> {
    match prepared {
        PreparedResponse::Complete(tag) => Ok(Response::Execution(Tag::new(&tag.kind))),
        PreparedResponse::Rows(batch) => {
            let mut writer = PgRowWriter::new(batch.columns());
            batch.write_to(&mut writer)?;
            Ok(writer.into_response())
        }
    }
}
