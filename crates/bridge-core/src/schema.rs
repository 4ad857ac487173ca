//! Column descriptors and DuckDB to PostgreSQL type mapping

use serde::{Deserialize, Serialize};

/// Display width reported for every column; not derived from the data
pub const DEFAULT_DISPLAY_WIDTH: i16 = 256;

/// PostgreSQL types the bridge reports to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PgType {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Date,
    Time,
    Timestamp,
    Interval,
    Bytea,
    Uuid,
    Json,
    Text,
}

impl PgType {
    /// PostgreSQL type OID
    pub const fn oid(self) -> u32 {
        match self {
            PgType::Bool => 16,
            PgType::Bytea => 17,
            PgType::Int8 => 20,
            PgType::Int2 => 21,
            PgType::Int4 => 23,
            PgType::Text => 25,
            PgType::Json => 114,
            PgType::Float4 => 700,
            PgType::Float8 => 701,
            PgType::Date => 1082,
            PgType::Time => 1083,
            PgType::Timestamp => 1114,
            PgType::Interval => 1186,
            PgType::Uuid => 2950,
        }
    }
}

/// Map a DuckDB column type name to the PostgreSQL type reported for it.
///
/// Case-insensitive and total: variable-length text types and names that are
/// not recognized all map to [`PgType::Text`].
pub fn duckdb_type_to_pg(type_name: &str) -> PgType {
    match type_name.trim().to_ascii_uppercase().as_str() {
        "INTEGER" | "INT" | "INT4" | "INT32" => PgType::Int4,
        "BIGINT" | "INT8" | "INT64" => PgType::Int8,
        "SMALLINT" | "INT2" | "INT16" => PgType::Int2,
        "FLOAT" | "FLOAT4" | "REAL" => PgType::Float4,
        "DOUBLE" | "FLOAT8" => PgType::Float8,
        "BOOLEAN" | "BOOL" => PgType::Bool,
        "DATE" => PgType::Date,
        "TIME" => PgType::Time,
        "TIMESTAMP" | "TIMESTAMP WITH TIME ZONE" | "TIMESTAMPTZ" => PgType::Timestamp,
        "INTERVAL" => PgType::Interval,
        "BLOB" | "BYTEA" => PgType::Bytea,
        "UUID" => PgType::Uuid,
        "JSON" => PgType::Json,
        _ => PgType::Text,
    }
}

/// Column as reported by the backend cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendColumn {
    pub name: String,
    pub type_name: String,
}

impl BackendColumn {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Per-column metadata sent to the client ahead of row data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub backend_type: String,
    pub pg_type: PgType,
    pub width: i16,
}

impl ColumnDescriptor {
    pub fn from_backend(column: BackendColumn) -> Self {
        let pg_type = duckdb_type_to_pg(&column.type_name);
        Self {
            name: column.name,
            backend_type: column.type_name,
            pg_type,
            width: DEFAULT_DISPLAY_WIDTH,
        }
    }

    pub fn oid(&self) -> u32 {
        self.pg_type.oid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_mappings() {
        let cases = [
            ("INTEGER", PgType::Int4),
            ("int", PgType::Int4),
            ("Int4", PgType::Int4),
            ("int32", PgType::Int4),
            ("BIGINT", PgType::Int8),
            ("int8", PgType::Int8),
            ("INT64", PgType::Int8),
            ("smallint", PgType::Int2),
            ("INT2", PgType::Int2),
            ("int16", PgType::Int2),
            ("float", PgType::Float4),
            ("FLOAT4", PgType::Float4),
            ("real", PgType::Float4),
            ("DOUBLE", PgType::Float8),
            ("float8", PgType::Float8),
            ("boolean", PgType::Bool),
            ("BOOL", PgType::Bool),
            ("date", PgType::Date),
            ("TIME", PgType::Time),
            ("timestamp", PgType::Timestamp),
            ("timestamp with time zone", PgType::Timestamp),
            ("TIMESTAMPTZ", PgType::Timestamp),
            ("interval", PgType::Interval),
            ("BLOB", PgType::Bytea),
            ("bytea", PgType::Bytea),
            ("uuid", PgType::Uuid),
            ("Json", PgType::Json),
        ];

        for (name, expected) in cases {
            assert_eq!(duckdb_type_to_pg(name), expected, "type name {:?}", name);
        }
    }

    #[test]
    fn test_unknown_types_fall_back_to_text() {
        for name in ["VARCHAR", "text", "", "   ", "dEcImAl(18,3)", "STRUCT(a INT)", "🦆"] {
            assert_eq!(duckdb_type_to_pg(name), PgType::Text, "type name {:?}", name);
        }
    }

    #[test]
    fn test_mapping_is_deterministic() {
        for name in ["INTEGER", "VARCHAR", "garbage"] {
            assert_eq!(duckdb_type_to_pg(name), duckdb_type_to_pg(name));
        }
    }

    #[test]
    fn test_oids() {
        assert_eq!(PgType::Int4.oid(), 23);
        assert_eq!(PgType::Int8.oid(), 20);
        assert_eq!(PgType::Text.oid(), 25);
        assert_eq!(PgType::Timestamp.oid(), 1114);
        assert_eq!(PgType::Json.oid(), 114);
    }

    #[test]
    fn test_descriptor_from_backend_column() {
        let desc = ColumnDescriptor::from_backend(BackendColumn::new("commit_date", "DATE"));
        assert_eq!(desc.name, "commit_date");
        assert_eq!(desc.backend_type, "DATE");
        assert_eq!(desc.pg_type, PgType::Date);
        assert_eq!(desc.oid(), 1082);
        assert_eq!(desc.width, DEFAULT_DISPLAY_WIDTH);
    }

    #[test]
    fn test_descriptor_serializes() {
        let desc = ColumnDescriptor::from_backend(BackendColumn::new("id", "INTEGER"));
        let json = serde_json::to_string(&desc).unwrap();
        let back: ColumnDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, desc);
    }
}
