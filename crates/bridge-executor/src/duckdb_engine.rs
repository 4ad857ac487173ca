//! DuckDB backend

use crate::engine::{ExecutionContext, QueryEngine, RowCursor};
use bridge_core::{BackendColumn, BackendValue, BridgeError, OtherValue, Result};
use chrono::{DateTime, NaiveDate, NaiveTime};
use duckdb::arrow::datatypes::DataType;
use duckdb::types::{TimeUnit, ValueRef};
use duckdb::{Connection, Rows};
use parking_lot::Mutex;
use std::path::Path;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

/// Days from 0001-01-01 to 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

const MICROS_PER_DAY: i64 = 86_400_000_000;

/// DuckDB stores `infinity` dates and timestamps as the type's maximum
/// and `-infinity` as its negation.
const DATE_INFINITY: i32 = i32::MAX;
const TIMESTAMP_INFINITY: i64 = i64::MAX;

/// Query engine over one DuckDB database.
///
/// Every statement runs on its own clone of the root connection, so
/// statements from different client connections never share a connection.
pub struct DuckDbEngine {
    root: Mutex<Connection>,
}

impl DuckDbEngine {
    /// Open (or create) the database file at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            BridgeError::Connection(format!(
                "Failed to open DuckDB database {}: {}",
                path.display(),
                e
            ))
        })?;
        info!("Opened DuckDB database: {}", path.display());
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| BridgeError::Connection(format!("Failed to open in-memory DuckDB: {}", e)))?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            root: Mutex::new(conn),
        }
    }

    /// Check that the database answers a trivial query
    pub fn ping(&self) -> Result<()> {
        self.execute_batch("SELECT 1")
    }

    /// Run one or more statements, discarding any results
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(sql)
            .map_err(|e| BridgeError::QueryExecution(e.to_string()))
    }

    fn connection(&self) -> Result<Connection> {
        self.root
            .lock()
            .try_clone()
            .map_err(|e| BridgeError::Connection(e.to_string()))
    }
}

impl QueryEngine for DuckDbEngine {
    fn run_query(
        &self,
        sql: &str,
        ctx: &ExecutionContext,
        consume: &mut dyn FnMut(&mut dyn RowCursor) -> Result<()>,
    ) -> Result<()> {
        if ctx.is_cancelled() {
            return Err(BridgeError::Cancelled);
        }

        let conn = self.connection()?;
        let _interrupt = interrupt_on_cancel(&conn, ctx);

        let execution_error = |e: duckdb::Error| {
            if ctx.is_cancelled() {
                BridgeError::Cancelled
            } else {
                BridgeError::QueryExecution(e.to_string())
            }
        };

        let described = describe_result_types(&conn, sql);

        let mut stmt = conn.prepare(sql).map_err(execution_error)?;
        let rows = stmt.query([]).map_err(execution_error)?;
        let mut cursor = DuckDbCursor::new(rows, described);
        consume(&mut cursor)
    }
}

/// DuckDB's own `(name, type)` pairs for the result columns of `sql`.
///
/// The Arrow export folds several logical types into plain ones (`UUID` and
/// `JSON` arrive as `Utf8`, `HUGEINT` as a decimal), so the names are taken
/// from `DESCRIBE` instead. Statements DuckDB cannot describe yield `None`.
fn describe_result_types(conn: &Connection, sql: &str) -> Option<Vec<(String, String)>> {
    let describe = format!("DESCRIBE {}", sql.trim().trim_end_matches(';'));
    let mut stmt = conn.prepare(&describe).ok()?;
    let mut rows = stmt.query([]).ok()?;

    let mut described = Vec::new();
    while let Some(row) = rows.next().ok()? {
        let name: String = row.get(0).ok()?;
        let type_name: String = row.get(1).ok()?;
        described.push((name, type_name));
    }
    Some(described)
}

/// Interrupt the connection's running query once `ctx` is cancelled.
///
/// The watcher task ends when the returned guard is dropped. Outside a tokio
/// runtime there is nobody to deliver the cancellation, so nothing is armed.
fn interrupt_on_cancel(conn: &Connection, ctx: &ExecutionContext) -> Option<DropGuard> {
    let runtime = tokio::runtime::Handle::try_current().ok()?;
    let interrupt = conn.interrupt_handle();
    let cancelled = ctx.token().clone();
    let finished = CancellationToken::new();
    let done = finished.clone();

    runtime.spawn(async move {
        tokio::select! {
            _ = cancelled.cancelled() => {
                debug!("Interrupting DuckDB query");
                interrupt.interrupt();
            }
            _ = done.cancelled() => {}
        }
    });

    Some(finished.drop_guard())
}

struct DuckDbCursor<'stmt> {
    rows: Rows<'stmt>,
    width: usize,
    /// Per column: a timestamp carrying a time zone
    zoned: Vec<bool>,
    described: Option<Vec<(String, String)>>,
}

impl<'stmt> DuckDbCursor<'stmt> {
    fn new(rows: Rows<'stmt>, described: Option<Vec<(String, String)>>) -> Self {
        let (width, zoned) = match rows.as_ref() {
            Some(stmt) => {
                let width = stmt.column_count();
                let zoned = (0..width)
                    .map(|idx| matches!(stmt.column_type(idx), DataType::Timestamp(_, Some(_))))
                    .collect();
                (width, zoned)
            }
            None => (0, Vec::new()),
        };
        Self {
            rows,
            width,
            zoned,
            described,
        }
    }
}

impl RowCursor for DuckDbCursor<'_> {
    fn columns(&self) -> Result<Vec<BackendColumn>> {
        let stmt = self.rows.as_ref().ok_or_else(|| {
            BridgeError::ColumnIntrospection("statement has no result set".to_string())
        })?;

        let names = stmt.column_names();
        // DESCRIBE only counts when it describes exactly these columns
        let described = self.described.as_ref().filter(|described| {
            described.len() == names.len()
                && described.iter().zip(&names).all(|((d, _), name)| d == name)
        });

        Ok(names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| {
                let type_name = match described {
                    Some(described) => described[idx].1.clone(),
                    None => duckdb_type_name(&stmt.column_type(idx)),
                };
                BackendColumn::new(name, type_name)
            })
            .collect())
    }

    fn next_row(&mut self) -> Result<Option<Vec<BackendValue>>> {
        let width = self.width;
        let row = match self.rows.next() {
            Ok(Some(row)) => row,
            Ok(None) => return Ok(None),
            Err(e) => return Err(BridgeError::RowRead(e.to_string())),
        };

        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            let value = row
                .get_ref(idx)
                .map_err(|e| BridgeError::RowRead(format!("column {}: {}", idx, e)))?;
            let zoned = self.zoned.get(idx).copied().unwrap_or(false);
            values.push(backend_value(value, zoned));
        }
        Ok(Some(values))
    }
}

/// DuckDB's name for the Arrow type it reports for a result column
fn duckdb_type_name(data_type: &DataType) -> String {
    let name = match data_type {
        DataType::Boolean => "BOOLEAN",
        DataType::Int8 => "TINYINT",
        DataType::Int16 => "SMALLINT",
        DataType::Int32 => "INTEGER",
        DataType::Int64 => "BIGINT",
        DataType::UInt8 => "UTINYINT",
        DataType::UInt16 => "USMALLINT",
        DataType::UInt32 => "UINTEGER",
        DataType::UInt64 => "UBIGINT",
        DataType::Float16 | DataType::Float32 => "FLOAT",
        DataType::Float64 => "DOUBLE",
        DataType::Utf8 | DataType::LargeUtf8 => "VARCHAR",
        DataType::Binary | DataType::LargeBinary | DataType::FixedSizeBinary(_) => "BLOB",
        DataType::Date32 | DataType::Date64 => "DATE",
        DataType::Time32(_) | DataType::Time64(_) => "TIME",
        DataType::Timestamp(_, None) => "TIMESTAMP",
        DataType::Timestamp(_, Some(_)) => "TIMESTAMP WITH TIME ZONE",
        DataType::Interval(_) | DataType::Duration(_) => "INTERVAL",
        DataType::Null => "NULL",
        DataType::Decimal128(precision, scale) | DataType::Decimal256(precision, scale) => {
            return format!("DECIMAL({},{})", precision, scale);
        }
        other => return other.to_string().to_uppercase(),
    };
    name.to_string()
}

fn backend_value(value: ValueRef<'_>, zoned: bool) -> BackendValue {
    match value {
        ValueRef::Null => BackendValue::Null,
        ValueRef::Boolean(v) => BackendValue::Boolean(v),
        ValueRef::TinyInt(v) => BackendValue::SmallInt(v.into()),
        ValueRef::SmallInt(v) => BackendValue::SmallInt(v),
        ValueRef::Int(v) => BackendValue::Integer(v),
        ValueRef::BigInt(v) => BackendValue::BigInt(v),
        ValueRef::UTinyInt(v) => BackendValue::SmallInt(v.into()),
        ValueRef::USmallInt(v) => BackendValue::Integer(v.into()),
        ValueRef::UInt(v) => BackendValue::BigInt(v.into()),
        ValueRef::UBigInt(v) => BackendValue::Other(OtherValue::UnsignedBigInt(v)),
        ValueRef::HugeInt(v) => BackendValue::Other(OtherValue::HugeInt(v)),
        ValueRef::Float(v) => BackendValue::Real(v),
        ValueRef::Double(v) => BackendValue::Double(v),
        ValueRef::Decimal(v) => BackendValue::Other(OtherValue::Decimal(v.to_string())),
        ValueRef::Text(bytes) => BackendValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => BackendValue::Bytes(bytes.to_vec()),
        ValueRef::Date32(days) => date_value(days),
        ValueRef::Time64(unit, v) => time_value(to_micros(unit, v)),
        ValueRef::Timestamp(unit, v) => timestamp_value(unit, v, zoned),
        ValueRef::Interval {
            months,
            days,
            nanos,
        } => BackendValue::Other(OtherValue::Interval {
            months,
            days,
            nanos,
        }),
        other => BackendValue::Other(OtherValue::Rendered(format!("{:?}", other))),
    }
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

fn rendered(text: impl Into<String>) -> BackendValue {
    BackendValue::Other(OtherValue::Rendered(text.into()))
}

fn date_value(days: i32) -> BackendValue {
    if days == DATE_INFINITY {
        return rendered("infinity");
    }
    if days == -DATE_INFINITY {
        return rendered("-infinity");
    }

    let date = days
        .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt);
    match date {
        Some(date) => BackendValue::Other(OtherValue::Date(date)),
        None => rendered(civil_date_text(days.into())),
    }
}

/// A time of day; `24:00:00` and other values outside one day are kept as clock text
fn time_value(micros: i64) -> BackendValue {
    if !(0..MICROS_PER_DAY).contains(&micros) {
        return rendered(clock_text(micros));
    }

    let secs = u32::try_from(micros / 1_000_000).ok();
    let nanos = u32::try_from((micros % 1_000_000) * 1_000).ok();
    match secs
        .zip(nanos)
        .and_then(|(secs, nanos)| NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos))
    {
        Some(time) => BackendValue::Other(OtherValue::Time(time)),
        None => rendered(clock_text(micros)),
    }
}

fn timestamp_value(unit: TimeUnit, raw: i64, zoned: bool) -> BackendValue {
    if raw == TIMESTAMP_INFINITY {
        return rendered("infinity");
    }
    if raw == -TIMESTAMP_INFINITY {
        return rendered("-infinity");
    }

    let micros = to_micros(unit, raw);
    match DateTime::from_timestamp_micros(micros) {
        Some(ts) if zoned => BackendValue::Other(OtherValue::TimestampTz(ts.naive_utc())),
        Some(ts) => BackendValue::Other(OtherValue::Timestamp(ts.naive_utc())),
        None => {
            let text = format!(
                "{} {}",
                civil_date_text(micros.div_euclid(MICROS_PER_DAY)),
                clock_text(micros.rem_euclid(MICROS_PER_DAY))
            );
            rendered(if zoned { text + "+00" } else { text })
        }
    }
}

/// `HH:MM:SS[.ffffff]` for a signed count of microseconds; hours are not wrapped
fn clock_text(micros: i64) -> String {
    let sign = if micros < 0 { "-" } else { "" };
    let micros = micros.unsigned_abs();
    let secs = micros / 1_000_000;
    let frac = micros % 1_000_000;

    let mut text = format!(
        "{}{:02}:{:02}:{:02}",
        sign,
        secs / 3600,
        (secs / 60) % 60,
        secs % 60
    );
    if frac > 0 {
        text.push_str(format!(".{:06}", frac).trim_end_matches('0'));
    }
    text
}

/// `YYYY-MM-DD` for days since 1970-01-01 on the proleptic Gregorian calendar.
///
/// Covers the whole range DuckDB can store, which is wider than chrono's.
fn civil_date_text(days: i64) -> String {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    format!("{:04}-{:02}-{:02}", year, month, day)
}
