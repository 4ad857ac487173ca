//! Backend and wire value model
//!
//! [`BackendValue`] is what a row cursor yields for one cell. [`WireValue`] is
//! what the PostgreSQL side is allowed to see. [`BackendValue::normalize`] is
//! the only way from one to the other.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;

/// A single cell as reported by the backend engine
#[derive(Debug, Clone, PartialEq)]
pub enum BackendValue {
    Null,
    Boolean(bool),
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    Real(f32),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    Other(OtherValue),
}

/// Backend values with no direct wire counterpart; sent as text
#[derive(Debug, Clone, PartialEq)]
pub enum OtherValue {
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    /// A UTC instant from a zoned timestamp column
    TimestampTz(NaiveDateTime),
    Interval { months: i32, days: i32, nanos: i64 },
    HugeInt(i128),
    UnsignedBigInt(u64),
    Decimal(String),
    /// Backend-rendered form of anything else (lists, structs, enums, ...)
    Rendered(String),
}

/// A cell in the form handed to the protocol layer
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Null,
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float4(f32),
    Float8(f64),
    Text(String),
}

impl BackendValue {
    /// Convert into the protocol-acceptable representation.
    ///
    /// Numbers and booleans keep their native width, raw bytes are decoded
    /// as UTF-8 text and everything else is sent in its textual form.
    pub fn normalize(self) -> WireValue {
        match self {
            BackendValue::Null => WireValue::Null,
            BackendValue::Boolean(v) => WireValue::Bool(v),
            BackendValue::SmallInt(v) => WireValue::Int2(v),
            BackendValue::Integer(v) => WireValue::Int4(v),
            BackendValue::BigInt(v) => WireValue::Int8(v),
            BackendValue::Real(v) => WireValue::Float4(v),
            BackendValue::Double(v) => WireValue::Float8(v),
            BackendValue::Text(v) => WireValue::Text(v),
            BackendValue::Bytes(v) => WireValue::Text(decode_bytes(v)),
            BackendValue::Other(v) => WireValue::Text(v.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, BackendValue::Null)
    }
}

impl WireValue {
    pub fn is_null(&self) -> bool {
        matches!(self, WireValue::Null)
    }
}

/// Decode a raw payload as text without copying when it is valid UTF-8
fn decode_bytes(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

impl fmt::Display for OtherValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OtherValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            OtherValue::Time(t) => write!(f, "{}", t),
            OtherValue::Timestamp(ts) => write!(f, "{}", ts),
            OtherValue::TimestampTz(ts) => write!(f, "{}+00", ts),
            OtherValue::Interval {
                months,
                days,
                nanos,
            } => fmt_interval(f, *months, *days, *nanos),
            OtherValue::HugeInt(v) => write!(f, "{}", v),
            OtherValue::UnsignedBigInt(v) => write!(f, "{}", v),
            OtherValue::Decimal(v) | OtherValue::Rendered(v) => f.write_str(v),
        }
    }
}

/// Render an interval the way PostgreSQL prints one, e.g. `1 year 2 mons 3 days 04:05:06`
fn fmt_interval(f: &mut fmt::Formatter<'_>, months: i32, days: i32, nanos: i64) -> fmt::Result {
    let mut parts = Vec::new();

    let years = months / 12;
    let mons = months % 12;
    if years != 0 {
        parts.push(format!("{} year{}", years, plural(years)));
    }
    if mons != 0 {
        parts.push(format!("{} mon{}", mons, plural(mons)));
    }
    if days != 0 {
        parts.push(format!("{} day{}", days, plural(days)));
    }

    if nanos != 0 || parts.is_empty() {
        let sign = if nanos < 0 { "-" } else { "" };
        let micros = nanos.unsigned_abs() / 1_000;
        let secs = micros / 1_000_000;
        let frac = micros % 1_000_000;
        let mut clock = format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        );
        if frac > 0 {
            let digits = format!("{:06}", frac);
            clock.push('.');
            clock.push_str(digits.trim_end_matches('0'));
        }
        parts.push(clock);
    }

    f.write_str(&parts.join(" "))
}

fn plural(n: i32) -> &'static str {
    if n.abs() == 1 { "" } else { "s" }
}
