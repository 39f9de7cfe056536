// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Value type for textsql - typed scalars flowing through a pipeline
//!
//! A [`Value`] always carries one of five fixed types. There is no NULL:
//! every type has an *empty* value (`0`, `0.0`, `""`, `false`, the Unix
//! epoch) used where a result has no input to draw from.

use std::cmp::Ordering;
use std::fmt::{self, Write as _};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::error::{Error, Result};
use super::types::DataType;

/// Timestamp formats supported for parsing
/// Order matters - more specific formats first
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z", // RFC3339 with fractional seconds
    "%Y-%m-%dT%H:%M:%S%:z",    // RFC3339
    "%Y-%m-%dT%H:%M:%S%.fZ",   // RFC3339 UTC with fractional seconds
    "%Y-%m-%dT%H:%M:%SZ",      // RFC3339 UTC
    "%Y-%m-%dT%H:%M:%S%.f",    // ISO without timezone
    "%Y-%m-%d %H:%M:%S%.f",    // SQL-style with fractional seconds
    "%Y/%m/%d %H:%M:%S",       // Alternative with slashes
    "%d/%b/%Y:%H:%M:%S %z",    // Common log format
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Display layout for timestamps; `%.f` prints nothing for whole seconds
const DISPLAY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A typed runtime value
///
/// Text uses `Arc<str>` so rows can be cloned cheaply between stages.
#[derive(Debug, Clone)]
pub enum Value {
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 text
    Text(Arc<str>),
    /// Boolean
    Boolean(bool),
    /// Date and time in UTC
    Timestamp(DateTime<Utc>),
}

impl Value {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create an integer value
    pub fn integer(value: i64) -> Self {
        Value::Integer(value)
    }

    /// Create a float value
    pub fn float(value: f64) -> Self {
        Value::Float(value)
    }

    /// Create a text value
    pub fn text(value: impl Into<Arc<str>>) -> Self {
        Value::Text(value.into())
    }

    /// Create a boolean value
    pub fn boolean(value: bool) -> Self {
        Value::Boolean(value)
    }

    /// Create a timestamp value
    pub fn timestamp(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }

    /// The empty value of a type, used for empty aggregates and defaults
    pub fn empty(data_type: DataType) -> Self {
        match data_type {
            DataType::Integer => Value::Integer(0),
            DataType::Float => Value::Float(0.0),
            DataType::Text => Value::Text(Arc::from("")),
            DataType::Boolean => Value::Boolean(false),
            DataType::Timestamp => Value::Timestamp(DateTime::<Utc>::default()),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The type of this value
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Integer(_) => DataType::Integer,
            Value::Float(_) => DataType::Float,
            Value::Text(_) => DataType::Text,
            Value::Boolean(_) => DataType::Boolean,
            Value::Timestamp(_) => DataType::Timestamp,
        }
    }

    /// Integer payload, widening nothing
    pub fn as_int64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric payload as f64 (Integer or Float)
    pub fn as_float64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Text payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean payload
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Timestamp payload
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    // =========================================================================
    // Conversion
    // =========================================================================

    /// Convert this value to `target`.
    ///
    /// `format` is a chrono format string used when converting between
    /// Text and Timestamp. Failures carry the source type, the target type
    /// and the offending value.
    pub fn convert_to(&self, target: DataType, format: Option<&str>) -> Result<Value> {
        let source = self.data_type();
        if source == target && format.is_none() {
            return Ok(self.clone());
        }
        let fail = || Error::conversion(source, target, self.to_display_string());

        match (self, target) {
            (_, DataType::Text) => match (self, format) {
                (Value::Timestamp(t), Some(fmt)) => {
                    let mut out = String::new();
                    write!(out, "{}", t.format(fmt)).map_err(|_| fail())?;
                    Ok(Value::text(out))
                }
                _ => Ok(Value::text(self.to_display_string())),
            },

            (Value::Integer(v), DataType::Integer) => Ok(Value::Integer(*v)),
            (Value::Integer(v), DataType::Float) => Ok(Value::Float(*v as f64)),
            (Value::Integer(v), DataType::Boolean) => Ok(Value::Boolean(*v != 0)),
            (Value::Integer(v), DataType::Timestamp) => DateTime::<Utc>::from_timestamp(*v, 0)
                .map(Value::Timestamp)
                .ok_or_else(fail),

            (Value::Float(v), DataType::Float) => Ok(Value::Float(*v)),
            (Value::Float(v), DataType::Integer) => {
                if v.is_finite() && *v >= i64::MIN as f64 && *v <= i64::MAX as f64 {
                    Ok(Value::Integer(v.trunc() as i64))
                } else {
                    Err(fail())
                }
            }
            (Value::Float(v), DataType::Boolean) => Ok(Value::Boolean(*v != 0.0)),

            (Value::Boolean(b), DataType::Boolean) => Ok(Value::Boolean(*b)),
            (Value::Boolean(b), DataType::Integer) => Ok(Value::Integer(i64::from(*b))),
            (Value::Boolean(b), DataType::Float) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),

            (Value::Timestamp(t), DataType::Timestamp) => Ok(Value::Timestamp(*t)),
            (Value::Timestamp(t), DataType::Integer) => Ok(Value::Integer(t.timestamp())),
            (Value::Timestamp(t), DataType::Float) => Ok(Value::Float(
                t.timestamp() as f64 + f64::from(t.timestamp_subsec_nanos()) / 1e9,
            )),

            (Value::Text(s), DataType::Integer) => {
                s.trim().parse::<i64>().map(Value::Integer).map_err(|_| fail())
            }
            (Value::Text(s), DataType::Float) => {
                s.trim().parse::<f64>().map(Value::Float).map_err(|_| fail())
            }
            (Value::Text(s), DataType::Boolean) => {
                parse_boolean(s).map(Value::Boolean).ok_or_else(fail)
            }
            (Value::Text(s), DataType::Timestamp) => {
                let parsed = match format {
                    Some(fmt) => parse_timestamp_with(s, fmt),
                    None => parse_timestamp(s),
                };
                parsed.map(Value::Timestamp).ok_or_else(fail)
            }

            _ => Err(fail()),
        }
    }

    /// Render the value as text, the way sinks print it
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Integer(v) => v.to_string(),
            Value::Float(v) => format_float(*v),
            Value::Text(s) => s.to_string(),
            Value::Boolean(b) => (if *b { "true" } else { "false" }).to_string(),
            Value::Timestamp(t) => t.format(DISPLAY_TIMESTAMP_FORMAT).to_string(),
        }
    }
}

// =========================================================================
// Trait implementations
// =========================================================================

impl Default for Value {
    fn default() -> Self {
        Value::Text(Arc::from(""))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

/// Structural equality with Integer/Float cross comparison.
///
/// Text compares exactly here; culture and case rules live in
/// [`Comparer`](super::Comparer).
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => compare_floats(*a, *b) == Ordering::Equal,
            (Value::Integer(i), Value::Float(f)) | (Value::Float(f), Value::Integer(i)) => {
                *f == (*i as f64)
            }
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Integer(v) => {
                // Hash as f64 bits so Integer(5) and Float(5.0) hash the same
                1u8.hash(state);
                normalize_float(*v as f64).to_bits().hash(state);
            }
            Value::Float(v) => {
                1u8.hash(state);
                normalize_float(*v).to_bits().hash(state);
            }
            Value::Text(s) => {
                2u8.hash(state);
                s.hash(state);
            }
            Value::Boolean(b) => {
                3u8.hash(state);
                b.hash(state);
            }
            Value::Timestamp(t) => {
                4u8.hash(state);
                t.timestamp_nanos_opt().hash(state);
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(Arc::from(v))
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

// =========================================================================
// Helper functions
// =========================================================================

/// Parse a timestamp string trying the common layouts
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&ndt));
    }
    for format in TIMESTAMP_FORMATS.iter().chain(DATE_FORMATS) {
        if let Some(dt) = parse_timestamp_with(s, format) {
            return Some(dt);
        }
    }
    None
}

/// Parse a timestamp string with an explicit chrono format
pub fn parse_timestamp_with(s: &str, format: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_str(s, format) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try parsing as naive datetime and assume UTC
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
        return Some(Utc.from_utc_datetime(&ndt));
    }
    let date = NaiveDate::parse_from_str(s, format).ok()?;
    date.and_hms_opt(0, 0, 0)
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

/// Parse the boolean spellings accepted by conversions
pub(crate) fn parse_boolean(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// Format a float value consistently
pub(crate) fn format_float(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        // Integer-like float, format without decimal
        format!("{:.0}", v)
    } else {
        let s = format!("{:?}", v);
        // Remove trailing zeros after decimal point
        if s.contains('.') && !s.contains('e') && !s.contains('E') {
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            s
        }
    }
}

/// Compare two floats with proper NaN handling
pub(crate) fn compare_floats(a: f64, b: f64) -> Ordering {
    // NaN sorts after every other value and equals itself
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Collapse -0.0 and NaN payloads so equal floats hash equal
#[inline]
pub(crate) fn normalize_float(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}
