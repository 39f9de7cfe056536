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

//! Core type definitions for textsql
//!
//! This module defines [`DataType`], the fixed result type of every value
//! and expression, and the widening rule used when binding operators.

use std::fmt;
use std::str::FromStr;

use super::error::Error;

/// Value types flowing through a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum DataType {
    /// 64-bit signed integer
    Integer = 1,

    /// 64-bit floating point number
    Float = 2,

    /// UTF-8 text string
    #[default]
    Text = 3,

    /// Boolean true/false
    Boolean = 4,

    /// Date and time (stored as UTC)
    Timestamp = 5,
}

impl DataType {
    /// Returns true if this type is numeric (INTEGER or FLOAT)
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Float)
    }

    /// Widening precedence used for implicit conversion (higher wins)
    fn precedence(&self) -> u8 {
        match self {
            DataType::Integer => 1,
            DataType::Float => 2,
            DataType::Timestamp => 3,
            DataType::Text => 4,
            DataType::Boolean => 0,
        }
    }

    /// The common type two operands are converted to before a binary
    /// operator is applied.
    ///
    /// Text wins over Float, which wins over Integer. Timestamps combine
    /// with Timestamps and Text. Booleans only combine with Booleans.
    /// Returns `None` when no implicit conversion exists.
    pub fn widen(self, other: DataType) -> Option<DataType> {
        if self == other {
            return Some(self);
        }
        match (self, other) {
            (DataType::Boolean, _) | (_, DataType::Boolean) => None,
            (DataType::Timestamp, t) | (t, DataType::Timestamp) if t.is_numeric() => None,
            _ => Some(if self.precedence() >= other.precedence() {
                self
            } else {
                other
            }),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "INTEGER"),
            DataType::Float => write!(f, "FLOAT"),
            DataType::Text => write!(f, "TEXT"),
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "INTEGER" | "INT" | "BIGINT" | "SMALLINT" | "TINYINT" => Ok(DataType::Integer),
            "FLOAT" | "DOUBLE" | "REAL" | "DECIMAL" | "NUMERIC" => Ok(DataType::Float),
            "TEXT" | "VARCHAR" | "CHAR" | "STRING" => Ok(DataType::Text),
            "BOOLEAN" | "BOOL" => Ok(DataType::Boolean),
            "TIMESTAMP" | "DATETIME" | "DATE" | "TIME" => Ok(DataType::Timestamp),
            _ => Err(Error::invalid_argument(format!("unknown type '{}'", s))),
        }
    }
}
