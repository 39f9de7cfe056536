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

//! Core types and definitions for textsql
//!
//! This module contains the fundamental types used throughout the engine:
//!
//! - [`DataType`] - Value types (INTEGER, FLOAT, TEXT, BOOLEAN, TIMESTAMP)
//! - [`Value`] - Typed runtime values and their conversions
//! - [`Comparer`] - The query-wide ordering, equality and hashing policy
//! - [`Row`] - One record with its line/source metadata
//! - [`Schema`] - The fixed output schema of a pipeline stage
//! - [`ColumnName`] - Alias-aware column names
//! - [`Error`] - Error types for binding and execution

pub mod comparer;
pub mod error;
pub mod row;
pub mod schema;
pub mod types;
pub mod value;

// Re-export main types for convenience
pub use comparer::Comparer;
pub use error::{Error, Result};
pub use row::Row;
pub use schema::{ColumnInfo, ColumnLabel, ColumnName, Schema};
pub use types::DataType;
pub use value::{parse_timestamp, parse_timestamp_with, Value};

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::sync::Arc;

    /// Rows built against a schema resolve columns through it
    #[test]
    fn test_schema_row_integration() {
        let schema = Schema::typed(&[("host", DataType::Text), ("bytes", DataType::Integer)])
            .with_alias("log");

        let row = Row::leaf(
            vec![Value::text("10.0.0.1"), Value::integer(512)],
            Arc::clone(schema.column_names()),
            1,
            1,
            Arc::from("access.log"),
        );

        let idx = schema
            .resolve(&ColumnName::qualified("log", "bytes"))
            .unwrap()
            .unwrap();
        assert_eq!(row[idx], Value::integer(512));
        assert_eq!(
            row.value_by_name(&ColumnName::new("HOST")),
            Some(&Value::text("10.0.0.1"))
        );
    }

    /// Values stored in rows compare through the comparer
    #[test]
    fn test_row_values_with_comparer() {
        let comparer = Comparer::ignore_case();
        let a = Row::from_values(vec![Value::text("GET"), Value::integer(1)]);
        let b = Row::from_values(vec![Value::text("get"), Value::float(1.0)]);
        assert!(comparer.keys_equal(a.as_slice(), b.as_slice()).unwrap());
        assert_eq!(
            comparer.hash_key(a.as_slice()),
            comparer.hash_key(b.as_slice())
        );
    }
}
