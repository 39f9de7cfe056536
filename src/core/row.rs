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

//! Row type for textsql - one record flowing between pipeline stages

use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use super::schema::ColumnName;
use super::value::Value;

/// One record: the current column values plus the metadata of the line
/// it came from.
///
/// `original_columns` holds the values the leaf source produced, before any
/// projection. Column names and original columns are shared, so cloning a
/// row only copies its current values.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Vec<Value>,
    original_columns: Arc<[Value]>,
    column_names: Arc<[ColumnName]>,
    line_no: i64,
    total_line_no: i64,
    source: Arc<str>,
}

impl Default for Row {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            original_columns: Arc::from(Vec::new()),
            column_names: Arc::from(Vec::new()),
            line_no: 0,
            total_line_no: 0,
            source: Arc::from(""),
        }
    }
}

impl Row {
    /// Create a leaf row; original columns equal the columns
    pub fn leaf(
        columns: Vec<Value>,
        column_names: Arc<[ColumnName]>,
        line_no: i64,
        total_line_no: i64,
        source: Arc<str>,
    ) -> Self {
        Self {
            original_columns: Arc::from(columns.as_slice()),
            columns,
            column_names,
            line_no,
            total_line_no,
            source,
        }
    }

    /// Create a row from values alone, without names or line metadata
    pub fn from_values(columns: Vec<Value>) -> Self {
        Self {
            original_columns: Arc::from(columns.as_slice()),
            columns,
            ..Default::default()
        }
    }

    /// A row derived from this one: new values and names, same origin
    pub fn derive(&self, columns: Vec<Value>, column_names: Arc<[ColumnName]>) -> Self {
        Self {
            columns,
            original_columns: Arc::clone(&self.original_columns),
            column_names,
            line_no: self.line_no,
            total_line_no: self.total_line_no,
            source: Arc::clone(&self.source),
        }
    }

    /// The same row under different column names
    pub fn renamed(mut self, column_names: Arc<[ColumnName]>) -> Self {
        self.column_names = column_names;
        self
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.columns.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.columns.iter()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Value] {
        &self.columns
    }

    /// Consume the row, returning its values
    pub fn into_values(self) -> Vec<Value> {
        self.columns
    }

    pub fn original_columns(&self) -> &[Value] {
        &self.original_columns
    }

    pub fn column_names(&self) -> &Arc<[ColumnName]> {
        &self.column_names
    }

    /// 1-based line number within the current source
    pub fn line_no(&self) -> i64 {
        self.line_no
    }

    /// 1-based line number across all sources read so far
    pub fn total_line_no(&self) -> i64 {
        self.total_line_no
    }

    /// Identifier of the source the row came from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Look a column value up by name
    pub fn value_by_name(&self, reference: &ColumnName) -> Option<&Value> {
        self.column_names
            .iter()
            .position(|name| name.matches(reference))
            .and_then(|index| self.columns.get(index))
    }
}

impl Index<usize> for Row {
    type Output = Value;

    fn index(&self, index: usize) -> &Self::Output {
        &self.columns[index]
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str("\t")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Row::from_values(values)
    }
}
