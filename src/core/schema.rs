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

//! Schema types for textsql - column names and stage schemas
//!
//! Every provider exposes a fixed [`Schema`] that is known as soon as the
//! stage is built. Column references written in a query are resolved
//! against it once, at bind time.

use std::fmt;
use std::sync::Arc;

use super::error::{Error, Result};
use super::types::DataType;

/// The label of a column: a name or a 1-based ordinal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnLabel {
    Name(Arc<str>),
    Ordinal(usize),
}

/// A column name, optionally qualified by a scope alias.
///
/// Matching is alias-aware: an unqualified reference matches a column under
/// any alias, a qualified reference (`alias.name`) must match the alias too.
/// Names and aliases match ASCII case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnName {
    alias: Option<Arc<str>>,
    label: ColumnLabel,
}

impl ColumnName {
    /// An unqualified column name
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            alias: None,
            label: ColumnLabel::Name(Arc::from(name.as_ref())),
        }
    }

    /// A column name qualified by `alias`
    pub fn qualified(alias: impl AsRef<str>, name: impl AsRef<str>) -> Self {
        Self {
            alias: Some(Arc::from(alias.as_ref())),
            label: ColumnLabel::Name(Arc::from(name.as_ref())),
        }
    }

    /// A column addressed by its 1-based position
    pub fn ordinal(position: usize) -> Self {
        Self {
            alias: None,
            label: ColumnLabel::Ordinal(position),
        }
    }

    /// Parse `name` or `alias.name`
    pub fn parse(text: &str) -> Self {
        match text.split_once('.') {
            Some((alias, name)) if !alias.is_empty() && !name.is_empty() => {
                Self::qualified(alias, name)
            }
            _ => Self::new(text),
        }
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn label(&self) -> &ColumnLabel {
        &self.label
    }

    /// The column name, if it is not an ordinal
    pub fn name(&self) -> Option<&str> {
        match &self.label {
            ColumnLabel::Name(name) => Some(name),
            ColumnLabel::Ordinal(_) => None,
        }
    }

    /// The same column under a different alias
    pub fn with_alias(&self, alias: Option<Arc<str>>) -> Self {
        Self {
            alias,
            label: self.label.clone(),
        }
    }

    /// Whether this schema column is addressed by `reference`
    pub fn matches(&self, reference: &ColumnName) -> bool {
        if let Some(wanted) = &reference.alias {
            match &self.alias {
                Some(alias) if alias.eq_ignore_ascii_case(wanted) => {}
                _ => return false,
            }
        }
        match (&self.label, &reference.label) {
            (ColumnLabel::Name(a), ColumnLabel::Name(b)) => a.eq_ignore_ascii_case(b),
            (ColumnLabel::Ordinal(a), ColumnLabel::Ordinal(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(alias) = &self.alias {
            write!(f, "{}.", alias)?;
        }
        match &self.label {
            ColumnLabel::Name(name) => write!(f, "{}", name),
            ColumnLabel::Ordinal(n) => write!(f, "${}", n),
        }
    }
}

impl From<&str> for ColumnName {
    fn from(text: &str) -> Self {
        ColumnName::parse(text)
    }
}

/// A column of a stage schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: ColumnName,
    pub data_type: DataType,
}

impl ColumnInfo {
    pub fn new(name: ColumnName, data_type: DataType) -> Self {
        Self { name, data_type }
    }
}

/// The fixed output schema of a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<ColumnInfo>,
    names: Arc<[ColumnName]>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Schema {
    /// Create a schema from column definitions
    pub fn new(columns: Vec<ColumnInfo>) -> Self {
        let names = columns.iter().map(|c| c.name.clone()).collect();
        Self { columns, names }
    }

    /// Create a schema of Text columns with the given names
    pub fn text(names: &[&str]) -> Self {
        Self::new(
            names
                .iter()
                .map(|n| ColumnInfo::new(ColumnName::new(n), DataType::Text))
                .collect(),
        )
    }

    /// Create a schema from `(name, type)` pairs
    pub fn typed(columns: &[(&str, DataType)]) -> Self {
        Self::new(
            columns
                .iter()
                .map(|(n, t)| ColumnInfo::new(ColumnName::new(n), *t))
                .collect(),
        )
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&ColumnInfo> {
        self.columns.get(index)
    }

    /// Shared column names, attached to every row the stage produces
    pub fn column_names(&self) -> &Arc<[ColumnName]> {
        &self.names
    }

    pub fn column_types(&self) -> Vec<DataType> {
        self.columns.iter().map(|c| c.data_type).collect()
    }

    /// Whether any column carries `alias`
    pub fn has_alias(&self, alias: &str) -> bool {
        self.columns
            .iter()
            .any(|c| c.name.alias().is_some_and(|a| a.eq_ignore_ascii_case(alias)))
    }

    /// Resolve a column reference to an index.
    ///
    /// Returns `Ok(None)` when nothing matches and fails when an
    /// unqualified reference matches more than one column.
    pub fn resolve(&self, reference: &ColumnName) -> Result<Option<usize>> {
        let mut found = None;
        for (index, column) in self.columns.iter().enumerate() {
            if column.name.matches(reference) {
                if found.is_some() {
                    return Err(Error::AmbiguousColumn(reference.to_string()));
                }
                found = Some(index);
            }
        }
        Ok(found)
    }

    /// The same schema with every column qualified by `alias`
    pub fn with_alias(&self, alias: &str) -> Self {
        let alias: Arc<str> = Arc::from(alias);
        Self::new(
            self.columns
                .iter()
                .map(|c| ColumnInfo::new(c.name.with_alias(Some(alias.clone())), c.data_type))
                .collect(),
        )
    }
}
