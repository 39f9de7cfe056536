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

//! Regex column source
//!
//! Splits each line of an inner source into the capture groups of a
//! regular expression. Named groups become columns of that name; unnamed
//! groups are called `group1`, `group2`, ... A pattern without groups
//! produces one `match` column holding the whole match.

use std::sync::Arc;

use regex::Regex;

use crate::core::{ColumnInfo, ColumnName, DataType, Error, Result, Row, Schema, Value};
use crate::executor::{ExecutionContext, Provider, ProviderState};

/// Leaf provider producing regex capture groups
pub struct RegexProvider {
    input: Box<dyn Provider>,
    regex: Regex,
    schema: Schema,
    skipped: u64,
    ctx: Option<ExecutionContext>,
    current: Row,
    state: ProviderState,
}

impl RegexProvider {
    /// Wrap a line source; its first column is matched against `pattern`
    pub fn new(input: Box<dyn Provider>, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| Error::invalid_argument(format!("invalid regex '{}': {}", pattern, e)))?;
        let columns = if regex.captures_len() <= 1 {
            vec![ColumnInfo::new(ColumnName::new("match"), DataType::Text)]
        } else {
            regex
                .capture_names()
                .enumerate()
                .skip(1)
                .map(|(i, name)| {
                    let name = match name {
                        Some(n) => ColumnName::new(n),
                        None => ColumnName::new(format!("group{}", i)),
                    };
                    ColumnInfo::new(name, DataType::Text)
                })
                .collect()
        };
        Ok(Self {
            input,
            regex,
            schema: Schema::new(columns),
            skipped: 0,
            ctx: None,
            current: Row::default(),
            state: ProviderState::Uninitialized,
        })
    }

    /// Lines dropped because they did not match
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn split(&self, line: &str) -> Option<Vec<Value>> {
        let captures = self.regex.captures(line)?;
        let values = if captures.len() <= 1 {
            vec![Value::text(captures.get(0).map_or("", |m| m.as_str()))]
        } else {
            (1..captures.len())
                .map(|i| Value::text(captures.get(i).map_or("", |m| m.as_str())))
                .collect()
        };
        Some(values)
    }
}

impl Provider for RegexProvider {
    fn initialize(&mut self, ctx: &ExecutionContext) -> Result<()> {
        self.input.initialize(ctx)?;
        self.skipped = 0;
        self.ctx = Some(ctx.clone());
        self.current = Row::default();
        self.state = ProviderState::Initialized;
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        self.state.ensure_initialized(self.name())?;
        if self.state == ProviderState::Exhausted {
            return Ok(false);
        }
        while self.input.next()? {
            let row = self.input.take_row();
            let line = row.get(0).map(|v| v.to_display_string()).unwrap_or_default();
            match self.split(&line) {
                Some(values) => {
                    self.current = Row::leaf(
                        values,
                        Arc::clone(self.schema.column_names()),
                        row.line_no(),
                        row.total_line_no(),
                        Arc::from(row.source()),
                    );
                    return Ok(true);
                }
                None => {
                    self.skipped += 1;
                    let error = Error::RegexNoMatch {
                        pattern: self.regex.as_str().to_string(),
                        input: line,
                    };
                    match &self.ctx {
                        Some(ctx) => ctx.handle_failure(error, row.source(), row.line_no())?,
                        None => return Err(error),
                    }
                }
            }
        }
        log::debug!("Regex: exhausted, {} lines skipped", self.skipped);
        self.state = ProviderState::Exhausted;
        self.current = Row::default();
        Ok(false)
    }

    fn current_row(&self) -> &Row {
        &self.current
    }

    fn take_row(&mut self) -> Row {
        std::mem::take(&mut self.current)
    }

    fn uninitialize(&mut self) -> Result<()> {
        self.ctx = None;
        self.current = Row::default();
        self.state = ProviderState::Uninitialized;
        self.input.uninitialize()
    }

    fn dispose(&mut self) {
        self.input.dispose();
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn name(&self) -> &str {
        "Regex"
    }
}
