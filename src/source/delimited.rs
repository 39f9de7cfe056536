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

//! Delimited column source
//!
//! Splits each line of an inner source on a delimiter into a fixed, typed
//! schema. Fields may be quoted; a doubled quote inside a quoted field is a
//! literal quote. Missing trailing fields are empty. Lines with too many
//! fields, or fields that do not convert to their column type, go through
//! the warning policy.

use std::sync::Arc;

use crate::core::{DataType, Error, Result, Row, Schema, Value};
use crate::executor::{ExecutionContext, Provider, ProviderState};

/// Leaf provider splitting lines into delimited fields
pub struct DelimitedProvider {
    input: Box<dyn Provider>,
    schema: Schema,
    delimiter: char,
    quote: Option<char>,
    skip_header: bool,
    ctx: Option<ExecutionContext>,
    current: Row,
    state: ProviderState,
}

impl DelimitedProvider {
    pub fn new(input: Box<dyn Provider>, schema: Schema, delimiter: char) -> Self {
        Self {
            input,
            schema,
            delimiter,
            quote: None,
            skip_header: false,
            ctx: None,
            current: Row::default(),
            state: ProviderState::Uninitialized,
        }
    }

    /// Comma-separated with `"` quoting
    pub fn csv(input: Box<dyn Provider>, schema: Schema) -> Self {
        Self::new(input, schema, ',').with_quote('"')
    }

    pub fn with_quote(mut self, quote: char) -> Self {
        self.quote = Some(quote);
        self
    }

    /// Drop the first line of every source
    pub fn with_header(mut self, skip_header: bool) -> Self {
        self.skip_header = skip_header;
        self
    }

    fn split(&self, line: &str) -> Vec<String> {
        let mut fields = Vec::with_capacity(self.schema.len());
        let mut field = String::new();
        let mut quoted = false;
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            match self.quote {
                Some(q) if c == q => {
                    if quoted && chars.peek() == Some(&q) {
                        field.push(q);
                        chars.next();
                    } else {
                        quoted = !quoted;
                    }
                }
                _ if c == self.delimiter && !quoted => fields.push(std::mem::take(&mut field)),
                _ => field.push(c),
            }
        }
        fields.push(field);
        fields
    }

    fn parse(&self, line: &str) -> Result<Vec<Value>> {
        let fields = self.split(line);
        if fields.len() > self.schema.len() {
            return Err(Error::evaluation(format!(
                "expected {} fields, found {}",
                self.schema.len(),
                fields.len()
            )));
        }
        let mut fields = fields.into_iter();
        self.schema
            .columns()
            .iter()
            .map(|column| match fields.next() {
                Some(text) if column.data_type == DataType::Text => Ok(Value::text(text)),
                Some(text) => Value::text(text).convert_to(column.data_type, None),
                None => Ok(Value::empty(column.data_type)),
            })
            .collect()
    }
}

impl Provider for DelimitedProvider {
    fn initialize(&mut self, ctx: &ExecutionContext) -> Result<()> {
        self.input.initialize(ctx)?;
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
            if self.skip_header && row.line_no() == 1 {
                continue;
            }
            let line = row.get(0).map(|v| v.to_display_string()).unwrap_or_default();
            match self.parse(&line) {
                Ok(values) => {
                    self.current = Row::leaf(
                        values,
                        Arc::clone(self.schema.column_names()),
                        row.line_no(),
                        row.total_line_no(),
                        Arc::from(row.source()),
                    );
                    return Ok(true);
                }
                Err(error) => match &self.ctx {
                    Some(ctx) => ctx.handle_failure(error, row.source(), row.line_no())?,
                    None => return Err(error),
                },
            }
        }
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
        "Delimited"
    }
}
