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

//! Distinct stage

use crate::common::KeyTable;
use crate::core::{Result, Row, Schema};
use crate::executor::context::ExecutionContext;
use crate::executor::provider::{Provider, ProviderState};

use super::initialized;

/// Streams the first occurrence of every distinct row.
///
/// Keys are all columns of the row, compared and hashed through the query
/// comparer. Every key seen stays in memory until `uninitialize`.
pub struct DistinctProvider {
    input: Box<dyn Provider>,
    seen: KeyTable,
    ctx: Option<ExecutionContext>,
    current: Row,
    state: ProviderState,
}

impl DistinctProvider {
    pub fn new(input: Box<dyn Provider>) -> Self {
        Self {
            input,
            seen: KeyTable::new(),
            ctx: None,
            current: Row::default(),
            state: ProviderState::Uninitialized,
        }
    }
}

impl Provider for DistinctProvider {
    fn initialize(&mut self, ctx: &ExecutionContext) -> Result<()> {
        self.input.initialize(ctx)?;
        self.seen.clear();
        self.ctx = Some(ctx.clone());
        self.state = ProviderState::Initialized;
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        if self.state == ProviderState::Exhausted {
            return Ok(false);
        }
        let comparer = initialized(&self.ctx, "Distinct")?.comparer();
        while self.input.next()? {
            let row = self.input.take_row();
            if self.seen.insert(row.as_slice().to_vec(), comparer)? {
                self.current = row;
                return Ok(true);
            }
        }
        log::debug!("Distinct: exhausted with {} distinct rows", self.seen.len());
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
        self.seen = KeyTable::new();
        self.current = Row::default();
        self.state = ProviderState::Uninitialized;
        self.input.uninitialize()
    }

    fn dispose(&mut self) {
        self.seen = KeyTable::new();
        self.ctx = None;
        self.current = Row::default();
        self.state = ProviderState::Uninitialized;
        self.input.dispose();
    }

    fn schema(&self) -> &Schema {
        self.input.schema()
    }

    fn name(&self) -> &str {
        "Distinct"
    }
}
