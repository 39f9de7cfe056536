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

//! Filter stage

use crate::core::{Result, Row, Schema};
use crate::executor::context::{ExecutionContext, RowContext};
use crate::executor::expression::Expression;
use crate::executor::provider::{Provider, ProviderState};

use super::{initialized, skippable};

/// Streams the input rows for which the predicate is true.
///
/// A row-skip signal from the predicate drops the row.
pub struct FilterProvider {
    input: Box<dyn Provider>,
    predicate: Expression,
    ctx: Option<ExecutionContext>,
    current: Row,
    state: ProviderState,
}

impl FilterProvider {
    pub fn new(input: Box<dyn Provider>, predicate: Expression) -> Self {
        Self {
            input,
            predicate,
            ctx: None,
            current: Row::default(),
            state: ProviderState::Uninitialized,
        }
    }
}

impl Provider for FilterProvider {
    fn initialize(&mut self, ctx: &ExecutionContext) -> Result<()> {
        self.input.initialize(ctx)?;
        self.ctx = Some(ctx.clone());
        self.state = ProviderState::Initialized;
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        if self.state == ProviderState::Exhausted {
            return Ok(false);
        }
        let ctx = initialized(&self.ctx, "Filter")?;
        while self.input.next()? {
            let row = self.input.take_row();
            let keep = skippable(self.predicate.evaluate_bool(&RowContext::new(ctx, &row)))?;
            if keep == Some(true) {
                self.current = row;
                return Ok(true);
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
        self.ctx = None;
        self.current = Row::default();
        self.state = ProviderState::Uninitialized;
        self.predicate.dispose_subqueries();
        self.input.dispose();
    }

    fn schema(&self) -> &Schema {
        self.input.schema()
    }

    fn name(&self) -> &str {
        "Filter"
    }
}
