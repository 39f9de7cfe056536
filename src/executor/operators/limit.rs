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

//! Top-N and Bottom-N stages

use std::collections::VecDeque;

use crate::core::{Result, Row, Schema};
use crate::executor::context::ExecutionContext;
use crate::executor::provider::{Provider, ProviderState};

/// Streams the first `limit` rows and stops pulling its input after that
pub struct TopProvider {
    input: Box<dyn Provider>,
    limit: usize,
    emitted: usize,
    current: Row,
    state: ProviderState,
}

impl TopProvider {
    pub fn new(input: Box<dyn Provider>, limit: usize) -> Self {
        Self {
            input,
            limit,
            emitted: 0,
            current: Row::default(),
            state: ProviderState::Uninitialized,
        }
    }
}

impl Provider for TopProvider {
    fn initialize(&mut self, ctx: &ExecutionContext) -> Result<()> {
        self.input.initialize(ctx)?;
        self.emitted = 0;
        self.state = ProviderState::Initialized;
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        self.state.ensure_initialized(self.name())?;
        if self.state == ProviderState::Exhausted {
            return Ok(false);
        }
        if self.emitted < self.limit && self.input.next()? {
            self.emitted += 1;
            self.current = self.input.take_row();
            return Ok(true);
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
        self.current = Row::default();
        self.state = ProviderState::Uninitialized;
        self.input.uninitialize()
    }

    fn dispose(&mut self) {
        self.current = Row::default();
        self.state = ProviderState::Uninitialized;
        self.input.dispose();
    }

    fn schema(&self) -> &Schema {
        self.input.schema()
    }

    fn name(&self) -> &str {
        "Top"
    }
}

/// Emits the last `limit` rows of its input in arrival order.
///
/// Drains the input on the first `next()`, keeping a queue of at most
/// `limit` rows.
pub struct BottomProvider {
    input: Box<dyn Provider>,
    limit: usize,
    buffer: VecDeque<Row>,
    drained: bool,
    current: Row,
    state: ProviderState,
}

impl BottomProvider {
    pub fn new(input: Box<dyn Provider>, limit: usize) -> Self {
        Self {
            input,
            limit,
            buffer: VecDeque::new(),
            drained: false,
            current: Row::default(),
            state: ProviderState::Uninitialized,
        }
    }

    fn fill(&mut self) -> Result<()> {
        self.buffer = VecDeque::with_capacity(self.limit.min(1024));
        while self.input.next()? {
            let row = self.input.take_row();
            if self.limit == 0 {
                continue;
            }
            if self.buffer.len() == self.limit {
                self.buffer.pop_front();
            }
            self.buffer.push_back(row);
        }
        self.drained = true;
        Ok(())
    }
}

impl Provider for BottomProvider {
    fn initialize(&mut self, ctx: &ExecutionContext) -> Result<()> {
        self.input.initialize(ctx)?;
        self.buffer.clear();
        self.drained = false;
        self.state = ProviderState::Initialized;
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        self.state.ensure_initialized(self.name())?;
        if self.state == ProviderState::Exhausted {
            return Ok(false);
        }
        if !self.drained {
            self.fill()?;
        }
        match self.buffer.pop_front() {
            Some(row) => {
                self.current = row;
                Ok(true)
            }
            None => {
                self.state = ProviderState::Exhausted;
                self.current = Row::default();
                Ok(false)
            }
        }
    }

    fn current_row(&self) -> &Row {
        &self.current
    }

    fn take_row(&mut self) -> Row {
        std::mem::take(&mut self.current)
    }

    fn uninitialize(&mut self) -> Result<()> {
        self.buffer.clear();
        self.drained = false;
        self.current = Row::default();
        self.state = ProviderState::Uninitialized;
        self.input.uninitialize()
    }

    fn dispose(&mut self) {
        self.buffer.clear();
        self.current = Row::default();
        self.state = ProviderState::Uninitialized;
        self.input.dispose();
    }

    fn schema(&self) -> &Schema {
        self.input.schema()
    }

    fn name(&self) -> &str {
        "Bottom"
    }
}
