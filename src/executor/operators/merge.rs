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

//! Merge stage

use std::sync::Arc;

use crate::core::{Error, Result, Row, Schema};
use crate::executor::context::ExecutionContext;
use crate::executor::provider::{Provider, ProviderState};

use super::initialized;

/// Concatenates its inputs in order.
///
/// The schema is the first input's. Inputs are initialized lazily: the
/// previous input is uninitialized before the next one is initialized, so
/// only one is open at a time.
pub struct MergeProvider {
    inputs: Vec<Box<dyn Provider>>,
    schema: Schema,
    /// Index of the open input
    open: Option<usize>,
    position: usize,
    ctx: Option<ExecutionContext>,
    current: Row,
    state: ProviderState,
}

impl MergeProvider {
    pub fn new(inputs: Vec<Box<dyn Provider>>) -> Result<Self> {
        let schema = inputs
            .first()
            .map(|p| p.schema().clone())
            .ok_or_else(|| Error::invalid_query("merge needs at least one input"))?;
        for input in &inputs[1..] {
            if input.schema().len() != schema.len() {
                return Err(Error::invalid_query(format!(
                    "merged inputs have {} and {} columns",
                    schema.len(),
                    input.schema().len()
                )));
            }
        }
        Ok(Self {
            inputs,
            schema,
            open: None,
            position: 0,
            ctx: None,
            current: Row::default(),
            state: ProviderState::Uninitialized,
        })
    }

    fn close_open(&mut self) -> Result<()> {
        match self.open.take() {
            Some(index) => self.inputs[index].uninitialize(),
            None => Ok(()),
        }
    }
}

impl Provider for MergeProvider {
    fn initialize(&mut self, ctx: &ExecutionContext) -> Result<()> {
        self.close_open()?;
        self.inputs[0].initialize(ctx)?;
        self.open = Some(0);
        self.position = 0;
        self.ctx = Some(ctx.clone());
        self.state = ProviderState::Initialized;
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        if self.state == ProviderState::Exhausted {
            return Ok(false);
        }
        initialized(&self.ctx, "Merge")?;
        while self.position < self.inputs.len() {
            let input = &mut self.inputs[self.position];
            if input.next()? {
                self.current = input
                    .take_row()
                    .renamed(Arc::clone(self.schema.column_names()));
                return Ok(true);
            }
            self.close_open()?;
            self.position += 1;
            if let (Some(next), Some(ctx)) = (self.inputs.get_mut(self.position), &self.ctx) {
                log::debug!("Merge: advancing to input {}", self.position);
                next.initialize(ctx)?;
                self.open = Some(self.position);
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
        self.close_open()
    }

    fn dispose(&mut self) {
        for input in &mut self.inputs {
            input.dispose();
        }
        self.open = None;
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn name(&self) -> &str {
        "Merge"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, Value};
    use crate::executor::operators::test_util::{collect, ints, pairs};

    #[test]
    fn test_merge_concatenates_in_order() {
        let mut m = MergeProvider::new(vec![ints(&[1, 2]), ints(&[]), ints(&[3])]).unwrap();
        assert_eq!(
            collect(&mut m),
            vec![
                vec![Value::integer(1)],
                vec![Value::integer(2)],
                vec![Value::integer(3)],
            ]
        );
    }

    #[test]
    fn test_merge_opens_one_input_at_a_time() {
        let ctx = ExecutionContext::default();
        let mut m = MergeProvider::new(vec![ints(&[1]), ints(&[2])]).unwrap();
        m.initialize(&ctx).unwrap();
        assert_eq!(m.open, Some(0));
        assert!(m.next().unwrap());
        assert!(m.next().unwrap());
        assert_eq!(m.open, Some(1));
        assert!(!m.next().unwrap());
        assert_eq!(m.open, None);
        m.uninitialize().unwrap();
    }

    #[test]
    fn test_merge_rejects_mismatched_inputs() {
        assert!(MergeProvider::new(vec![ints(&[1]), pairs(&[("a", 1)])]).is_err());
        assert!(MergeProvider::new(Vec::new()).is_err());
    }

    #[test]
    fn test_merge_uses_first_schema() {
        let m = MergeProvider::new(vec![ints(&[1]), ints(&[2])]).unwrap();
        assert_eq!(m.schema().column(0).unwrap().data_type, DataType::Integer);
    }
}
