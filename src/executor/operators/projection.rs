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

//! Projection stage

use std::sync::Arc;

use crate::core::{Result, Row, Schema, Value};
use crate::executor::context::{ExecutionContext, RowContext};
use crate::executor::expression::Expression;
use crate::executor::provider::{Provider, ProviderState};
use crate::executor::state::StateBin;

use super::{initialized, skippable};

/// Streams one computed row per input row.
///
/// Per-stream functions (LAG) step once per input row before the output
/// columns are evaluated. A row-skip signal from any column drops the row.
pub struct ProjectionProvider {
    input: Box<dyn Provider>,
    items: Vec<Expression>,
    schema: Schema,
    has_state: bool,
    stream_state: StateBin,
    ctx: Option<ExecutionContext>,
    current: Row,
    state: ProviderState,
}

impl ProjectionProvider {
    pub fn new(input: Box<dyn Provider>, items: Vec<Expression>, schema: Schema) -> Self {
        let has_state = items.iter().any(Expression::has_state);
        Self {
            input,
            items,
            schema,
            has_state,
            stream_state: StateBin::new(),
            ctx: None,
            current: Row::default(),
            state: ProviderState::Uninitialized,
        }
    }

    fn project(
        items: &[Expression],
        has_state: bool,
        bin: &mut StateBin,
        ctx: &RowContext<'_>,
    ) -> Result<Vec<Value>> {
        if has_state {
            for item in items {
                item.step_state(bin, ctx)?;
            }
        }
        let ctx = ctx.with_state(bin);
        items.iter().map(|item| item.evaluate(&ctx)).collect()
    }
}

impl Provider for ProjectionProvider {
    fn initialize(&mut self, ctx: &ExecutionContext) -> Result<()> {
        self.input.initialize(ctx)?;
        self.stream_state.clear();
        self.ctx = Some(ctx.clone());
        self.state = ProviderState::Initialized;
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        if self.state == ProviderState::Exhausted {
            return Ok(false);
        }
        let ctx = initialized(&self.ctx, "Projection")?;
        while self.input.next()? {
            let row = self.input.take_row();
            let rc = RowContext::new(ctx, &row);
            let values = Self::project(&self.items, self.has_state, &mut self.stream_state, &rc);
            if let Some(values) = skippable(values)? {
                self.current = row.derive(values, Arc::clone(self.schema.column_names()));
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
        self.stream_state.clear();
        self.current = Row::default();
        self.state = ProviderState::Uninitialized;
        self.input.uninitialize()
    }

    fn dispose(&mut self) {
        self.stream_state.clear();
        self.ctx = None;
        self.current = Row::default();
        self.state = ProviderState::Uninitialized;
        self.items.iter().for_each(Expression::dispose_subqueries);
        self.input.dispose();
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn name(&self) -> &str {
        "Projection"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, Error};
    use crate::executor::expression::{BinaryOp, ExprKind};
    use crate::executor::operators::test_util::{collect, ints};
    use crate::executor::state::AccumulatorId;
    use crate::functions::LagFunction;

    #[test]
    fn test_projection_computes_columns() {
        let doubled = Expression::new(
            ExprKind::Binary(
                BinaryOp::Mul,
                Box::new(Expression::column(0, DataType::Integer)),
                Box::new(Expression::constant(Value::integer(2))),
            ),
            DataType::Integer,
        );
        let mut p = ProjectionProvider::new(
            ints(&[1, 2]),
            vec![Expression::column(0, DataType::Integer), doubled],
            Schema::typed(&[("n", DataType::Integer), ("d", DataType::Integer)]),
        );
        assert_eq!(
            collect(&mut p),
            vec![
                vec![Value::integer(1), Value::integer(2)],
                vec![Value::integer(2), Value::integer(4)],
            ]
        );
    }

    #[test]
    fn test_projection_keeps_original_columns() {
        let ctx = ExecutionContext::default();
        let mut p = ProjectionProvider::new(
            ints(&[7]),
            vec![Expression::constant(Value::text("x"))],
            Schema::text(&["c"]),
        );
        p.initialize(&ctx).unwrap();
        assert!(p.next().unwrap());
        assert_eq!(p.current_row().original_columns(), &[Value::integer(7)]);
        assert_eq!(p.current_row().line_no(), 1);
    }

    #[test]
    fn test_lag_restarts_on_reinitialize() {
        let lag = Expression::new(
            ExprKind::Stateful {
                id: AccumulatorId(0),
                prototype: Box::new(LagFunction::new(1, Value::integer(0))),
                arg: Box::new(Expression::column(0, DataType::Integer)),
            },
            DataType::Integer,
        );
        let mut p = ProjectionProvider::new(
            ints(&[5, 6, 7]),
            vec![lag],
            Schema::typed(&[("prev", DataType::Integer)]),
        );
        let expected = vec![
            vec![Value::integer(0)],
            vec![Value::integer(5)],
            vec![Value::integer(6)],
        ];
        assert_eq!(collect(&mut p), expected);
        assert_eq!(collect(&mut p), expected);
    }

    #[test]
    fn test_projection_propagates_errors() {
        let div = Expression::new(
            ExprKind::Binary(
                BinaryOp::Div,
                Box::new(Expression::column(0, DataType::Integer)),
                Box::new(Expression::constant(Value::integer(0))),
            ),
            DataType::Integer,
        );
        let ctx = ExecutionContext::default();
        let mut p = ProjectionProvider::new(ints(&[1]), vec![div], Schema::text(&["x"]));
        p.initialize(&ctx).unwrap();
        assert!(matches!(p.next(), Err(Error::DivisionByZero)));
    }
}
