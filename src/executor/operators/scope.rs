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

//! Named and parameterized scopes

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::core::{Result, Row, Schema};
use crate::executor::context::{ExecutionContext, RowContext};
use crate::executor::expression::Expression;
use crate::executor::provider::Provider;

/// Passes rows through under an alias-qualified schema
pub struct NamedScopeProvider {
    input: Box<dyn Provider>,
    alias: String,
    schema: Schema,
    current: Row,
}

impl NamedScopeProvider {
    pub fn new(input: Box<dyn Provider>, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        let schema = input.schema().with_alias(&alias);
        Self {
            input,
            alias,
            schema,
            current: Row::default(),
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }
}

impl Provider for NamedScopeProvider {
    fn initialize(&mut self, ctx: &ExecutionContext) -> Result<()> {
        self.input.initialize(ctx)
    }

    fn next(&mut self) -> Result<bool> {
        if self.input.next()? {
            self.current = self
                .input
                .take_row()
                .renamed(Arc::clone(self.schema.column_names()));
            Ok(true)
        } else {
            self.current = Row::default();
            Ok(false)
        }
    }

    fn current_row(&self) -> &Row {
        &self.current
    }

    fn take_row(&mut self) -> Row {
        std::mem::take(&mut self.current)
    }

    fn uninitialize(&mut self) -> Result<()> {
        self.current = Row::default();
        self.input.uninitialize()
    }

    fn dispose(&mut self) {
        self.input.dispose();
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn name(&self) -> &str {
        "NamedScope"
    }
}

/// Runs a view body with its parameters bound.
///
/// Arguments are evaluated once per `initialize` in the caller's context
/// and become named values visible to every expression of the wrapped
/// pipeline, shadowing variables of the same name.
pub struct ParameterizedScopeProvider {
    input: Box<dyn Provider>,
    arguments: Vec<(String, Expression)>,
}

impl ParameterizedScopeProvider {
    pub fn new(input: Box<dyn Provider>, arguments: Vec<(String, Expression)>) -> Self {
        Self { input, arguments }
    }
}

impl Provider for ParameterizedScopeProvider {
    fn initialize(&mut self, ctx: &ExecutionContext) -> Result<()> {
        let empty = Row::default();
        let rc = RowContext::new(ctx, &empty);
        let mut values = FxHashMap::default();
        for (name, expr) in &self.arguments {
            values.insert(name.clone(), expr.evaluate(&rc)?);
        }
        log::debug!("ParameterizedScope: bound {} arguments", values.len());
        self.input.initialize(&ctx.with_bindings(values))
    }

    fn next(&mut self) -> Result<bool> {
        self.input.next()
    }

    fn current_row(&self) -> &Row {
        self.input.current_row()
    }

    fn take_row(&mut self) -> Row {
        self.input.take_row()
    }

    fn uninitialize(&mut self) -> Result<()> {
        self.input.uninitialize()
    }

    fn dispose(&mut self) {
        for (_, expr) in &self.arguments {
            expr.dispose_subqueries();
        }
        self.input.dispose();
    }

    fn schema(&self) -> &Schema {
        self.input.schema()
    }

    fn name(&self) -> &str {
        "ParameterizedScope"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnName, DataType, Value};
    use crate::executor::expression::{BinaryOp, ExprKind};
    use crate::executor::operators::test_util::{collect, ints, pairs};
    use crate::executor::operators::FilterProvider;

    #[test]
    fn test_named_scope_qualifies_columns() {
        let ctx = ExecutionContext::default();
        let mut scope = NamedScopeProvider::new(pairs(&[("a", 1)]), "log");
        assert_eq!(scope.alias(), "log");
        assert_eq!(
            scope
                .schema()
                .resolve(&ColumnName::qualified("log", "v"))
                .unwrap(),
            Some(1)
        );
        assert_eq!(
            scope
                .schema()
                .resolve(&ColumnName::qualified("other", "v"))
                .unwrap(),
            None
        );
        scope.initialize(&ctx).unwrap();
        assert!(scope.next().unwrap());
        assert_eq!(
            scope
                .current_row()
                .value_by_name(&ColumnName::qualified("log", "k")),
            Some(&Value::text("a"))
        );
    }

    #[test]
    fn test_parameters_visible_to_body() {
        // Body: n > @min
        let predicate = Expression::new(
            ExprKind::Binary(
                BinaryOp::Gt,
                Box::new(Expression::column(0, DataType::Integer)),
                Box::new(Expression::new(
                    ExprKind::Variable("min".to_string()),
                    DataType::Integer,
                )),
            ),
            DataType::Boolean,
        );
        let body = Box::new(FilterProvider::new(ints(&[1, 5, 9]), predicate));
        let mut view = ParameterizedScopeProvider::new(
            body,
            vec![("min".to_string(), Expression::constant(Value::integer(4)))],
        );
        assert_eq!(
            collect(&mut view),
            vec![vec![Value::integer(5)], vec![Value::integer(9)]]
        );
    }
}
