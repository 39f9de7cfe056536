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

//! Correlated subquery evaluation
//!
//! A subquery expression owns its own provider pipeline. Every evaluation
//! derives a child context that links the current outer row, initializes
//! the pipeline fresh, pulls as many rows as the subquery kind needs, and
//! uninitializes it again before returning. Inner expressions reach the
//! outer row through `OuterColumn` references.

use std::cell::RefCell;

use crate::core::{Comparer, DataType, Error, Result, Value};

use super::context::RowContext;
use super::expression::{comparison, BinaryOp};
use super::provider::Provider;

/// How the rows of a subquery turn into a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubqueryKind {
    /// First column of the first row, or the empty value of its type
    Scalar,
    /// Whether any row exists
    Exists,
    /// Whether the operand equals the first column of any row
    In,
    /// Whether the comparison holds for some row
    Any(BinaryOp),
    /// Whether the comparison holds for every row
    All(BinaryOp),
}

/// A subquery pipeline and the kind of value it produces
pub struct Subquery {
    kind: SubqueryKind,
    provider: RefCell<Box<dyn Provider>>,
    /// Type of the first output column
    column_type: DataType,
}

impl Subquery {
    pub fn new(kind: SubqueryKind, provider: Box<dyn Provider>) -> Result<Self> {
        let column_type = match provider.schema().column(0) {
            Some(column) => column.data_type,
            None if kind == SubqueryKind::Exists => DataType::Boolean,
            None => return Err(Error::invalid_query("subquery returns no columns")),
        };
        if kind != SubqueryKind::Exists && provider.schema().len() != 1 {
            return Err(Error::invalid_query(format!(
                "subquery must return exactly one column, got {}",
                provider.schema().len()
            )));
        }
        Ok(Self {
            kind,
            provider: RefCell::new(provider),
            column_type,
        })
    }

    pub fn kind(&self) -> SubqueryKind {
        self.kind
    }

    /// Type of the values the pipeline produces
    pub fn column_type(&self) -> DataType {
        self.column_type
    }

    /// Result type of the subquery expression
    pub fn data_type(&self) -> DataType {
        match self.kind {
            SubqueryKind::Scalar => self.column_type,
            _ => DataType::Boolean,
        }
    }

    pub fn dispose(&self) {
        if let Ok(mut provider) = self.provider.try_borrow_mut() {
            provider.dispose();
        }
    }

    /// Run the pipeline for the current outer row
    pub fn evaluate(&self, operand: Option<&Value>, ctx: &RowContext<'_>) -> Result<Value> {
        let child = ctx.exec.with_outer_row(ctx.row);
        let mut provider = self
            .provider
            .try_borrow_mut()
            .map_err(|_| Error::internal("subquery re-entered during its own evaluation"))?;

        provider.initialize(&child)?;
        let result = self.pull(&mut **provider, operand, child.comparer());
        let closed = provider.uninitialize();
        let value = result?;
        closed?;
        Ok(value)
    }

    fn pull(
        &self,
        provider: &mut dyn Provider,
        operand: Option<&Value>,
        comparer: &Comparer,
    ) -> Result<Value> {
        let left_operand = || operand.ok_or_else(|| Error::internal("subquery operand missing"));
        match self.kind {
            SubqueryKind::Scalar => {
                if provider.next()? {
                    Ok(first_column(provider)?.clone())
                } else {
                    Ok(Value::empty(self.column_type))
                }
            }
            SubqueryKind::Exists => Ok(Value::Boolean(provider.next()?)),
            SubqueryKind::In => {
                let left = left_operand()?;
                while provider.next()? {
                    if comparer.equals(left, first_column(provider)?)? {
                        return Ok(Value::Boolean(true));
                    }
                }
                Ok(Value::Boolean(false))
            }
            SubqueryKind::Any(op) => {
                let left = left_operand()?;
                while provider.next()? {
                    if comparison(op, left, first_column(provider)?, comparer)? {
                        return Ok(Value::Boolean(true));
                    }
                }
                Ok(Value::Boolean(false))
            }
            SubqueryKind::All(op) => {
                let left = left_operand()?;
                while provider.next()? {
                    if !comparison(op, left, first_column(provider)?, comparer)? {
                        return Ok(Value::Boolean(false));
                    }
                }
                Ok(Value::Boolean(true))
            }
        }
    }
}

fn first_column(provider: &dyn Provider) -> Result<&Value> {
    provider
        .current_row()
        .get(0)
        .ok_or_else(|| Error::internal("subquery row has no columns"))
}
