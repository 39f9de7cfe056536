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

// Bound expression tree
//
// The binder turns plan expressions into `Expression` trees with a fixed
// result type per node. Every node can be evaluated against a row; nodes
// carrying state (aggregates, LAG, invariant columns) are addressed by their
// `AccumulatorId` inside a `StateBin` instead of holding state themselves,
// so one compiled tree serves every group.
//
//   evaluate     pure per-row value (reads accumulators from ctx.state)
//   accumulate   fold one row into a group's bin (aggregates, invariants)
//   step_state   advance per-stream functions once per row (LAG)

mod ops;

pub use ops::{arithmetic, comparison, negate, truthy, BinaryOp, LikePattern, UnaryOp};

use std::cmp::Ordering;
use std::fmt;

use smallvec::SmallVec;

use crate::core::{Comparer, DataType, Error, Result, Value};
use crate::functions::{AggregateFunction, ScalarFunction, StatefulFunction};

use super::context::RowContext;
use super::state::{AccumulatorId, StateBin};
use super::subquery::Subquery;

/// Values exposed by the engine rather than by a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemValue {
    /// The leaf values of the current row, tab-joined
    RawLine,
    /// The current column values, tab-joined
    ProjectedLine,
    /// 1-based line number within the current source
    LineNumber,
    /// 1-based line number across all sources
    TotalLineNumber,
    /// Identifier of the current source
    Source,
    /// Working directory of the query
    WorkingDirectory,
}

impl SystemValue {
    pub fn data_type(self) -> DataType {
        match self {
            SystemValue::LineNumber | SystemValue::TotalLineNumber => DataType::Integer,
            _ => DataType::Text,
        }
    }

    fn evaluate(self, ctx: &RowContext<'_>) -> Value {
        match self {
            SystemValue::RawLine => Value::text(join_display(ctx.row.original_columns())),
            SystemValue::ProjectedLine => Value::text(join_display(ctx.row.as_slice())),
            SystemValue::LineNumber => Value::Integer(ctx.row.line_no()),
            SystemValue::TotalLineNumber => Value::Integer(ctx.row.total_line_no()),
            SystemValue::Source => Value::text(ctx.row.source()),
            SystemValue::WorkingDirectory => Value::text(ctx.exec.working_directory()),
        }
    }
}

impl fmt::Display for SystemValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SystemValue::RawLine => "RAWLINE",
            SystemValue::ProjectedLine => "LINE",
            SystemValue::LineNumber => "LINENUMBER",
            SystemValue::TotalLineNumber => "TOTALLINENUMBER",
            SystemValue::Source => "SOURCE",
            SystemValue::WorkingDirectory => "CWD",
        };
        f.write_str(name)
    }
}

fn join_display(values: &[Value]) -> String {
    let mut out = String::new();
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push('\t');
        }
        out.push_str(&v.to_display_string());
    }
    out
}

/// Node kinds of a bound expression
pub enum ExprKind {
    Constant(Value),
    /// Column of the current row by index
    Column(usize),
    /// Column of an enclosing row; depth 0 is the immediate parent
    OuterColumn {
        depth: usize,
        index: usize,
    },
    /// Variable or view parameter, converted to the bound type
    Variable(String),
    System(SystemValue),
    Unary(UnaryOp, Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    Like {
        operand: Box<Expression>,
        pattern: Box<Expression>,
        /// Compiled once when the pattern is a literal
        compiled: Option<LikePattern>,
        negated: bool,
    },
    Between {
        operand: Box<Expression>,
        low: Box<Expression>,
        high: Box<Expression>,
        negated: bool,
    },
    InList {
        operand: Box<Expression>,
        list: Vec<Expression>,
        negated: bool,
    },
    Function {
        function: Box<dyn ScalarFunction>,
        args: Vec<Expression>,
    },
    Case {
        operand: Option<Box<Expression>>,
        branches: Vec<(Expression, Expression)>,
        otherwise: Option<Box<Expression>>,
    },
    Convert {
        operand: Box<Expression>,
        target: DataType,
        format: Option<String>,
    },
    Subquery {
        subquery: Box<Subquery>,
        /// Left operand of IN / ANY / ALL
        operand: Option<Box<Expression>>,
    },
    /// Per-group accumulator; `prototype` is bound and never mutated
    Aggregate {
        id: AccumulatorId,
        prototype: Box<dyn AggregateFunction>,
        arg: Box<Expression>,
    },
    /// Per-stream function such as LAG
    Stateful {
        id: AccumulatorId,
        prototype: Box<dyn StatefulFunction>,
        arg: Box<Expression>,
    },
    /// Non-aggregated group output that must not change within a group
    Invariant {
        id: AccumulatorId,
        operand: Box<Expression>,
        text: String,
    },
    /// Value of the k-th grouping key of the group being emitted
    GroupKey(usize),
}

/// A bound expression node with its fixed result type
pub struct Expression {
    kind: ExprKind,
    data_type: DataType,
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("data_type", &self.data_type)
            .finish_non_exhaustive()
    }
}

impl Expression {
    pub fn new(kind: ExprKind, data_type: DataType) -> Self {
        Self { kind, data_type }
    }

    pub fn constant(value: Value) -> Self {
        let data_type = value.data_type();
        Self::new(ExprKind::Constant(value), data_type)
    }

    pub fn column(index: usize, data_type: DataType) -> Self {
        Self::new(ExprKind::Column(index), data_type)
    }

    #[inline]
    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn into_kind(self) -> ExprKind {
        self.kind
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, ExprKind::Constant(_))
    }

    /// Wrap in a conversion unless the type already matches
    pub fn convert_to(self, target: DataType) -> Self {
        if self.data_type == target {
            return self;
        }
        if let ExprKind::Constant(v) = &self.kind {
            if let Ok(converted) = v.convert_to(target, None) {
                return Self::constant(converted);
            }
        }
        Self::new(
            ExprKind::Convert {
                operand: Box::new(self),
                target,
                format: None,
            },
            target,
        )
    }

    /// Visit the direct children of this node.
    ///
    /// A subquery's own pipeline is not a child; only its left operand is.
    pub fn try_for_each_child<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&Expression) -> Result<()>,
    {
        match &self.kind {
            ExprKind::Constant(_)
            | ExprKind::Column(_)
            | ExprKind::OuterColumn { .. }
            | ExprKind::Variable(_)
            | ExprKind::System(_)
            | ExprKind::GroupKey(_) => Ok(()),
            ExprKind::Unary(_, e)
            | ExprKind::Convert { operand: e, .. }
            | ExprKind::Aggregate { arg: e, .. }
            | ExprKind::Stateful { arg: e, .. }
            | ExprKind::Invariant { operand: e, .. } => f(e),
            ExprKind::Binary(_, l, r) => {
                f(l)?;
                f(r)
            }
            ExprKind::Like {
                operand, pattern, ..
            } => {
                f(operand)?;
                f(pattern)
            }
            ExprKind::Between {
                operand, low, high, ..
            } => {
                f(operand)?;
                f(low)?;
                f(high)
            }
            ExprKind::InList { operand, list, .. } => {
                f(operand)?;
                list.iter().try_for_each(f)
            }
            ExprKind::Function { args, .. } => args.iter().try_for_each(f),
            ExprKind::Case {
                operand,
                branches,
                otherwise,
            } => {
                if let Some(op) = operand {
                    f(op)?;
                }
                for (when, then) in branches {
                    f(when)?;
                    f(then)?;
                }
                match otherwise {
                    Some(e) => f(e),
                    None => Ok(()),
                }
            }
            ExprKind::Subquery { operand, .. } => match operand {
                Some(e) => f(e),
                None => Ok(()),
            },
        }
    }

    fn any_node(&self, pred: &dyn Fn(&ExprKind) -> bool) -> bool {
        if pred(&self.kind) {
            return true;
        }
        let mut found = false;
        let _ = self.try_for_each_child(|c| {
            found = found || c.any_node(pred);
            Ok(())
        });
        found
    }

    /// True for aggregates, invariant columns, group keys, and anything
    /// containing one
    pub fn is_aggregated(&self) -> bool {
        self.any_node(&|k| {
            matches!(
                k,
                ExprKind::Aggregate { .. } | ExprKind::Invariant { .. } | ExprKind::GroupKey(_)
            )
        })
    }

    /// True for per-stream functions and anything containing one
    pub fn has_state(&self) -> bool {
        self.any_node(&|k| matches!(k, ExprKind::Stateful { .. }))
    }

    /// Dispose the pipelines of every subquery in this tree
    pub fn dispose_subqueries(&self) {
        if let ExprKind::Subquery { subquery, .. } = &self.kind {
            subquery.dispose();
        }
        let _ = self.try_for_each_child(|child| {
            child.dispose_subqueries();
            Ok(())
        });
    }

    /// Evaluate against one row
    pub fn evaluate(&self, ctx: &RowContext<'_>) -> Result<Value> {
        match &self.kind {
            ExprKind::Constant(v) => Ok(v.clone()),
            ExprKind::Column(index) => ctx
                .row
                .get(*index)
                .cloned()
                .ok_or_else(|| Error::internal(format!("column {} out of range", index))),
            ExprKind::OuterColumn { depth, index } => ctx
                .exec
                .outer_row(*depth)
                .and_then(|row| row.get(*index))
                .cloned()
                .ok_or_else(|| Error::internal("outer row is not available")),
            ExprKind::Variable(name) => {
                let value = ctx.exec.variable(name)?;
                if value.data_type() == self.data_type {
                    Ok(value)
                } else {
                    value.convert_to(self.data_type, None)
                }
            }
            ExprKind::System(system) => Ok(system.evaluate(ctx)),
            ExprKind::Unary(op, operand) => {
                let value = operand.evaluate(ctx)?;
                match op {
                    UnaryOp::Neg => negate(&value),
                    UnaryOp::Not => Ok(Value::Boolean(!truthy(&value)?)),
                }
            }
            ExprKind::Binary(op, left, right) => match op {
                BinaryOp::And => {
                    if !truthy(&left.evaluate(ctx)?)? {
                        return Ok(Value::Boolean(false));
                    }
                    Ok(Value::Boolean(truthy(&right.evaluate(ctx)?)?))
                }
                BinaryOp::Or => {
                    if truthy(&left.evaluate(ctx)?)? {
                        return Ok(Value::Boolean(true));
                    }
                    Ok(Value::Boolean(truthy(&right.evaluate(ctx)?)?))
                }
                op if op.is_comparison() => {
                    let l = left.evaluate(ctx)?;
                    let r = right.evaluate(ctx)?;
                    comparison(*op, &l, &r, ctx.comparer()).map(Value::Boolean)
                }
                op => {
                    let l = left.evaluate(ctx)?;
                    let r = right.evaluate(ctx)?;
                    arithmetic(*op, &l, &r)
                }
            },
            ExprKind::Like {
                operand,
                pattern,
                compiled,
                negated,
            } => {
                let value = operand.evaluate(ctx)?;
                let text = value.to_display_string();
                let matched = match compiled {
                    Some(p) => p.matches(&text, ctx.comparer()),
                    None => {
                        let p = pattern.evaluate(ctx)?.to_display_string();
                        LikePattern::compile(&p, ctx.comparer())?.matches(&text, ctx.comparer())
                    }
                };
                Ok(Value::Boolean(matched != *negated))
            }
            ExprKind::Between {
                operand,
                low,
                high,
                negated,
            } => {
                let v = operand.evaluate(ctx)?;
                let comparer = ctx.comparer();
                let inside = comparer.compare(&v, &low.evaluate(ctx)?)? != Ordering::Less
                    && comparer.compare(&v, &high.evaluate(ctx)?)? != Ordering::Greater;
                Ok(Value::Boolean(inside != *negated))
            }
            ExprKind::InList {
                operand,
                list,
                negated,
            } => {
                let v = operand.evaluate(ctx)?;
                let mut found = false;
                for item in list {
                    if ctx.comparer().equals(&v, &item.evaluate(ctx)?)? {
                        found = true;
                        break;
                    }
                }
                Ok(Value::Boolean(found != *negated))
            }
            ExprKind::Function { function, args } => {
                let values = args
                    .iter()
                    .map(|a| a.evaluate(ctx))
                    .collect::<Result<SmallVec<[Value; 4]>>>()?;
                function.evaluate(&values)
            }
            ExprKind::Case {
                operand,
                branches,
                otherwise,
            } => {
                let subject = match operand {
                    Some(op) => Some(op.evaluate(ctx)?),
                    None => None,
                };
                for (when, then) in branches {
                    let hit = match &subject {
                        Some(s) => ctx.comparer().equals(s, &when.evaluate(ctx)?)?,
                        None => truthy(&when.evaluate(ctx)?)?,
                    };
                    if hit {
                        return then.evaluate(ctx);
                    }
                }
                match otherwise {
                    Some(e) => e.evaluate(ctx),
                    None => Ok(Value::empty(self.data_type)),
                }
            }
            ExprKind::Convert {
                operand,
                target,
                format,
            } => operand
                .evaluate(ctx)?
                .convert_to(*target, format.as_deref()),
            ExprKind::Subquery { subquery, operand } => {
                let left = match operand {
                    Some(e) => Some(e.evaluate(ctx)?),
                    None => None,
                };
                subquery.evaluate(left.as_ref(), ctx)
            }
            ExprKind::Aggregate { id, prototype, .. } => Ok(ctx
                .state
                .and_then(|s| s.aggregate(*id))
                .map_or_else(|| prototype.result(), |agg| agg.result())),
            ExprKind::Stateful { id, prototype, .. } => Ok(ctx
                .state
                .and_then(|s| s.stateful(*id))
                .map_or_else(|| prototype.current(), |func| func.current())),
            ExprKind::Invariant { id, .. } => Ok(ctx
                .state
                .and_then(|s| s.invariant(*id))
                .cloned()
                .unwrap_or_else(|| Value::empty(self.data_type))),
            ExprKind::GroupKey(k) => ctx
                .group_key
                .and_then(|key| key.get(*k))
                .cloned()
                .ok_or_else(|| Error::internal(format!("group key {} is not available", k))),
        }
    }

    /// Evaluate a BOOLEAN expression
    #[inline]
    pub fn evaluate_bool(&self, ctx: &RowContext<'_>) -> Result<bool> {
        truthy(&self.evaluate(ctx)?)
    }

    /// Project the accumulated state of `bin` to an output value
    pub fn finalize(&self, bin: &StateBin, ctx: &RowContext<'_>) -> Result<Value> {
        self.evaluate(&ctx.with_state(bin))
    }

    /// Fold the current row into a group's accumulators
    pub fn accumulate(&self, bin: &mut StateBin, ctx: &RowContext<'_>) -> Result<()> {
        let mut inputs = Vec::new();
        self.collect_inputs(ctx, &mut inputs)?;
        self.apply_inputs(bin, &mut inputs.into_iter(), ctx.comparer())
    }

    /// Evaluate what the current row feeds to each accumulator of this
    /// tree, without touching any state.
    ///
    /// Values are pushed in the order [`Expression::apply_inputs`] consumes
    /// them, so a row that fails or is skipped here leaves every group as
    /// it was.
    pub fn collect_inputs(&self, ctx: &RowContext<'_>, out: &mut Vec<Value>) -> Result<()> {
        match &self.kind {
            ExprKind::Aggregate { arg, .. } => {
                out.push(arg.evaluate(ctx)?);
                Ok(())
            }
            ExprKind::Invariant { operand, .. } => {
                out.push(operand.evaluate(ctx)?);
                Ok(())
            }
            _ => self.try_for_each_child(|child| child.collect_inputs(ctx, out)),
        }
    }

    /// Fold values produced by [`Expression::collect_inputs`] into `bin`
    pub fn apply_inputs(
        &self,
        bin: &mut StateBin,
        inputs: &mut std::vec::IntoIter<Value>,
        comparer: &Comparer,
    ) -> Result<()> {
        match &self.kind {
            ExprKind::Aggregate { id, prototype, .. } => {
                let value = next_input(inputs)?;
                bin.aggregate_mut(*id, prototype.as_ref())?
                    .accumulate(&value, comparer)
            }
            ExprKind::Invariant { id, text, .. } => {
                let value = next_input(inputs)?;
                match bin.invariant(*id) {
                    None => {
                        bin.record_invariant(*id, value);
                        Ok(())
                    }
                    Some(recorded) if comparer.equals(recorded, &value)? => Ok(()),
                    Some(_) => Err(Error::GroupInvariance {
                        expression: text.clone(),
                    }),
                }
            }
            _ => self.try_for_each_child(|child| child.apply_inputs(bin, inputs, comparer)),
        }
    }

    /// Advance every per-stream function in this tree by the current row.
    ///
    /// Children step first, so a function's argument sees the current
    /// output of any function nested inside it.
    pub fn step_state(&self, bin: &mut StateBin, ctx: &RowContext<'_>) -> Result<()> {
        self.try_for_each_child(|child| child.step_state(bin, ctx))?;
        if let ExprKind::Stateful { id, prototype, arg } = &self.kind {
            let value = {
                let inner = RowContext {
                    state: Some(&*bin),
                    ..*ctx
                };
                arg.evaluate(&inner)?
            };
            bin.stateful_mut(*id, prototype.as_ref())?.step(value);
        }
        Ok(())
    }
}

fn next_input(inputs: &mut std::vec::IntoIter<Value>) -> Result<Value> {
    inputs
        .next()
        .ok_or_else(|| Error::internal("accumulator input missing"))
}
