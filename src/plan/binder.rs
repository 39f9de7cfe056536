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

//! Expression binding
//!
//! Turns [`Expr`] trees into typed [`Expression`] trees for one scope.
//! Operands of binary operators are converted to their widened common type
//! here, so evaluation never has to reconcile types.
//!
//! In grouped scopes (group-by output and HAVING) an expression equal to a
//! grouping key becomes a key reference, aggregates bind their argument in
//! row mode, and any other non-constant subtree without aggregates becomes
//! an invariant column checked per group.

use crate::core::{ColumnLabel, ColumnName, DataType, Error, Result, Schema, Value};
use crate::executor::expression::{
    negate, truthy, BinaryOp, ExprKind, Expression, LikePattern, UnaryOp,
};
use crate::executor::subquery::{Subquery, SubqueryKind};
use crate::functions::{ArgInfo, FunctionKind, LagFunction};

use super::ast::Expr;
use super::planner::Planner;

/// Grouping keys of the group-by being bound
pub(super) struct Grouping {
    keys: Vec<Expr>,
    types: Vec<DataType>,
}

impl Grouping {
    pub(super) fn new(keys: Vec<Expr>, types: Vec<DataType>) -> Self {
        Self { keys, types }
    }

    fn position(&self, expr: &Expr) -> Option<usize> {
        self.keys.iter().position(|key| key == expr)
    }

    fn contains_key(&self, expr: &Expr) -> bool {
        expr.any(&mut |e| self.keys.contains(e))
    }
}

/// What an expression may reference and contain
#[derive(Clone, Copy)]
pub(super) struct Scope<'s> {
    pub schema: &'s Schema,
    pub clause: &'static str,
    aggregates: bool,
    stateful: bool,
    grouping: Option<&'s Grouping>,
}

impl<'s> Scope<'s> {
    /// Per-row scope: no aggregates, no LAG
    pub(super) fn row(schema: &'s Schema, clause: &'static str) -> Self {
        Self {
            schema,
            clause,
            aggregates: false,
            stateful: false,
            grouping: None,
        }
    }

    /// Group-by output scope
    pub(super) fn grouped(
        schema: &'s Schema,
        clause: &'static str,
        grouping: &'s Grouping,
    ) -> Self {
        Self {
            schema,
            clause,
            aggregates: true,
            stateful: true,
            grouping: Some(grouping),
        }
    }

    pub(super) fn with_stateful(self) -> Self {
        Self {
            stateful: true,
            ..self
        }
    }

    pub(super) fn without_stateful(self) -> Self {
        Self {
            stateful: false,
            ..self
        }
    }

    /// The scope of an aggregate argument or invariant column
    fn row_mode(self) -> Self {
        Self {
            aggregates: false,
            grouping: None,
            ..self
        }
    }
}

impl Planner<'_> {
    pub(super) fn contains_aggregate(&self, expr: &Expr) -> bool {
        let registry = self.registry;
        expr.any(&mut |e| matches!(e, Expr::Function { name, .. } if registry.is_aggregate(name)))
    }

    /// Bind a predicate that must be BOOLEAN
    pub(super) fn bind_condition(&mut self, expr: &Expr, scope: Scope<'_>) -> Result<Expression> {
        let bound = self.bind_expr(expr, scope)?;
        if bound.data_type() != DataType::Boolean {
            return Err(Error::type_mismatch(format!(
                "{} expects BOOLEAN, got {} for '{}'",
                scope.clause,
                bound.data_type(),
                expr
            )));
        }
        Ok(bound)
    }

    pub(super) fn bind_expr(&mut self, expr: &Expr, scope: Scope<'_>) -> Result<Expression> {
        if let Some(grouping) = scope.grouping {
            if let Some(k) = grouping.position(expr) {
                return Ok(Expression::new(ExprKind::GroupKey(k), grouping.types[k]));
            }
            if !self.contains_aggregate(expr) && !grouping.contains_key(expr) {
                let bound = self.bind_expr(expr, scope.row_mode())?;
                if bound.is_constant() {
                    return Ok(bound);
                }
                let data_type = bound.data_type();
                return Ok(Expression::new(
                    ExprKind::Invariant {
                        id: self.next_accumulator(),
                        operand: Box::new(bound),
                        text: expr.to_string(),
                    },
                    data_type,
                ));
            }
        }

        match expr {
            Expr::Literal(value) => Ok(Expression::constant(value.clone())),
            Expr::Column(name) => self.resolve_column(name, scope),
            Expr::Variable(name) => self.bind_variable(name),
            Expr::System(system) => Ok(Expression::new(
                ExprKind::System(*system),
                system.data_type(),
            )),
            Expr::Unary { op, operand } => self.bind_unary(*op, operand, scope),
            Expr::Binary { op, left, right } => {
                let left = self.bind_expr(left, scope)?;
                let right = self.bind_expr(right, scope)?;
                bind_binary(*op, left, right)
            }
            Expr::Between {
                operand,
                low,
                high,
                negated,
            } => {
                let operand = self.bind_expr(operand, scope)?;
                let low = self.bind_expr(low, scope)?;
                let high = self.bind_expr(high, scope)?;
                let common = common_type(&[&operand, &low, &high])?;
                Ok(Expression::new(
                    ExprKind::Between {
                        operand: Box::new(operand.convert_to(common)),
                        low: Box::new(low.convert_to(common)),
                        high: Box::new(high.convert_to(common)),
                        negated: *negated,
                    },
                    DataType::Boolean,
                ))
            }
            Expr::InList {
                operand,
                list,
                negated,
            } => {
                let operand = self.bind_expr(operand, scope)?;
                let list = list
                    .iter()
                    .map(|e| self.bind_expr(e, scope))
                    .collect::<Result<Vec<_>>>()?;
                let mut all: Vec<&Expression> = vec![&operand];
                all.extend(list.iter());
                let common = common_type(&all)?;
                Ok(Expression::new(
                    ExprKind::InList {
                        operand: Box::new(operand.convert_to(common)),
                        list: list.into_iter().map(|e| e.convert_to(common)).collect(),
                        negated: *negated,
                    },
                    DataType::Boolean,
                ))
            }
            Expr::Like {
                operand,
                pattern,
                negated,
            } => {
                let operand = self.bind_expr(operand, scope)?.convert_to(DataType::Text);
                let pattern = self.bind_expr(pattern, scope)?.convert_to(DataType::Text);
                let compiled = match pattern.kind() {
                    ExprKind::Constant(Value::Text(p)) => {
                        Some(LikePattern::compile(p, &self.comparer)?)
                    }
                    _ => None,
                };
                Ok(Expression::new(
                    ExprKind::Like {
                        operand: Box::new(operand),
                        pattern: Box::new(pattern),
                        compiled,
                        negated: *negated,
                    },
                    DataType::Boolean,
                ))
            }
            Expr::Function { name, args } => self.bind_function(name, args, scope),
            Expr::Case {
                operand,
                branches,
                otherwise,
            } => self.bind_case(operand.as_deref(), branches, otherwise.as_deref(), scope),
            Expr::Convert {
                operand,
                target,
                format,
            } => {
                let operand = self.bind_expr(operand, scope)?;
                if format.is_none() {
                    return Ok(operand.convert_to(*target));
                }
                Ok(Expression::new(
                    ExprKind::Convert {
                        operand: Box::new(operand),
                        target: *target,
                        format: format.clone(),
                    },
                    *target,
                ))
            }
            Expr::Subquery {
                kind,
                operand,
                plan,
            } => {
                self.outer.push(scope.schema.clone());
                let provider = self.plan(plan);
                self.outer.pop();
                let subquery = Subquery::new(*kind, provider?)?;

                let operand = match (kind, operand) {
                    (SubqueryKind::Scalar | SubqueryKind::Exists, None) => None,
                    (SubqueryKind::In | SubqueryKind::Any(_) | SubqueryKind::All(_), Some(e)) => {
                        let bound = self.bind_expr(e, scope)?;
                        let common = bound
                            .data_type()
                            .widen(subquery.column_type())
                            .ok_or_else(|| {
                                Error::incomparable(bound.data_type(), subquery.column_type())
                            })?;
                        let bound = if common == subquery.column_type() {
                            bound.convert_to(common)
                        } else {
                            bound
                        };
                        Some(Box::new(bound))
                    }
                    _ => {
                        return Err(Error::invalid_query(format!(
                            "malformed subquery expression '{}'",
                            expr
                        )))
                    }
                };
                let data_type = subquery.data_type();
                Ok(Expression::new(
                    ExprKind::Subquery {
                        subquery: Box::new(subquery),
                        operand,
                    },
                    data_type,
                ))
            }
        }
    }

    /// Resolve against the current schema, then enclosing scopes innermost
    /// first
    fn resolve_column(&self, name: &ColumnName, scope: Scope<'_>) -> Result<Expression> {
        if let ColumnLabel::Ordinal(position) = name.label() {
            return position
                .checked_sub(1)
                .and_then(|i| scope.schema.column(i).map(|c| (i, c.data_type)))
                .map(|(i, t)| Expression::column(i, t))
                .ok_or_else(|| Error::ColumnNotFound(name.to_string()));
        }
        if let Some(index) = scope.schema.resolve(name)? {
            if let Some(column) = scope.schema.column(index) {
                return Ok(Expression::column(index, column.data_type));
            }
        }
        for (depth, outer) in self.outer.iter().rev().enumerate() {
            if let Some(index) = outer.resolve(name)? {
                if let Some(column) = outer.column(index) {
                    return Ok(Expression::new(
                        ExprKind::OuterColumn { depth, index },
                        column.data_type,
                    ));
                }
            }
        }
        if let Some(alias) = name.alias() {
            let known =
                scope.schema.has_alias(alias) || self.outer.iter().any(|s| s.has_alias(alias));
            if !known {
                return Err(Error::AliasNotFound(alias.to_string()));
            }
        }
        Err(Error::ColumnNotFound(name.to_string()))
    }

    /// View parameters innermost first, then declared variables
    fn bind_variable(&self, name: &str) -> Result<Expression> {
        let key = name.to_lowercase();
        let data_type = self
            .parameters
            .iter()
            .rev()
            .find_map(|params| params.get(&key).copied())
            .or_else(|| self.variables.read().data_type(name))
            .ok_or_else(|| Error::VariableNotFound(name.to_string()))?;
        Ok(Expression::new(
            ExprKind::Variable(name.to_string()),
            data_type,
        ))
    }

    fn bind_unary(&mut self, op: UnaryOp, operand: &Expr, scope: Scope<'_>) -> Result<Expression> {
        let operand = self.bind_expr(operand, scope)?;
        let data_type = match op {
            UnaryOp::Neg if operand.data_type().is_numeric() => operand.data_type(),
            UnaryOp::Not if operand.data_type() == DataType::Boolean => DataType::Boolean,
            _ => {
                return Err(Error::type_mismatch(format!(
                    "operator {:?} not defined for {}",
                    op,
                    operand.data_type()
                )))
            }
        };
        if let ExprKind::Constant(value) = operand.kind() {
            let folded = match op {
                UnaryOp::Neg => negate(value)?,
                UnaryOp::Not => Value::Boolean(!truthy(value)?),
            };
            return Ok(Expression::constant(folded));
        }
        Ok(Expression::new(
            ExprKind::Unary(op, Box::new(operand)),
            data_type,
        ))
    }

    fn bind_case(
        &mut self,
        operand: Option<&Expr>,
        branches: &[(Expr, Expr)],
        otherwise: Option<&Expr>,
        scope: Scope<'_>,
    ) -> Result<Expression> {
        let subject = match operand {
            Some(e) => Some(self.bind_expr(e, scope)?),
            None => None,
        };
        let mut whens = Vec::with_capacity(branches.len());
        let mut thens = Vec::with_capacity(branches.len());
        for (when, then) in branches {
            let when = match subject {
                Some(_) => self.bind_expr(when, scope)?,
                None => self.bind_condition(when, scope)?,
            };
            whens.push(when);
            thens.push(self.bind_expr(then, scope)?);
        }
        let otherwise = match otherwise {
            Some(e) => Some(self.bind_expr(e, scope)?),
            None => None,
        };

        let mut results: Vec<&Expression> = thens.iter().collect();
        results.extend(otherwise.iter());
        let result_type = common_type(&results)?;

        let subject = match subject {
            Some(subject) => {
                let mut compared: Vec<&Expression> = vec![&subject];
                compared.extend(whens.iter());
                let common = common_type(&compared)?;
                whens = whens.into_iter().map(|w| w.convert_to(common)).collect();
                Some(Box::new(subject.convert_to(common)))
            }
            None => None,
        };
        let branches = whens
            .into_iter()
            .zip(thens)
            .map(|(w, t)| (w, t.convert_to(result_type)))
            .collect();
        Ok(Expression::new(
            ExprKind::Case {
                operand: subject,
                branches,
                otherwise: otherwise.map(|e| Box::new(e.convert_to(result_type))),
            },
            result_type,
        ))
    }

    fn bind_function(&mut self, name: &str, args: &[Expr], scope: Scope<'_>) -> Result<Expression> {
        let kind = self
            .registry
            .kind(name)
            .ok_or_else(|| Error::FunctionNotFound(name.to_string()))?;
        if let Some(info) = self.registry.get_info(name) {
            info.signature.validate_arg_count(&info.name, args.len())?;
        }
        let upper = name.to_uppercase();

        match kind {
            FunctionKind::Scalar => {
                let mut function = self
                    .registry
                    .get_scalar(name)
                    .ok_or_else(|| Error::FunctionNotFound(name.to_string()))?;
                let bound = args
                    .iter()
                    .map(|a| self.bind_expr(a, scope))
                    .collect::<Result<Vec<_>>>()?;
                let infos: Vec<ArgInfo> = bound
                    .iter()
                    .map(|e| {
                        let constant = match e.kind() {
                            ExprKind::Constant(v) => Some(v.clone()),
                            _ => None,
                        };
                        ArgInfo::new(e.data_type(), constant)
                    })
                    .collect();
                let data_type = function.bind(&infos, self.config)?;
                Ok(Expression::new(
                    ExprKind::Function {
                        function,
                        args: bound,
                    },
                    data_type,
                ))
            }
            FunctionKind::Aggregate | FunctionKind::Average => {
                if !scope.aggregates {
                    return Err(Error::invalid_query(format!(
                        "aggregate {} not allowed in {}",
                        upper, scope.clause
                    )));
                }
                let arg_scope = scope.row_mode();
                if let Some(nested) = args.iter().find(|a| self.contains_aggregate(a)) {
                    return Err(Error::invalid_query(format!(
                        "nested aggregate in {}({})",
                        upper, nested
                    )));
                }
                let arg = match args.first() {
                    Some(a) => self.bind_expr(a, arg_scope)?,
                    None => Expression::constant(Value::integer(1)),
                };
                if kind == FunctionKind::Average {
                    self.bind_average(arg)
                } else {
                    self.bind_aggregate(&upper, arg)
                }
            }
            FunctionKind::Stateful => {
                if !scope.stateful {
                    return Err(Error::invalid_query(format!(
                        "{} not allowed in {}",
                        upper, scope.clause
                    )));
                }
                self.bind_lag(args, scope.row_mode())
            }
        }
    }

    fn bind_aggregate(&mut self, name: &str, arg: Expression) -> Result<Expression> {
        let mut prototype = self
            .registry
            .get_aggregate(name)
            .ok_or_else(|| Error::FunctionNotFound(name.to_string()))?;
        let data_type = prototype.bind(arg.data_type())?;
        Ok(Expression::new(
            ExprKind::Aggregate {
                id: self.next_accumulator(),
                prototype,
                arg: Box::new(arg),
            },
            data_type,
        ))
    }

    /// AVG(x) as CASE WHEN COUNT = 0 THEN 0.0 ELSE SUM(x) / COUNT END
    fn bind_average(&mut self, arg: Expression) -> Result<Expression> {
        let sum = self.bind_aggregate("SUM", arg)?;
        let one = || Expression::constant(Value::integer(1));
        let empty = Expression::new(
            ExprKind::Binary(
                BinaryOp::Eq,
                Box::new(self.bind_aggregate("COUNT", one())?),
                Box::new(Expression::constant(Value::integer(0))),
            ),
            DataType::Boolean,
        );
        let quotient = Expression::new(
            ExprKind::Binary(
                BinaryOp::Div,
                Box::new(sum.convert_to(DataType::Float)),
                Box::new(
                    self.bind_aggregate("COUNT", one())?
                        .convert_to(DataType::Float),
                ),
            ),
            DataType::Float,
        );
        Ok(Expression::new(
            ExprKind::Case {
                operand: None,
                branches: vec![(empty, Expression::constant(Value::float(0.0)))],
                otherwise: Some(Box::new(quotient)),
            },
            DataType::Float,
        ))
    }

    /// LAG(expr[, offset[, default]]) with constant offset and default
    fn bind_lag(&mut self, args: &[Expr], scope: Scope<'_>) -> Result<Expression> {
        let first = args
            .first()
            .ok_or_else(|| Error::invalid_argument("LAG expects an expression"))?;
        let arg = self.bind_expr(first, scope)?;
        let data_type = arg.data_type();

        let offset = match args.get(1) {
            None => 1,
            Some(e) => match self.bind_expr(e, scope)?.into_kind() {
                ExprKind::Constant(Value::Integer(n)) if n >= 0 => n as usize,
                _ => {
                    return Err(Error::invalid_argument(
                        "LAG offset must be a non-negative integer constant",
                    ))
                }
            },
        };
        let default = match args.get(2) {
            None => Value::empty(data_type),
            Some(e) => match self.bind_expr(e, scope)?.into_kind() {
                ExprKind::Constant(v) => v.convert_to(data_type, None)?,
                _ => {
                    return Err(Error::invalid_argument(
                        "LAG default must be a constant",
                    ))
                }
            },
        };

        Ok(Expression::new(
            ExprKind::Stateful {
                id: self.next_accumulator(),
                prototype: Box::new(LagFunction::new(offset, default)),
                arg: Box::new(arg),
            },
            data_type,
        ))
    }
}

/// Bind a binary operator, converting both sides to their common type
fn bind_binary(op: BinaryOp, left: Expression, right: Expression) -> Result<Expression> {
    let (lt, rt) = (left.data_type(), right.data_type());
    if op.is_logical() {
        if lt != DataType::Boolean || rt != DataType::Boolean {
            return Err(Error::type_mismatch(format!(
                "{} expects BOOLEAN operands, got {} and {}",
                op, lt, rt
            )));
        }
        return Ok(Expression::new(
            ExprKind::Binary(op, Box::new(left), Box::new(right)),
            DataType::Boolean,
        ));
    }

    let common = if op.is_comparison() {
        lt.widen(rt).ok_or_else(|| Error::incomparable(lt, rt))?
    } else {
        lt.widen(rt)
            .filter(|t| t.is_numeric() || (*t == DataType::Text && op == BinaryOp::Add))
            .ok_or_else(|| {
                Error::type_mismatch(format!("operator {} not defined for {} and {}", op, lt, rt))
            })?
    };
    let data_type = if op.is_comparison() {
        DataType::Boolean
    } else {
        common
    };
    Ok(Expression::new(
        ExprKind::Binary(
            op,
            Box::new(left.convert_to(common)),
            Box::new(right.convert_to(common)),
        ),
        data_type,
    ))
}

/// The widened type of all operands
fn common_type(exprs: &[&Expression]) -> Result<DataType> {
    let mut iter = exprs.iter();
    let first = iter
        .next()
        .map(|e| e.data_type())
        .ok_or_else(|| Error::internal("no operands to unify"))?;
    iter.try_fold(first, |acc, e| {
        acc.widen(e.data_type())
            .ok_or_else(|| Error::incomparable(acc, e.data_type()))
    })
}
