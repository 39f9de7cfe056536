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

//! Unbound query plans
//!
//! A front end hands the engine a [`QueryPlan`] tree whose expressions are
//! [`Expr`] trees referring to columns, variables and functions by name.
//! The [`Planner`](super::Planner) resolves the names and builds providers.

use std::fmt;
use std::sync::Arc;

use crate::core::{ColumnName, DataType, Result, Schema, Value};
use crate::executor::expression::{BinaryOp, SystemValue, UnaryOp};
use crate::executor::operators::SortOrder;
use crate::executor::provider::{MemoryProvider, Provider, SourceFactory};
use crate::executor::subquery::SubqueryKind;

/// Unbound expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Column by name, `alias.name`, or 1-based ordinal
    Column(ColumnName),
    Variable(String),
    System(SystemValue),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Between {
        operand: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    InList {
        operand: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    Like {
        operand: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    /// Scalar, aggregate or stateful function call
    Function {
        name: String,
        args: Vec<Expr>,
    },
    Case {
        operand: Option<Box<Expr>>,
        branches: Vec<(Expr, Expr)>,
        otherwise: Option<Box<Expr>>,
    },
    Convert {
        operand: Box<Expr>,
        target: DataType,
        format: Option<String>,
    },
    Subquery {
        kind: SubqueryKind,
        /// Left operand of IN / ANY / ALL
        operand: Option<Box<Expr>>,
        plan: Box<QueryPlan>,
    },
}

impl Expr {
    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// Column reference; `alias.name` is parsed into a qualified name
    pub fn col(name: &str) -> Self {
        Expr::Column(ColumnName::parse(name))
    }

    /// Column by 1-based position
    pub fn ordinal(position: usize) -> Self {
        Expr::Column(ColumnName::ordinal(position))
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Function {
            name: name.into(),
            args,
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn equals(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Eq, self, other)
    }

    pub fn not(self) -> Self {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }

    pub fn convert(self, target: DataType) -> Self {
        Expr::Convert {
            operand: Box::new(self),
            target,
            format: None,
        }
    }

    pub fn subquery(kind: SubqueryKind, plan: QueryPlan) -> Self {
        Expr::Subquery {
            kind,
            operand: None,
            plan: Box::new(plan),
        }
    }

    /// `self IN (plan)`, `self op ANY (plan)` or `self op ALL (plan)`
    pub fn quantified(self, kind: SubqueryKind, plan: QueryPlan) -> Self {
        Expr::Subquery {
            kind,
            operand: Some(Box::new(self)),
            plan: Box::new(plan),
        }
    }

    /// Visit this node and every node below it, not descending into
    /// subquery plans
    pub fn any(&self, pred: &mut dyn FnMut(&Expr) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            Expr::Literal(_) | Expr::Column(_) | Expr::Variable(_) | Expr::System(_) => false,
            Expr::Unary { operand, .. } | Expr::Convert { operand, .. } => operand.any(pred),
            Expr::Binary { left, right, .. } => left.any(pred) || right.any(pred),
            Expr::Between {
                operand, low, high, ..
            } => operand.any(pred) || low.any(pred) || high.any(pred),
            Expr::InList { operand, list, .. } => {
                operand.any(pred) || list.iter().any(|e| e.any(pred))
            }
            Expr::Like {
                operand, pattern, ..
            } => operand.any(pred) || pattern.any(pred),
            Expr::Function { args, .. } => args.iter().any(|e| e.any(pred)),
            Expr::Case {
                operand,
                branches,
                otherwise,
            } => {
                operand.as_ref().is_some_and(|e| e.any(pred))
                    || branches.iter().any(|(w, t)| w.any(pred) || t.any(pred))
                    || otherwise.as_ref().is_some_and(|e| e.any(pred))
            }
            Expr::Subquery { operand, .. } => operand.as_ref().is_some_and(|e| e.any(pred)),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Value::Text(s)) => write!(f, "'{}'", s.replace('\'', "''")),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Column(name) => write!(f, "{}", name),
            Expr::Variable(name) => write!(f, "@{}", name),
            Expr::System(system) => write!(f, "{}", system),
            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => write!(f, "-{}", operand),
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => write!(f, "NOT {}", operand),
            Expr::Binary { op, left, right } => write!(f, "{} {} {}", left, op, right),
            Expr::Between {
                operand,
                low,
                high,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{} {}BETWEEN {} AND {}", operand, not, low, high)
            }
            Expr::InList {
                operand,
                list,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{} {}IN (", operand, not)?;
                write_list(f, list)?;
                f.write_str(")")
            }
            Expr::Like {
                operand,
                pattern,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{} {}LIKE {}", operand, not, pattern)
            }
            Expr::Function { name, args } => {
                write!(f, "{}(", name.to_uppercase())?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Expr::Case {
                operand,
                branches,
                otherwise,
            } => {
                f.write_str("CASE")?;
                if let Some(op) = operand {
                    write!(f, " {}", op)?;
                }
                for (when, then) in branches {
                    write!(f, " WHEN {} THEN {}", when, then)?;
                }
                if let Some(e) = otherwise {
                    write!(f, " ELSE {}", e)?;
                }
                f.write_str(" END")
            }
            Expr::Convert {
                operand,
                target,
                format,
            } => match format {
                Some(fmt) => write!(f, "CONVERT({}, {}, '{}')", operand, target, fmt),
                None => write!(f, "CONVERT({}, {})", operand, target),
            },
            Expr::Subquery { kind, operand, .. } => match (kind, operand) {
                (SubqueryKind::Exists, _) => f.write_str("EXISTS (SELECT ...)"),
                (SubqueryKind::In, Some(op)) => write!(f, "{} IN (SELECT ...)", op),
                (SubqueryKind::Any(cmp), Some(op)) => write!(f, "{} {} ANY (SELECT ...)", op, cmp),
                (SubqueryKind::All(cmp), Some(op)) => write!(f, "{} {} ALL (SELECT ...)", op, cmp),
                _ => f.write_str("(SELECT ...)"),
            },
        }
    }
}

/// One item of a projection or group-by output list
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Expr { expr: Expr, alias: Option<String> },
    /// `*`
    Wildcard,
    /// `alias.*`
    QualifiedWildcard(String),
}

impl SelectItem {
    pub fn expr(expr: Expr) -> Self {
        SelectItem::Expr { expr, alias: None }
    }

    pub fn aliased(expr: Expr, alias: impl Into<String>) -> Self {
        SelectItem::Expr {
            expr,
            alias: Some(alias.into()),
        }
    }
}

/// A grouping key, optionally marked ORIG
#[derive(Debug, Clone, PartialEq)]
pub struct GroupingKey {
    pub expr: Expr,
    pub orig: bool,
}

impl GroupingKey {
    pub fn new(expr: Expr) -> Self {
        Self { expr, orig: false }
    }

    /// A key the input is already clustered by
    pub fn orig(expr: Expr) -> Self {
        Self { expr, orig: true }
    }
}

/// An ORDER BY key
#[derive(Debug, Clone, PartialEq)]
pub struct OrderKey {
    pub expr: Expr,
    pub order: SortOrder,
}

impl OrderKey {
    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            order: SortOrder::Ascending,
        }
    }

    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            order: SortOrder::Descending,
        }
    }

    pub fn preserve(expr: Expr) -> Self {
        Self {
            expr,
            order: SortOrder::Preserve,
        }
    }
}

/// A named leaf source.
///
/// The factory builds a fresh provider for every compiled pipeline, so one
/// plan can be executed many times.
#[derive(Clone)]
pub struct SourceRef {
    name: String,
    factory: SourceFactory,
}

impl SourceRef {
    pub fn new(name: impl Into<String>, factory: SourceFactory) -> Self {
        Self {
            name: name.into(),
            factory,
        }
    }

    /// A source over in-memory rows
    pub fn memory(name: impl Into<String>, schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        let name = name.into();
        let source = name.clone();
        let rows: Arc<[Vec<Value>]> = Arc::from(rows);
        Self::new(
            name,
            Arc::new(move || {
                Ok(Box::new(
                    MemoryProvider::shared(schema.clone(), Arc::clone(&rows)).with_source(&source),
                ) as Box<dyn Provider>)
            }),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build a fresh provider
    pub fn open(&self) -> Result<Box<dyn Provider>> {
        (self.factory)()
    }
}

impl fmt::Debug for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRef").field("name", &self.name).finish()
    }
}

impl PartialEq for SourceRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.factory, &other.factory)
    }
}

/// Unbound pipeline tree
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPlan {
    Source(SourceRef),
    Filter {
        input: Box<QueryPlan>,
        predicate: Expr,
    },
    Project {
        input: Box<QueryPlan>,
        items: Vec<SelectItem>,
    },
    GroupBy {
        input: Box<QueryPlan>,
        keys: Vec<GroupingKey>,
        items: Vec<SelectItem>,
        having: Option<Expr>,
    },
    OrderBy {
        input: Box<QueryPlan>,
        keys: Vec<OrderKey>,
    },
    Distinct {
        input: Box<QueryPlan>,
    },
    Top {
        input: Box<QueryPlan>,
        limit: usize,
    },
    Bottom {
        input: Box<QueryPlan>,
        limit: usize,
    },
    /// Inputs concatenated in order
    Merge {
        inputs: Vec<QueryPlan>,
    },
    /// Named scope: columns qualified by `alias`
    Alias {
        input: Box<QueryPlan>,
        alias: String,
    },
    /// A registered view, called with arguments
    View {
        name: String,
        arguments: Vec<Expr>,
    },
}

impl QueryPlan {
    pub fn source(source: SourceRef) -> Self {
        QueryPlan::Source(source)
    }

    pub fn view(name: impl Into<String>, arguments: Vec<Expr>) -> Self {
        QueryPlan::View {
            name: name.into(),
            arguments,
        }
    }

    pub fn merge(inputs: Vec<QueryPlan>) -> Self {
        QueryPlan::Merge { inputs }
    }

    pub fn filter(self, predicate: Expr) -> Self {
        QueryPlan::Filter {
            input: Box::new(self),
            predicate,
        }
    }

    pub fn project(self, items: Vec<SelectItem>) -> Self {
        QueryPlan::Project {
            input: Box::new(self),
            items,
        }
    }

    pub fn group_by(
        self,
        keys: Vec<GroupingKey>,
        items: Vec<SelectItem>,
        having: Option<Expr>,
    ) -> Self {
        QueryPlan::GroupBy {
            input: Box::new(self),
            keys,
            items,
            having,
        }
    }

    pub fn order_by(self, keys: Vec<OrderKey>) -> Self {
        QueryPlan::OrderBy {
            input: Box::new(self),
            keys,
        }
    }

    pub fn distinct(self) -> Self {
        QueryPlan::Distinct {
            input: Box::new(self),
        }
    }

    pub fn top(self, limit: usize) -> Self {
        QueryPlan::Top {
            input: Box::new(self),
            limit,
        }
    }

    pub fn bottom(self, limit: usize) -> Self {
        QueryPlan::Bottom {
            input: Box::new(self),
            limit,
        }
    }

    pub fn alias(self, alias: impl Into<String>) -> Self {
        QueryPlan::Alias {
            input: Box::new(self),
            alias: alias.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expr_display() {
        let e = Expr::call(
            "sum",
            vec![Expr::binary(BinaryOp::Mul, Expr::col("bytes"), Expr::lit(2))],
        );
        assert_eq!(e.to_string(), "SUM(bytes * 2)");
        assert_eq!(Expr::col("log.host").to_string(), "log.host");
        assert_eq!(Expr::lit("it's").to_string(), "'it''s'");
        assert_eq!(
            Expr::col("a").equals(Expr::var("min")).not().to_string(),
            "NOT a = @min"
        );
    }

    #[test]
    fn test_expr_any_skips_subquery_plans() {
        let inner = QueryPlan::source(SourceRef::memory("t", Schema::text(&["k"]), vec![]))
            .project(vec![SelectItem::expr(Expr::call("count", vec![]))]);
        let e = Expr::subquery(SubqueryKind::Scalar, inner);
        assert!(!e.any(&mut |n| matches!(n, Expr::Function { .. })));
        assert!(Expr::col("a")
            .equals(Expr::lit(1))
            .any(&mut |n| matches!(n, Expr::Column(_))));
    }

    #[test]
    fn test_source_ref_equality() {
        let a = SourceRef::memory("t", Schema::text(&["k"]), vec![]);
        let b = a.clone();
        let c = SourceRef::memory("t", Schema::text(&["k"]), vec![]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.open().unwrap().schema().len(), 1);
    }
}
