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

//! Plan binding
//!
//! The planner walks a [`QueryPlan`] bottom-up. Each child is built first,
//! and its schema is the scope the parent's expressions resolve against.
//! Name resolution, typing, aggregate rewriting and accumulator numbering
//! all happen here, so a bound pipeline never fails on an unknown name.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::core::{
    ColumnInfo, ColumnLabel, ColumnName, Comparer, DataType, Error, Result, Schema, Value,
};
use crate::executor::context::Variables;
use crate::executor::expression::Expression;
use crate::executor::operators::{
    BottomProvider, DistinctProvider, FilterProvider, GroupByProvider, GroupKey, MergeProvider,
    NamedScopeProvider, OrderByProvider, ParameterizedScopeProvider, ProjectionProvider,
    SortKey, TopProvider,
};
use crate::executor::provider::Provider;
use crate::executor::state::AccumulatorId;
use crate::executor::QueryConfig;
use crate::functions::{global_registry, FunctionRegistry};

use super::ast::{Expr, GroupingKey, OrderKey, QueryPlan, SelectItem};
use super::binder::{Grouping, Scope};
use super::view::ViewRegistry;

/// Output item after wildcard expansion
pub(super) struct OutputItem {
    pub expr: Expr,
    pub name: ColumnName,
}

/// Binds plans into provider pipelines
pub struct Planner<'a> {
    pub(super) config: &'a QueryConfig,
    pub(super) comparer: Arc<Comparer>,
    pub(super) variables: &'a RwLock<Variables>,
    views: &'a ViewRegistry,
    pub(super) registry: &'static FunctionRegistry,
    /// Schemas of enclosing stages of correlated subqueries, innermost last
    pub(super) outer: Vec<Schema>,
    /// Parameter types of the views being planned, innermost last
    pub(super) parameters: Vec<FxHashMap<String, DataType>>,
    view_stack: Vec<String>,
    next_id: u32,
}

impl<'a> Planner<'a> {
    pub fn new(
        config: &'a QueryConfig,
        variables: &'a RwLock<Variables>,
        views: &'a ViewRegistry,
    ) -> Self {
        Self::with_comparer(config, Arc::new(config.comparer()), variables, views)
    }

    /// Plan with a comparer shared with the execution context
    pub fn with_comparer(
        config: &'a QueryConfig,
        comparer: Arc<Comparer>,
        variables: &'a RwLock<Variables>,
        views: &'a ViewRegistry,
    ) -> Self {
        Self {
            config,
            comparer,
            variables,
            views,
            registry: global_registry(),
            outer: Vec::new(),
            parameters: Vec::new(),
            view_stack: Vec::new(),
            next_id: 0,
        }
    }

    /// Number of accumulators assigned so far
    pub fn accumulator_count(&self) -> u32 {
        self.next_id
    }

    pub(super) fn next_accumulator(&mut self) -> AccumulatorId {
        let id = AccumulatorId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Bind a plan into a pipeline
    pub fn plan(&mut self, plan: &QueryPlan) -> Result<Box<dyn Provider>> {
        match plan {
            QueryPlan::Source(source) => source.open(),
            QueryPlan::Filter { input, predicate } => {
                let input = self.plan(input)?;
                let predicate = self.bind_condition(predicate, Scope::row(input.schema(), "WHERE"))?;
                Ok(Box::new(FilterProvider::new(input, predicate)))
            }
            QueryPlan::Project { input, items } => {
                if items.iter().any(|item| match item {
                    SelectItem::Expr { expr, .. } => self.contains_aggregate(expr),
                    _ => false,
                }) {
                    // Aggregates without GROUP BY form a single group
                    return self.plan_group_by(input, &[], items, None);
                }
                self.plan_projection(input, items)
            }
            QueryPlan::GroupBy {
                input,
                keys,
                items,
                having,
            } => self.plan_group_by(input, keys, items, having.as_ref()),
            QueryPlan::OrderBy { input, keys } => self.plan_order_by(input, keys),
            QueryPlan::Distinct { input } => Ok(Box::new(DistinctProvider::new(self.plan(input)?))),
            QueryPlan::Top { input, limit } => {
                Ok(Box::new(TopProvider::new(self.plan(input)?, *limit)))
            }
            QueryPlan::Bottom { input, limit } => {
                Ok(Box::new(BottomProvider::new(self.plan(input)?, *limit)))
            }
            QueryPlan::Merge { inputs } => self.plan_merge(inputs),
            QueryPlan::Alias { input, alias } => {
                Ok(Box::new(NamedScopeProvider::new(self.plan(input)?, alias.clone())))
            }
            QueryPlan::View { name, arguments } => self.plan_view(name, arguments),
        }
    }

    fn plan_projection(
        &mut self,
        input: &QueryPlan,
        items: &[SelectItem],
    ) -> Result<Box<dyn Provider>> {
        let input = self.plan(input)?;
        let items = expand_items(items, input.schema())?;
        let scope = Scope::row(input.schema(), "SELECT").with_stateful();

        let mut exprs = Vec::with_capacity(items.len());
        let mut columns = Vec::with_capacity(items.len());
        for item in items {
            let bound = self.bind_expr(&item.expr, scope)?;
            columns.push(ColumnInfo::new(item.name, bound.data_type()));
            exprs.push(bound);
        }
        Ok(Box::new(ProjectionProvider::new(
            input,
            exprs,
            Schema::new(columns),
        )))
    }

    fn plan_group_by(
        &mut self,
        input: &QueryPlan,
        keys: &[GroupingKey],
        items: &[SelectItem],
        having: Option<&Expr>,
    ) -> Result<Box<dyn Provider>> {
        let input = self.plan(input)?;
        let items = expand_items(items, input.schema())?;

        let mut key_exprs = Vec::with_capacity(keys.len());
        let mut bound_keys = Vec::with_capacity(keys.len());
        let mut key_types = Vec::with_capacity(keys.len());
        let key_scope = Scope::row(input.schema(), "GROUP BY").with_stateful();
        for key in keys {
            let expr = output_reference(&key.expr, &items, "GROUP BY")?;
            if self.contains_aggregate(expr) {
                return Err(Error::invalid_query(format!(
                    "aggregate in GROUP BY key '{}'",
                    expr
                )));
            }
            let bound = self.bind_expr(expr, key_scope)?;
            key_types.push(bound.data_type());
            bound_keys.push(GroupKey::new(bound, key.orig));
            key_exprs.push(expr.clone());
        }
        let grouping = Grouping::new(key_exprs, key_types);

        let item_scope = Scope::grouped(input.schema(), "SELECT", &grouping);
        let mut exprs = Vec::with_capacity(items.len());
        let mut columns = Vec::with_capacity(items.len());
        for item in &items {
            let bound = self.bind_expr(&item.expr, item_scope)?;
            columns.push(ColumnInfo::new(item.name.clone(), bound.data_type()));
            exprs.push(bound);
        }

        let having = match having {
            Some(expr) => {
                let expr = output_reference(expr, &items, "HAVING")?;
                let scope = Scope::grouped(input.schema(), "HAVING", &grouping).without_stateful();
                Some(self.bind_condition(expr, scope)?)
            }
            None => None,
        };

        Ok(Box::new(GroupByProvider::new(
            input,
            bound_keys,
            exprs,
            having,
            Schema::new(columns),
        )))
    }

    fn plan_order_by(&mut self, input: &QueryPlan, keys: &[OrderKey]) -> Result<Box<dyn Provider>> {
        let input = self.plan(input)?;
        let scope = Scope::row(input.schema(), "ORDER BY");
        let mut bound = Vec::with_capacity(keys.len());
        for key in keys {
            let expr = match &key.expr {
                Expr::Literal(Value::Integer(n)) if *n > 0 => Expr::ordinal(*n as usize),
                other => other.clone(),
            };
            bound.push(SortKey::new(self.bind_expr(&expr, scope)?, key.order));
        }
        Ok(Box::new(OrderByProvider::new(input, bound)?))
    }

    /// Later inputs are converted to the column types of the first
    fn plan_merge(&mut self, inputs: &[QueryPlan]) -> Result<Box<dyn Provider>> {
        let mut providers: Vec<Box<dyn Provider>> = Vec::with_capacity(inputs.len());
        let mut types: Vec<DataType> = Vec::new();
        for plan in inputs {
            let provider = self.plan(plan)?;
            if providers.is_empty() {
                types = provider.schema().column_types();
                providers.push(provider);
                continue;
            }
            if provider.schema().len() != types.len() {
                return Err(Error::invalid_query(format!(
                    "merged inputs have {} and {} columns",
                    types.len(),
                    provider.schema().len()
                )));
            }
            if provider.schema().column_types() == types {
                providers.push(provider);
                continue;
            }
            let mut exprs = Vec::with_capacity(types.len());
            let mut columns = Vec::with_capacity(types.len());
            for (index, (column, target)) in
                provider.schema().columns().iter().zip(&types).enumerate()
            {
                exprs.push(Expression::column(index, column.data_type).convert_to(*target));
                columns.push(ColumnInfo::new(column.name.clone(), *target));
            }
            providers.push(Box::new(ProjectionProvider::new(
                provider,
                exprs,
                Schema::new(columns),
            )));
        }
        Ok(Box::new(MergeProvider::new(providers)?))
    }

    fn plan_view(&mut self, name: &str, arguments: &[Expr]) -> Result<Box<dyn Provider>> {
        let view = self
            .views
            .get(name)
            .ok_or_else(|| Error::ViewNotFound(name.to_string()))?;
        if self
            .view_stack
            .iter()
            .any(|v| v.eq_ignore_ascii_case(&view.name))
        {
            return Err(Error::invalid_query(format!(
                "view '{}' refers to itself",
                view.name
            )));
        }
        if arguments.len() != view.parameters.len() {
            return Err(Error::invalid_query(format!(
                "view '{}' expects {} arguments, got {}",
                view.name,
                view.parameters.len(),
                arguments.len()
            )));
        }

        // Arguments are evaluated once, before the view produces any row
        let empty = Schema::default();
        let scope = Scope::row(&empty, "view argument");
        let mut bound = Vec::with_capacity(arguments.len());
        let mut types = FxHashMap::default();
        for ((param, data_type), arg) in view.parameters.iter().zip(arguments) {
            let expr = self.bind_expr(arg, scope)?.convert_to(*data_type);
            types.insert(param.to_lowercase(), *data_type);
            bound.push((param.clone(), expr));
        }

        let outer = std::mem::take(&mut self.outer);
        self.parameters.push(types);
        self.view_stack.push(view.name.clone());
        let body = self.plan(&view.plan);
        self.view_stack.pop();
        self.parameters.pop();
        self.outer = outer;
        let body = body?;

        log::debug!("Planner: bound view '{}'", view.name);
        if bound.is_empty() {
            Ok(body)
        } else {
            Ok(Box::new(ParameterizedScopeProvider::new(body, bound)))
        }
    }
}

/// Expand `*` and `alias.*` and name every output item
fn expand_items(items: &[SelectItem], schema: &Schema) -> Result<Vec<OutputItem>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            SelectItem::Expr { expr, alias } => out.push(OutputItem {
                name: output_name(expr, alias.as_deref(), schema),
                expr: expr.clone(),
            }),
            SelectItem::Wildcard => {
                for (index, column) in schema.columns().iter().enumerate() {
                    out.push(OutputItem {
                        expr: Expr::ordinal(index + 1),
                        name: column.name.clone(),
                    });
                }
            }
            SelectItem::QualifiedWildcard(alias) => {
                if !schema.has_alias(alias) {
                    return Err(Error::AliasNotFound(alias.clone()));
                }
                for (index, column) in schema.columns().iter().enumerate() {
                    if column
                        .name
                        .alias()
                        .is_some_and(|a| a.eq_ignore_ascii_case(alias))
                    {
                        out.push(OutputItem {
                            expr: Expr::ordinal(index + 1),
                            name: column.name.clone(),
                        });
                    }
                }
            }
        }
    }
    Ok(out)
}

fn output_name(expr: &Expr, alias: Option<&str>, schema: &Schema) -> ColumnName {
    if let Some(alias) = alias {
        return ColumnName::new(alias);
    }
    if let Expr::Column(column) = expr {
        match column.label() {
            ColumnLabel::Name(name) => return ColumnName::new(name),
            ColumnLabel::Ordinal(position) => {
                if let Some(info) = position.checked_sub(1).and_then(|i| schema.column(i)) {
                    return info.name.clone();
                }
            }
        }
    }
    ColumnName::new(expr.to_string())
}

/// A constant integer N in GROUP BY / HAVING names the N-th output item
fn output_reference<'e>(
    expr: &'e Expr,
    items: &'e [OutputItem],
    clause: &str,
) -> Result<&'e Expr> {
    match expr {
        Expr::Literal(Value::Integer(n)) => usize::try_from(*n)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| items.get(i))
            .map(|item| &item.expr)
            .ok_or_else(|| {
                Error::invalid_query(format!(
                    "{} position {} is not in the output list",
                    clause, n
                ))
            }),
        _ => Ok(expr),
    }
}
