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

//! Query executor
//!
//! This module provides the execution engine: bound expressions, the
//! provider contract and the pipeline stages built on it.
//!
//! # Architecture
//!
//! Every stage wraps the stage below it and pulls one row at a time:
//!
//! ```text
//! Source (lines, regex, delimited, memory)
//!   ↓
//! FilterProvider (WHERE)
//!   ↓
//! GroupByProvider (GROUP BY / HAVING)
//!   ↓
//! OrderByProvider (ORDER BY)
//!   ↓
//! TopProvider / BottomProvider
//!   ↓
//! Consumer (QueryOutput or RowStream)
//! ```
//!
//! # Components
//!
//! - [`Executor`] - Binds plans and drives their pipelines
//! - [`Provider`] - The pull-iterator contract of every stage
//! - [`Expression`] - Bound expression trees
//! - [`StateBin`] - Per-group / per-stream accumulator store

pub mod config;
pub mod context;
pub mod expression;
pub mod operators;
pub mod provider;
pub mod state;
pub mod subquery;

use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::{ColumnInfo, DataType, Result, Row, Schema, Value};
use crate::plan::{Planner, QueryPlan, ViewDefinition, ViewRegistry};

pub use config::{NoMatchPolicy, QueryConfig, WarningPolicy};
pub use context::{CancellationToken, ExecutionContext, RowContext, Variables, Warning};
pub use expression::{BinaryOp, ExprKind, Expression, SystemValue, UnaryOp};
pub use operators::{
    BottomProvider, DistinctProvider, FilterProvider, GroupByProvider, GroupKey, MergeProvider,
    NamedScopeProvider, OrderByProvider, ParameterizedScopeProvider, ProjectionProvider,
    SortKey, SortOrder, TopProvider,
};
pub use provider::{drain, MemoryProvider, Provider, ProviderState, SourceFactory};
pub use state::{AccumulatorId, StateBin};
pub use subquery::{Subquery, SubqueryKind};

/// The fully drained result of a query
#[derive(Debug, Clone)]
pub struct QueryOutput {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Row>,
    pub warnings: Vec<Warning>,
}

impl QueryOutput {
    /// Column values of every row
    pub fn values(&self) -> Vec<Vec<Value>> {
        self.rows.iter().map(|r| r.as_slice().to_vec()).collect()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Query executor
///
/// Owns the environment queries run in: configuration, declared variables,
/// the view registry and the cancellation token. Each query gets its own
/// execution context and comparer.
pub struct Executor {
    config: QueryConfig,
    variables: Arc<RwLock<Variables>>,
    views: ViewRegistry,
    cancellation: CancellationToken,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(QueryConfig::default())
    }
}

impl Executor {
    /// Create a new executor with the given configuration
    pub fn new(config: QueryConfig) -> Self {
        Self {
            config,
            variables: Arc::new(RwLock::new(Variables::new())),
            views: ViewRegistry::new(),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: QueryConfig) {
        self.config = config;
    }

    /// Token that interrupts running queries of this executor
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn variables(&self) -> &Arc<RwLock<Variables>> {
        &self.variables
    }

    /// Declare a typed variable
    pub fn declare_variable(
        &self,
        name: &str,
        data_type: DataType,
        initial: Option<Value>,
    ) -> Result<()> {
        self.variables.write().declare(name, data_type, initial)
    }

    /// Assign a declared variable, converting to its type
    pub fn set_variable(&self, name: &str, value: Value) -> Result<()> {
        self.variables.write().set(name, value)
    }

    /// Register (or replace) a view
    pub fn register_view(&mut self, view: ViewDefinition) {
        self.views.register(view);
    }

    pub fn views(&self) -> &ViewRegistry {
        &self.views
    }

    /// Bind a plan into a pipeline without running it
    pub fn compile(&self, plan: &QueryPlan) -> Result<Box<dyn Provider>> {
        Planner::new(&self.config, &self.variables, &self.views).plan(plan)
    }

    /// Bind a plan and build its context around one comparer
    fn prepare(&self, plan: &QueryPlan) -> Result<(Box<dyn Provider>, ExecutionContext)> {
        let comparer = Arc::new(self.config.comparer());
        let root = Planner::with_comparer(
            &self.config,
            Arc::clone(&comparer),
            &self.variables,
            &self.views,
        )
        .plan(plan)?;
        let ctx = ExecutionContext::with_environment(
            self.config.clone(),
            Arc::clone(&self.variables),
            self.cancellation.clone(),
        )
        .with_comparer(comparer);
        Ok((root, ctx))
    }

    /// Run a plan to completion
    pub fn execute(&self, plan: &QueryPlan) -> Result<QueryOutput> {
        let (mut root, ctx) = self.prepare(plan)?;
        let columns = root.schema().columns().to_vec();

        root.initialize(&ctx)?;
        let drained = drain(root.as_mut());
        let closed = root.uninitialize();
        root.dispose();
        let rows = drained?;
        closed?;

        log::debug!(
            "Executor: query produced {} rows, {} warnings",
            rows.len(),
            ctx.warnings().len()
        );
        Ok(QueryOutput {
            columns,
            rows,
            warnings: ctx.take_warnings(),
        })
    }

    /// Run a plan, handing rows to the caller one at a time
    pub fn stream(&self, plan: &QueryPlan) -> Result<RowStream> {
        let (mut root, ctx) = self.prepare(plan)?;
        root.initialize(&ctx)?;
        Ok(RowStream {
            root,
            ctx,
            finished: false,
        })
    }
}

/// Iterator over the rows of a running pipeline.
///
/// The pipeline is uninitialized when the stream ends or fails, and
/// disposed when the stream is dropped.
pub struct RowStream {
    root: Box<dyn Provider>,
    ctx: ExecutionContext,
    finished: bool,
}

impl RowStream {
    pub fn schema(&self) -> &Schema {
        self.root.schema()
    }

    /// Warnings recorded so far
    pub fn warnings(&self) -> Vec<Warning> {
        self.ctx.warnings()
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        self.root.uninitialize()
    }
}

impl Iterator for RowStream {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.root.next() {
            Ok(true) => Some(Ok(self.root.take_row())),
            Ok(false) => self.finish().err().map(Err),
            Err(e) => {
                let _ = self.finish();
                Some(Err(e))
            }
        }
    }
}

impl Drop for RowStream {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.root.uninitialize();
        }
        self.root.dispose();
    }
}
