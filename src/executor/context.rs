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

//! Execution Context
//!
//! This module provides the per-query execution context handed to every
//! provider at `initialize`, and the per-row context expressions are
//! evaluated against.
//!
//! The context is cheap to clone: every field is shared through an `Arc`,
//! so correlated subqueries can derive a child context for each outer row.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use super::config::{QueryConfig, WarningPolicy};
use super::state::StateBin;
use crate::core::{Comparer, DataType, Error, Result, Row, Value};

/// Cooperative cancellation flag shared between a query and its caller
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Clear a previous cancellation request
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Relaxed);
    }

    /// Check if cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Fail with [`Error::Interrupted`] once cancelled
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Interrupted)
        } else {
            Ok(())
        }
    }
}

/// A recoverable per-source or per-line failure recorded under
/// [`WarningPolicy::Continue`]
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    /// Source identifier (file name, `<memory>`, ...)
    pub source: String,
    /// Line number within the source, 0 when the whole source failed
    pub line_no: i64,
    pub message: String,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line_no > 0 {
            write!(f, "{}:{}: {}", self.source, self.line_no, self.message)
        } else {
            write!(f, "{}: {}", self.source, self.message)
        }
    }
}

#[derive(Debug, Clone)]
struct Variable {
    data_type: DataType,
    value: Value,
}

/// Declared, typed variables
///
/// Names are case-insensitive. Assigning converts to the declared type.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: FxHashMap<String, Variable>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or redeclare) a variable, starting at `initial` or the
    /// empty value of its type
    pub fn declare(
        &mut self,
        name: &str,
        data_type: DataType,
        initial: Option<Value>,
    ) -> Result<()> {
        let value = match initial {
            Some(v) => v.convert_to(data_type, None)?,
            None => Value::empty(data_type),
        };
        self.values
            .insert(name.to_lowercase(), Variable { data_type, value });
        Ok(())
    }

    /// Assign a declared variable
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        let variable = self
            .values
            .get_mut(&name.to_lowercase())
            .ok_or_else(|| Error::VariableNotFound(name.to_string()))?;
        variable.value = value.convert_to(variable.data_type, None)?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(&name.to_lowercase()).map(|v| &v.value)
    }

    /// The declared type of a variable
    pub fn data_type(&self, name: &str) -> Option<DataType> {
        self.values.get(&name.to_lowercase()).map(|v| v.data_type)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Named values bound by a parameterized view, layered over the caller's
#[derive(Debug)]
struct Bindings {
    values: FxHashMap<String, Value>,
    parent: Option<Arc<Bindings>>,
}

/// The enclosing row of a correlated subquery
#[derive(Debug)]
struct OuterFrame {
    row: Row,
    parent: Option<Arc<OuterFrame>>,
}

/// Execution context for one query
///
/// Carries the shared comparer and configuration, variables, cancellation
/// and warnings. Subqueries and views run in child contexts that add an
/// outer row or parameter bindings on top of their parent.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    comparer: Arc<Comparer>,
    config: Arc<QueryConfig>,
    variables: Arc<RwLock<Variables>>,
    bindings: Option<Arc<Bindings>>,
    outer: Option<Arc<OuterFrame>>,
    cancellation: CancellationToken,
    warnings: Arc<Mutex<Vec<Warning>>>,
    working_directory: Arc<str>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(QueryConfig::default())
    }
}

impl ExecutionContext {
    /// Create a context with fresh variables and cancellation
    pub fn new(config: QueryConfig) -> Self {
        Self::with_environment(
            config,
            Arc::new(RwLock::new(Variables::new())),
            CancellationToken::new(),
        )
    }

    /// Create a context over caller-owned variables and cancellation
    pub fn with_environment(
        config: QueryConfig,
        variables: Arc<RwLock<Variables>>,
        cancellation: CancellationToken,
    ) -> Self {
        let working_directory = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        Self {
            comparer: Arc::new(config.comparer()),
            config: Arc::new(config),
            variables,
            bindings: None,
            outer: None,
            cancellation,
            warnings: Arc::new(Mutex::new(Vec::new())),
            working_directory: Arc::from(working_directory),
        }
    }

    /// Replace the comparer with one shared with the planner
    pub fn with_comparer(mut self, comparer: Arc<Comparer>) -> Self {
        self.comparer = comparer;
        self
    }

    /// The single comparer of this query
    #[inline]
    pub fn comparer(&self) -> &Comparer {
        &self.comparer
    }

    #[inline]
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Fail with [`Error::Interrupted`] once cancelled
    #[inline]
    pub fn check_cancelled(&self) -> Result<()> {
        self.cancellation.check()
    }

    pub fn working_directory(&self) -> &str {
        &self.working_directory
    }

    pub fn variables(&self) -> &Arc<RwLock<Variables>> {
        &self.variables
    }

    /// Look up a named value: view parameters innermost first, then
    /// declared variables
    pub fn variable(&self, name: &str) -> Result<Value> {
        let key = name.to_lowercase();
        let mut bindings = self.bindings.as_deref();
        while let Some(scope) = bindings {
            if let Some(value) = scope.values.get(&key) {
                return Ok(value.clone());
            }
            bindings = scope.parent.as_deref();
        }
        self.variables
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::UnresolvedVariable(name.to_string()))
    }

    /// A child context whose variable lookups see `values` first
    pub fn with_bindings(&self, values: FxHashMap<String, Value>) -> Self {
        let values = values
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        Self {
            bindings: Some(Arc::new(Bindings {
                values,
                parent: self.bindings.clone(),
            })),
            ..self.clone()
        }
    }

    /// A child context for a correlated subquery of the current row
    pub fn with_outer_row(&self, row: &Row) -> Self {
        Self {
            outer: Some(Arc::new(OuterFrame {
                row: row.clone(),
                parent: self.outer.clone(),
            })),
            ..self.clone()
        }
    }

    /// The enclosing row `depth` levels out (0 is the immediate parent)
    pub fn outer_row(&self, depth: usize) -> Option<&Row> {
        let mut frame = self.outer.as_deref()?;
        for _ in 0..depth {
            frame = frame.parent.as_deref()?;
        }
        Some(&frame.row)
    }

    /// Handle a recoverable source failure.
    ///
    /// Under [`WarningPolicy::Continue`] the failure is recorded and
    /// `Ok(())` tells the caller to skip ahead; once the warning budget is
    /// spent, or under [`WarningPolicy::Fail`], the error is returned.
    pub fn handle_failure(&self, error: Error, source: &str, line_no: i64) -> Result<()> {
        if self.config.warning_policy == WarningPolicy::Fail || error.is_fatal() {
            return Err(error);
        }
        let mut warnings = self.warnings.lock();
        if warnings.len() >= self.config.max_warnings {
            return Err(error);
        }
        let warning = Warning {
            source: source.to_string(),
            line_no,
            message: error.to_string(),
        };
        log::warn!("{}", warning);
        warnings.push(warning);
        Ok(())
    }

    /// Warnings recorded so far
    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings.lock().clone()
    }

    pub fn take_warnings(&self) -> Vec<Warning> {
        std::mem::take(&mut *self.warnings.lock())
    }
}

/// Everything an expression can see while evaluating one row
#[derive(Clone, Copy)]
pub struct RowContext<'a> {
    pub exec: &'a ExecutionContext,
    pub row: &'a Row,
    /// Accumulator store of the current group or stream
    pub state: Option<&'a StateBin>,
    /// Key values of the group being emitted
    pub group_key: Option<&'a [Value]>,
}

impl<'a> RowContext<'a> {
    pub fn new(exec: &'a ExecutionContext, row: &'a Row) -> Self {
        Self {
            exec,
            row,
            state: None,
            group_key: None,
        }
    }

    /// The same row, reading accumulators from `state`
    pub fn with_state(self, state: &'a StateBin) -> Self {
        Self {
            state: Some(state),
            ..self
        }
    }

    pub fn with_group_key(self, key: &'a [Value]) -> Self {
        Self {
            group_key: Some(key),
            ..self
        }
    }

    #[inline]
    pub fn comparer(&self) -> &'a Comparer {
        self.exec.comparer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_token() {
        let token = CancellationToken::new();
        assert!(token.check().is_ok());
        let handle = token.clone();
        handle.cancel();
        assert!(matches!(token.check(), Err(Error::Interrupted)));
        token.reset();
        assert!(!handle.is_cancelled());
    }

    #[test]
    fn test_variables_convert_to_declared_type() {
        let mut vars = Variables::new();
        vars.declare("limit", DataType::Integer, Some(Value::text("10")))
            .unwrap();
        assert_eq!(vars.get("LIMIT"), Some(&Value::integer(10)));
        vars.set("Limit", Value::float(3.9)).unwrap();
        assert_eq!(vars.get("limit"), Some(&Value::integer(3)));
        assert!(vars.set("limit", Value::text("abc")).is_err());
        assert!(matches!(
            vars.set("missing", Value::integer(1)),
            Err(Error::VariableNotFound(_))
        ));
    }

    #[test]
    fn test_bindings_shadow_variables() {
        let ctx = ExecutionContext::default();
        ctx.variables()
            .write()
            .declare("host", DataType::Text, Some(Value::text("global")))
            .unwrap();
        assert_eq!(ctx.variable("host").unwrap(), Value::text("global"));

        let mut params = FxHashMap::default();
        params.insert("HOST".to_string(), Value::text("view"));
        let child = ctx.with_bindings(params);
        assert_eq!(child.variable("host").unwrap(), Value::text("view"));
        assert_eq!(ctx.variable("host").unwrap(), Value::text("global"));
        assert!(matches!(
            child.variable("nope"),
            Err(Error::UnresolvedVariable(_))
        ));
    }

    #[test]
    fn test_outer_rows_nest() {
        let ctx = ExecutionContext::default();
        let first = Row::from_values(vec![Value::integer(1)]);
        let second = Row::from_values(vec![Value::integer(2)]);
        let inner = ctx.with_outer_row(&first).with_outer_row(&second);
        assert_eq!(inner.outer_row(0).unwrap()[0], Value::integer(2));
        assert_eq!(inner.outer_row(1).unwrap()[0], Value::integer(1));
        assert!(inner.outer_row(2).is_none());
        assert!(ctx.outer_row(0).is_none());
    }

    #[test]
    fn test_warning_policy() {
        let failing = ExecutionContext::default();
        assert!(failing
            .handle_failure(Error::io("a.log", "denied"), "a.log", 0)
            .is_err());

        let config = QueryConfig::default()
            .with_warning_policy(WarningPolicy::Continue)
            .with_max_warnings(1);
        let ctx = ExecutionContext::new(config);
        assert!(ctx
            .handle_failure(Error::io("a.log", "denied"), "a.log", 0)
            .is_ok());
        assert_eq!(ctx.warnings().len(), 1);
        assert!(ctx
            .handle_failure(Error::io("b.log", "denied"), "b.log", 0)
            .is_err());
        assert!(ctx
            .handle_failure(Error::Interrupted, "c.log", 3)
            .is_err());
    }

    #[test]
    fn test_shared_comparer_survives_bindings() {
        let comparer = Arc::new(QueryConfig::default().with_case_insensitive(true).comparer());
        let ctx = ExecutionContext::default().with_comparer(Arc::clone(&comparer));
        assert!(std::ptr::eq(ctx.comparer(), &*comparer));
        let bound = ctx.with_bindings(FxHashMap::default());
        assert!(std::ptr::eq(bound.comparer(), &*comparer));
        assert!(bound.comparer().equals(&Value::text("GET"), &Value::text("get")).unwrap());
    }
}
