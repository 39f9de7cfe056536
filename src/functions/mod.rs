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

//! Function System
//!
//! This module provides the functions callable from query expressions:
//!
//! - [`AggregateFunction`] - Per-group accumulators (COUNT, SUM, MIN, MAX, ...)
//! - [`ScalarFunction`] - Pure per-row functions (UPPER, ROUND, EXTRACT, ...)
//! - [`StatefulFunction`] - Per-stream accumulators (LAG)
//! - [`FunctionRegistry`] - Registry for function lookup by name
//!
//! Functions are looked up and bound once while a query is compiled. A
//! bound aggregate or stateful function acts as a prototype: every group
//! (or stream) gets a fresh copy through `clone_box`.

pub mod aggregate;
pub mod registry;
pub mod scalar;
pub mod window;

use crate::core::{Comparer, DataType, Error, Result, Value};
use crate::executor::QueryConfig;

/// Function type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionType {
    /// Aggregate function (folds many rows of a group)
    Aggregate,
    /// Scalar function (operates on a single row)
    Scalar,
    /// Stateful function (steps once per row of the whole stream)
    Stateful,
}

/// Function signature information
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    /// Minimum number of arguments
    pub min_args: usize,
    /// Maximum number of arguments
    pub max_args: usize,
}

impl FunctionSignature {
    /// Create a new function signature
    pub fn new(min_args: usize, max_args: usize) -> Self {
        Self { min_args, max_args }
    }

    /// Create a variadic function signature
    pub fn variadic(min_args: usize) -> Self {
        Self {
            min_args,
            max_args: usize::MAX,
        }
    }

    /// Validate argument count
    pub fn validate_arg_count(&self, name: &str, count: usize) -> Result<()> {
        if count < self.min_args {
            return Err(Error::invalid_argument(format!(
                "{} expects at least {} arguments, got {}",
                name, self.min_args, count
            )));
        }
        if count > self.max_args {
            return Err(Error::invalid_argument(format!(
                "{} expects at most {} arguments, got {}",
                name, self.max_args, count
            )));
        }
        Ok(())
    }
}

/// Function information
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    /// Function name
    pub name: String,
    /// Function type
    pub function_type: FunctionType,
    /// Description
    pub description: String,
    /// Signature
    pub signature: FunctionSignature,
}

impl FunctionInfo {
    /// Create a new function info
    pub fn new(
        name: impl Into<String>,
        function_type: FunctionType,
        description: impl Into<String>,
        signature: FunctionSignature,
    ) -> Self {
        Self {
            name: name.into(),
            function_type,
            description: description.into(),
            signature,
        }
    }
}

/// What the binder knows about one argument of a function call
#[derive(Debug, Clone)]
pub struct ArgInfo {
    /// Result type of the argument expression
    pub data_type: DataType,
    /// The argument's value when it is a literal
    pub constant: Option<Value>,
}

impl ArgInfo {
    pub fn new(data_type: DataType, constant: Option<Value>) -> Self {
        Self {
            data_type,
            constant,
        }
    }
}

/// Trait for aggregate functions
///
/// `bind` is called once on the prototype with the argument type and
/// returns the result type. `clone_box` returns a fresh accumulator with
/// the same bound types and empty state.
pub trait AggregateFunction: Send + Sync {
    /// Get the function name
    fn name(&self) -> &str;

    /// Get function information
    fn info(&self) -> FunctionInfo;

    /// Validate the argument type and return the result type
    fn bind(&mut self, arg_type: DataType) -> Result<DataType>;

    /// Fold one value into the running state
    fn accumulate(&mut self, value: &Value, comparer: &Comparer) -> Result<()>;

    /// Project the running state to an output value
    fn result(&self) -> Value;

    /// Reset to the empty state
    fn reset(&mut self);

    /// A fresh accumulator with the same bound types
    fn clone_box(&self) -> Box<dyn AggregateFunction>;
}

/// Trait for scalar functions
pub trait ScalarFunction: Send + Sync {
    /// Get the function name
    fn name(&self) -> &str;

    /// Get function information
    fn info(&self) -> FunctionInfo;

    /// Validate argument types and return the result type.
    ///
    /// Called once at bind time. Literal arguments are visible through
    /// [`ArgInfo::constant`], so functions may precompute from them.
    fn bind(&mut self, args: &[ArgInfo], config: &QueryConfig) -> Result<DataType>;

    /// Evaluate the function with the given arguments
    fn evaluate(&self, args: &[Value]) -> Result<Value>;
}

/// Trait for stateful (per-stream) functions
pub trait StatefulFunction: Send + Sync {
    /// Get the function name
    fn name(&self) -> &str;

    /// Advance by one input value
    fn step(&mut self, value: Value);

    /// The current output value
    fn current(&self) -> Value;

    /// Reset to the empty state
    fn reset(&mut self);

    /// A fresh instance with the same configuration
    fn clone_box(&self) -> Box<dyn StatefulFunction>;
}

/// Fail unless `data_type` is numeric
pub(crate) fn require_numeric(function: &str, data_type: DataType) -> Result<()> {
    if data_type.is_numeric() {
        Ok(())
    } else {
        Err(Error::type_mismatch(format!(
            "{} requires a numeric operand, got {}",
            function, data_type
        )))
    }
}

/// Fail unless `actual` equals `expected`
pub(crate) fn require_type(function: &str, actual: DataType, expected: DataType) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(Error::type_mismatch(format!(
            "{} expects {}, got {}",
            function, expected, actual
        )))
    }
}

// Re-export main types
pub use aggregate::{
    CountFunction, DistinctCountFunction, FirstFunction, LastFunction, MaxFunction, MinFunction,
    SumFunction,
};
pub use registry::{global_registry, FunctionKind, FunctionRegistry};
pub use window::LagFunction;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_validation() {
        let sig = FunctionSignature::new(1, 2);
        assert!(sig.validate_arg_count("F", 1).is_ok());
        assert!(sig.validate_arg_count("F", 2).is_ok());
        assert!(sig.validate_arg_count("F", 0).is_err());
        assert!(sig.validate_arg_count("F", 3).is_err());

        let sig = FunctionSignature::variadic(1);
        assert!(sig.validate_arg_count("F", 10).is_ok());
    }

    #[test]
    fn test_require_numeric() {
        assert!(require_numeric("SUM", DataType::Integer).is_ok());
        assert!(require_numeric("SUM", DataType::Float).is_ok());
        let err = require_numeric("SUM", DataType::Text).unwrap_err();
        assert!(err.is_conversion_error());
    }
}
