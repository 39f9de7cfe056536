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

//! Function Registry
//!
//! This module provides the function registry for looking up query functions
//! (aggregate, scalar and stateful) by case-insensitive name.

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Global function registry instance
static GLOBAL_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// Get the global function registry
#[inline]
pub fn global_registry() -> &'static FunctionRegistry {
    GLOBAL_REGISTRY.get_or_init(FunctionRegistry::new)
}

use super::aggregate::{
    CountFunction, DistinctCountFunction, FirstFunction, LastFunction, MaxFunction, MinFunction,
    SumFunction,
};
use super::scalar::{
    AbsFunction, CeilingFunction, ConcatFunction, DatePartFunction, ExtractFunction,
    FloorFunction, IfEmptyFunction, IifFunction, IndexOfFunction, LenFunction, LowerFunction,
    MatchesFunction, NowFunction, ReplaceFunction, RoundFunction, StartsWithFunction,
    SubstrFunction, ToUnixFunction, TrimFunction, UpperFunction,
};
use super::{AggregateFunction, FunctionInfo, FunctionSignature, FunctionType, ScalarFunction};

/// Type alias for aggregate function factory
type AggregateFnFactory = Arc<dyn Fn() -> Box<dyn AggregateFunction> + Send + Sync>;
/// Type alias for scalar function factory
type ScalarFnFactory = Arc<dyn Fn() -> Box<dyn ScalarFunction> + Send + Sync>;

/// How the planner has to compile a call to a named function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Pure per-row function
    Scalar,
    /// Per-group accumulator
    Aggregate,
    /// AVG, compiled as SUM / COUNT
    Average,
    /// Per-stream function (LAG)
    Stateful,
}

/// Function registry for query functions
pub struct FunctionRegistry {
    /// Aggregate functions
    aggregate_functions: RwLock<FxHashMap<String, AggregateFnFactory>>,
    /// Scalar functions
    scalar_functions: RwLock<FxHashMap<String, ScalarFnFactory>>,
    /// Function info cache
    function_info: RwLock<FxHashMap<String, FunctionInfo>>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// Create a new function registry with all built-in functions registered
    pub fn new() -> Self {
        let registry = Self {
            aggregate_functions: RwLock::new(FxHashMap::default()),
            scalar_functions: RwLock::new(FxHashMap::default()),
            function_info: RwLock::new(FxHashMap::default()),
        };

        // Aggregates
        registry.register_aggregate::<CountFunction>();
        registry.register_aggregate::<SumFunction>();
        registry.register_aggregate::<MinFunction>();
        registry.register_aggregate::<MaxFunction>();
        registry.register_aggregate::<FirstFunction>();
        registry.register_aggregate::<LastFunction>();
        registry.register_aggregate::<DistinctCountFunction>();

        // String functions
        registry.register_scalar::<UpperFunction>();
        registry.register_scalar::<LowerFunction>();
        registry.register_scalar::<LenFunction>();
        registry.register_scalar::<TrimFunction>();
        registry.register_scalar::<SubstrFunction>();
        registry.register_scalar::<ReplaceFunction>();
        registry.register_scalar::<ConcatFunction>();
        registry.register_scalar::<StartsWithFunction>();
        registry.register_scalar::<IndexOfFunction>();

        // Math functions
        registry.register_scalar::<AbsFunction>();
        registry.register_scalar::<RoundFunction>();
        registry.register_scalar::<FloorFunction>();
        registry.register_scalar::<CeilingFunction>();

        // Date/time functions
        registry.register_scalar::<NowFunction>();
        registry.register_scalar::<DatePartFunction>();
        registry.register_scalar::<ToUnixFunction>();

        // Regex functions
        registry.register_scalar::<ExtractFunction>();
        registry.register_scalar::<MatchesFunction>();

        // Utility functions
        registry.register_scalar::<IifFunction>();
        registry.register_scalar::<IfEmptyFunction>();

        // Compiled specially by the planner
        registry.register_info(FunctionInfo::new(
            "AVG",
            FunctionType::Aggregate,
            "Average of a numeric column, as FLOAT",
            FunctionSignature::new(1, 1),
        ));
        registry.register_info(FunctionInfo::new(
            "LAG",
            FunctionType::Stateful,
            "Value of the expression a number of rows earlier",
            FunctionSignature::new(1, 3),
        ));

        registry
    }

    /// Register an aggregate function
    pub fn register_aggregate<F: AggregateFunction + Default + 'static>(&self) {
        let instance = F::default();
        let name = instance.name().to_uppercase();
        let info = instance.info();

        self.aggregate_functions
            .write()
            .insert(name.clone(), Arc::new(|| Box::new(F::default())));
        self.function_info.write().insert(name, info);
    }

    /// Register a scalar function
    pub fn register_scalar<F: ScalarFunction + Default + 'static>(&self) {
        let instance = F::default();
        let name = instance.name().to_uppercase();
        let info = instance.info();

        self.scalar_functions
            .write()
            .insert(name.clone(), Arc::new(|| Box::new(F::default())));
        self.function_info.write().insert(name, info);
    }

    fn register_info(&self, info: FunctionInfo) {
        self.function_info
            .write()
            .insert(info.name.to_uppercase(), info);
    }

    /// Classify a function name, or `None` if it is unknown
    pub fn kind(&self, name: &str) -> Option<FunctionKind> {
        let upper = name.to_uppercase();
        match upper.as_str() {
            "AVG" => return Some(FunctionKind::Average),
            "LAG" => return Some(FunctionKind::Stateful),
            _ => {}
        }
        if self.aggregate_functions.read().contains_key(&upper) {
            Some(FunctionKind::Aggregate)
        } else if self.scalar_functions.read().contains_key(&upper) {
            Some(FunctionKind::Scalar)
        } else {
            None
        }
    }

    /// Get a new instance of an aggregate function by name
    pub fn get_aggregate(&self, name: &str) -> Option<Box<dyn AggregateFunction>> {
        let funcs = self.aggregate_functions.read();
        if let Some(f) = funcs.get(name) {
            return Some(f());
        }
        funcs.get(&name.to_uppercase()).map(|f| f())
    }

    /// Get a new instance of a scalar function by name
    pub fn get_scalar(&self, name: &str) -> Option<Box<dyn ScalarFunction>> {
        let funcs = self.scalar_functions.read();
        if let Some(f) = funcs.get(name) {
            return Some(f());
        }
        funcs.get(&name.to_uppercase()).map(|f| f())
    }

    /// Check if a function name is an aggregate function (AVG included)
    pub fn is_aggregate(&self, name: &str) -> bool {
        matches!(
            self.kind(name),
            Some(FunctionKind::Aggregate | FunctionKind::Average)
        )
    }

    /// Check if a function with this name exists
    pub fn exists(&self, name: &str) -> bool {
        self.kind(name).is_some()
    }

    /// Get function info by name
    pub fn get_info(&self, name: &str) -> Option<FunctionInfo> {
        self.function_info.read().get(&name.to_uppercase()).cloned()
    }

    /// List all function names, sorted
    pub fn list_all(&self) -> Vec<String> {
        let mut names: Vec<String> = self.function_info.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_kinds() {
        let registry = FunctionRegistry::new();
        assert_eq!(registry.kind("COUNT"), Some(FunctionKind::Aggregate));
        assert_eq!(registry.kind("DistinctCount"), Some(FunctionKind::Aggregate));
        assert_eq!(registry.kind("avg"), Some(FunctionKind::Average));
        assert_eq!(registry.kind("lag"), Some(FunctionKind::Stateful));
        assert_eq!(registry.kind("upper"), Some(FunctionKind::Scalar));
        assert_eq!(registry.kind("NONEXISTENT"), None);
    }

    #[test]
    fn test_registry_case_insensitive() {
        let registry = FunctionRegistry::new();
        assert!(registry.is_aggregate("count"));
        assert!(registry.is_aggregate("COUNT"));
        assert!(registry.is_aggregate("Avg"));
        assert!(!registry.is_aggregate("UPPER"));
    }

    #[test]
    fn test_get_instances() {
        let registry = FunctionRegistry::new();
        assert_eq!(registry.get_aggregate("sum").unwrap().name(), "SUM");
        assert_eq!(registry.get_scalar("Extract").unwrap().name(), "EXTRACT");
        assert!(registry.get_scalar("COUNT").is_none());
    }

    #[test]
    fn test_function_info() {
        let registry = FunctionRegistry::new();
        let info = registry.get_info("lag").unwrap();
        assert_eq!(info.function_type, FunctionType::Stateful);
        assert!(registry.list_all().contains(&"MATCHES".to_string()));
    }

    #[test]
    fn test_global_registry() {
        assert!(global_registry().exists("IIF"));
    }
}
