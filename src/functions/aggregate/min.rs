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

//! MIN aggregate function

use std::cmp::Ordering;

use crate::core::{Comparer, DataType, Result, Value};
use crate::functions::{AggregateFunction, FunctionInfo, FunctionSignature, FunctionType};

/// MIN aggregate function
///
/// Returns the minimum value of the group under the query's comparer.
/// Works with any comparable type (numbers, strings, timestamps, etc.)
#[derive(Default, Clone)]
pub struct MinFunction {
    data_type: DataType,
    min_value: Option<Value>,
}

impl AggregateFunction for MinFunction {
    fn name(&self) -> &str {
        "MIN"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "MIN",
            FunctionType::Aggregate,
            "Returns the minimum value in the group",
            FunctionSignature::new(1, 1),
        )
    }

    fn bind(&mut self, arg_type: DataType) -> Result<DataType> {
        self.data_type = arg_type;
        Ok(arg_type)
    }

    fn accumulate(&mut self, value: &Value, comparer: &Comparer) -> Result<()> {
        let replace = match &self.min_value {
            Some(current) => comparer.compare(value, current)? == Ordering::Less,
            None => true,
        };
        if replace {
            self.min_value = Some(value.clone());
        }
        Ok(())
    }

    fn result(&self) -> Value {
        self.min_value
            .clone()
            .unwrap_or_else(|| Value::empty(self.data_type))
    }

    fn reset(&mut self) {
        self.min_value = None;
    }

    fn clone_box(&self) -> Box<dyn AggregateFunction> {
        Box::new(MinFunction {
            data_type: self.data_type,
            min_value: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_integers() {
        let comparer = Comparer::default();
        let mut min = MinFunction::default();
        min.bind(DataType::Integer).unwrap();
        for v in [5, 3, 8, 1, 9] {
            min.accumulate(&Value::Integer(v), &comparer).unwrap();
        }
        assert_eq!(min.result(), Value::Integer(1));
    }

    #[test]
    fn test_min_text_uses_comparer() {
        let comparer = Comparer::default();
        let mut min = MinFunction::default();
        min.bind(DataType::Text).unwrap();
        min.accumulate(&Value::text("banana"), &comparer).unwrap();
        min.accumulate(&Value::text("Apple"), &comparer).unwrap();
        assert_eq!(min.result(), Value::text("Apple"));

        let mut ordinal = MinFunction::default();
        ordinal.bind(DataType::Text).unwrap();
        ordinal
            .accumulate(&Value::text("apple"), &Comparer::ordinal())
            .unwrap();
        ordinal
            .accumulate(&Value::text("Banana"), &Comparer::ordinal())
            .unwrap();
        assert_eq!(ordinal.result(), Value::text("Banana"));
    }

    #[test]
    fn test_min_empty_is_typed_default() {
        let mut min = MinFunction::default();
        min.bind(DataType::Float).unwrap();
        assert_eq!(min.result(), Value::Float(0.0));
    }
}
