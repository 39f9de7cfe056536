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

//! MAX aggregate function

use std::cmp::Ordering;

use crate::core::{Comparer, DataType, Result, Value};
use crate::functions::{AggregateFunction, FunctionInfo, FunctionSignature, FunctionType};

/// MAX aggregate function
///
/// Returns the maximum value of the group under the query's comparer.
/// Works with any comparable type (numbers, strings, timestamps, etc.)
#[derive(Default, Clone)]
pub struct MaxFunction {
    data_type: DataType,
    max_value: Option<Value>,
}

impl AggregateFunction for MaxFunction {
    fn name(&self) -> &str {
        "MAX"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "MAX",
            FunctionType::Aggregate,
            "Returns the maximum value in the group",
            FunctionSignature::new(1, 1),
        )
    }

    fn bind(&mut self, arg_type: DataType) -> Result<DataType> {
        self.data_type = arg_type;
        Ok(arg_type)
    }

    fn accumulate(&mut self, value: &Value, comparer: &Comparer) -> Result<()> {
        let replace = match &self.max_value {
            Some(current) => comparer.compare(value, current)? == Ordering::Greater,
            None => true,
        };
        if replace {
            self.max_value = Some(value.clone());
        }
        Ok(())
    }

    fn result(&self) -> Value {
        self.max_value
            .clone()
            .unwrap_or_else(|| Value::empty(self.data_type))
    }

    fn reset(&mut self) {
        self.max_value = None;
    }

    fn clone_box(&self) -> Box<dyn AggregateFunction> {
        Box::new(MaxFunction {
            data_type: self.data_type,
            max_value: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_integers() {
        let comparer = Comparer::default();
        let mut max = MaxFunction::default();
        max.bind(DataType::Integer).unwrap();
        for v in [5, 3, 8, 1, 9] {
            max.accumulate(&Value::Integer(v), &comparer).unwrap();
        }
        assert_eq!(max.result(), Value::Integer(9));
    }

    #[test]
    fn test_max_keeps_first_of_equal_values() {
        let comparer = Comparer::ignore_case();
        let mut max = MaxFunction::default();
        max.bind(DataType::Text).unwrap();
        max.accumulate(&Value::text("ERROR"), &comparer).unwrap();
        max.accumulate(&Value::text("error"), &comparer).unwrap();
        assert_eq!(max.result(), Value::text("ERROR"));
    }
}
