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

//! LAST aggregate function

use crate::core::{Comparer, DataType, Result, Value};
use crate::functions::{AggregateFunction, FunctionInfo, FunctionSignature, FunctionType};

/// LAST aggregate function
///
/// Returns the value of the last row accumulated into the group.
#[derive(Default, Clone)]
pub struct LastFunction {
    data_type: DataType,
    last_value: Option<Value>,
}

impl AggregateFunction for LastFunction {
    fn name(&self) -> &str {
        "LAST"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "LAST",
            FunctionType::Aggregate,
            "Returns the last value in arrival order",
            FunctionSignature::new(1, 1),
        )
    }

    fn bind(&mut self, arg_type: DataType) -> Result<DataType> {
        self.data_type = arg_type;
        Ok(arg_type)
    }

    fn accumulate(&mut self, value: &Value, _comparer: &Comparer) -> Result<()> {
        self.last_value = Some(value.clone());
        Ok(())
    }

    fn result(&self) -> Value {
        self.last_value
            .clone()
            .unwrap_or_else(|| Value::empty(self.data_type))
    }

    fn reset(&mut self) {
        self.last_value = None;
    }

    fn clone_box(&self) -> Box<dyn AggregateFunction> {
        Box::new(LastFunction {
            data_type: self.data_type,
            last_value: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_keeps_arrival_order() {
        let comparer = Comparer::default();
        let mut last = LastFunction::default();
        last.bind(DataType::Text).unwrap();
        assert_eq!(last.result(), Value::text(""));
        for v in ["a", "c", "b"] {
            last.accumulate(&Value::text(v), &comparer).unwrap();
        }
        assert_eq!(last.result(), Value::text("b"));
    }
}
