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

//! FIRST aggregate function

use crate::core::{Comparer, DataType, Result, Value};
use crate::functions::{AggregateFunction, FunctionInfo, FunctionSignature, FunctionType};

/// FIRST aggregate function
///
/// Returns the value of the first row accumulated into the group.
#[derive(Default, Clone)]
pub struct FirstFunction {
    data_type: DataType,
    first_value: Option<Value>,
}

impl AggregateFunction for FirstFunction {
    fn name(&self) -> &str {
        "FIRST"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "FIRST",
            FunctionType::Aggregate,
            "Returns the first value in arrival order",
            FunctionSignature::new(1, 1),
        )
    }

    fn bind(&mut self, arg_type: DataType) -> Result<DataType> {
        self.data_type = arg_type;
        Ok(arg_type)
    }

    fn accumulate(&mut self, value: &Value, _comparer: &Comparer) -> Result<()> {
        if self.first_value.is_none() {
            self.first_value = Some(value.clone());
        }
        Ok(())
    }

    fn result(&self) -> Value {
        self.first_value
            .clone()
            .unwrap_or_else(|| Value::empty(self.data_type))
    }

    fn reset(&mut self) {
        self.first_value = None;
    }

    fn clone_box(&self) -> Box<dyn AggregateFunction> {
        Box::new(FirstFunction {
            data_type: self.data_type,
            first_value: None,
        })
    }
}
