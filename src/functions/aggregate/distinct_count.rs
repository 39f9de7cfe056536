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

//! DISTINCTCOUNT aggregate function

use crate::common::KeyTable;
use crate::core::{Comparer, DataType, Result, Value};
use crate::functions::{AggregateFunction, FunctionInfo, FunctionSignature, FunctionType};

/// DISTINCTCOUNT aggregate function
///
/// Counts the values of the group that are distinct under the query's
/// comparer, so case-insensitive queries count `"a"` and `"A"` once.
#[derive(Default)]
pub struct DistinctCountFunction {
    seen: KeyTable,
}

impl AggregateFunction for DistinctCountFunction {
    fn name(&self) -> &str {
        "DISTINCTCOUNT"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "DISTINCTCOUNT",
            FunctionType::Aggregate,
            "Returns the number of distinct values in the group",
            FunctionSignature::new(1, 1),
        )
    }

    fn bind(&mut self, _arg_type: DataType) -> Result<DataType> {
        Ok(DataType::Integer)
    }

    fn accumulate(&mut self, value: &Value, comparer: &Comparer) -> Result<()> {
        self.seen.insert(vec![value.clone()], comparer)?;
        Ok(())
    }

    fn result(&self) -> Value {
        Value::Integer(self.seen.len() as i64)
    }

    fn reset(&mut self) {
        self.seen.clear();
    }

    fn clone_box(&self) -> Box<dyn AggregateFunction> {
        Box::new(DistinctCountFunction::default())
    }
}
