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

//! SUM aggregate function

use crate::core::{Comparer, DataType, Error, Result, Value};
use crate::functions::{
    require_numeric, AggregateFunction, FunctionInfo, FunctionSignature, FunctionType,
};

/// Sum state - integer sums stay exact, float sums use IEEE addition
#[derive(Clone, Copy)]
enum SumState {
    Integer(i64),
    Float(f64),
}

/// SUM aggregate function
///
/// Requires a numeric operand. Returns INTEGER for integer inputs and
/// FLOAT for float inputs; the sum of an empty group is zero.
#[derive(Clone)]
pub struct SumFunction {
    state: SumState,
}

impl Default for SumFunction {
    fn default() -> Self {
        Self {
            state: SumState::Integer(0),
        }
    }
}

impl AggregateFunction for SumFunction {
    fn name(&self) -> &str {
        "SUM"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "SUM",
            FunctionType::Aggregate,
            "Returns the sum of the values in the group",
            FunctionSignature::new(1, 1),
        )
    }

    fn bind(&mut self, arg_type: DataType) -> Result<DataType> {
        require_numeric("SUM", arg_type)?;
        self.state = match arg_type {
            DataType::Float => SumState::Float(0.0),
            _ => SumState::Integer(0),
        };
        Ok(arg_type)
    }

    fn accumulate(&mut self, value: &Value, _comparer: &Comparer) -> Result<()> {
        match (&mut self.state, value) {
            (SumState::Integer(sum), Value::Integer(i)) => {
                *sum = sum.checked_add(*i).ok_or(Error::IntegerOverflow)?;
            }
            (SumState::Float(sum), Value::Float(f)) => *sum += f,
            (SumState::Float(sum), Value::Integer(i)) => *sum += *i as f64,
            (_, other) => {
                return Err(Error::type_mismatch(format!(
                    "SUM requires a numeric operand, got {}",
                    other.data_type()
                )))
            }
        }
        Ok(())
    }

    fn result(&self) -> Value {
        match self.state {
            SumState::Integer(sum) => Value::Integer(sum),
            SumState::Float(sum) => Value::Float(sum),
        }
    }

    fn reset(&mut self) {
        self.state = match self.state {
            SumState::Integer(_) => SumState::Integer(0),
            SumState::Float(_) => SumState::Float(0.0),
        };
    }

    fn clone_box(&self) -> Box<dyn AggregateFunction> {
        let mut fresh = self.clone();
        fresh.reset();
        Box::new(fresh)
    }
}
