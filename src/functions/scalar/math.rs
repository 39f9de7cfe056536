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

//! Math scalar functions

use crate::core::{DataType, Error, Result, Value};
use crate::executor::QueryConfig;
use crate::functions::{
    require_numeric, ArgInfo, FunctionInfo, FunctionSignature, FunctionType, ScalarFunction,
};
use crate::validate_arg_count;

use super::{expect_arg, value_to_i64};

/// Result type of a one-argument numeric function: same as the operand
fn bind_numeric(name: &str, args: &[ArgInfo]) -> Result<DataType> {
    let data_type = args
        .first()
        .map(|a| a.data_type)
        .ok_or_else(|| Error::invalid_argument(format!("{} requires an argument", name)))?;
    require_numeric(name, data_type)?;
    Ok(data_type)
}

// ============================================================================
// ABS
// ============================================================================

/// ABS function - returns the absolute value of a number
#[derive(Default)]
pub struct AbsFunction;

impl ScalarFunction for AbsFunction {
    fn name(&self) -> &str {
        "ABS"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "ABS",
            FunctionType::Scalar,
            "Returns the absolute value of a number",
            FunctionSignature::new(1, 1),
        )
    }

    fn bind(&mut self, args: &[ArgInfo], _config: &QueryConfig) -> Result<DataType> {
        bind_numeric("ABS", args)
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "ABS", 1);
        match &args[0] {
            Value::Integer(i) => i
                .checked_abs()
                .map(Value::Integer)
                .ok_or(Error::IntegerOverflow),
            Value::Float(f) => Ok(Value::Float(f.abs())),
            other => Err(Error::type_mismatch(format!(
                "ABS requires a numeric operand, got {}",
                other.data_type()
            ))),
        }
    }
}

// ============================================================================
// ROUND
// ============================================================================

/// ROUND function - rounds a number to a number of decimal places
#[derive(Default)]
pub struct RoundFunction;

impl ScalarFunction for RoundFunction {
    fn name(&self) -> &str {
        "ROUND"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "ROUND",
            FunctionType::Scalar,
            "Rounds a number to a specified number of decimal places",
            FunctionSignature::new(1, 2),
        )
    }

    fn bind(&mut self, args: &[ArgInfo], _config: &QueryConfig) -> Result<DataType> {
        if args.len() == 2 {
            expect_arg("ROUND", args, 1, DataType::Integer)?;
        }
        bind_numeric("ROUND", args)
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "ROUND", 1, 2);
        let num = match &args[0] {
            Value::Integer(i) => return Ok(Value::Integer(*i)),
            Value::Float(f) => *f,
            other => {
                return Err(Error::type_mismatch(format!(
                    "ROUND requires a numeric operand, got {}",
                    other.data_type()
                )))
            }
        };

        // Default to 0 decimal places if not specified
        let places = match args.get(1) {
            Some(v) => value_to_i64("ROUND", v)?.clamp(-15, 15) as i32,
            None => 0,
        };

        let shift = 10_f64.powi(places);
        Ok(Value::Float((num * shift).round() / shift))
    }
}

// ============================================================================
// FLOOR
// ============================================================================

/// FLOOR function - returns the largest integral value not greater than the argument
#[derive(Default)]
pub struct FloorFunction;

impl ScalarFunction for FloorFunction {
    fn name(&self) -> &str {
        "FLOOR"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "FLOOR",
            FunctionType::Scalar,
            "Returns the largest integral value not greater than the argument",
            FunctionSignature::new(1, 1),
        )
    }

    fn bind(&mut self, args: &[ArgInfo], _config: &QueryConfig) -> Result<DataType> {
        bind_numeric("FLOOR", args)
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "FLOOR", 1);
        match &args[0] {
            Value::Float(f) => Ok(Value::Float(f.floor())),
            other => Ok(other.clone()),
        }
    }
}

// ============================================================================
// CEILING
// ============================================================================

/// CEILING function - returns the smallest integral value not less than the argument
#[derive(Default)]
pub struct CeilingFunction;

impl ScalarFunction for CeilingFunction {
    fn name(&self) -> &str {
        "CEILING"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "CEILING",
            FunctionType::Scalar,
            "Returns the smallest integral value not less than the argument",
            FunctionSignature::new(1, 1),
        )
    }

    fn bind(&mut self, args: &[ArgInfo], _config: &QueryConfig) -> Result<DataType> {
        bind_numeric("CEILING", args)
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "CEILING", 1);
        match &args[0] {
            Value::Float(f) => Ok(Value::Float(f.ceil())),
            other => Ok(other.clone()),
        }
    }
}
