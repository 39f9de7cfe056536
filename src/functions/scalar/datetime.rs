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

//! Date/time scalar functions

use chrono::{Datelike, Timelike, Utc};

use crate::core::{DataType, Error, Result, Value};
use crate::executor::QueryConfig;
use crate::functions::{
    require_type, ArgInfo, FunctionInfo, FunctionSignature, FunctionType, ScalarFunction,
};
use crate::validate_arg_count;

use super::{expect_arg, value_to_string};

// ============================================================================
// NOW
// ============================================================================

/// NOW function - returns the current date and time
#[derive(Default)]
pub struct NowFunction;

impl ScalarFunction for NowFunction {
    fn name(&self) -> &str {
        "NOW"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "NOW",
            FunctionType::Scalar,
            "Returns the current date and time",
            FunctionSignature::new(0, 0),
        )
    }

    fn bind(&mut self, _args: &[ArgInfo], _config: &QueryConfig) -> Result<DataType> {
        Ok(DataType::Timestamp)
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "NOW", 0);
        Ok(Value::Timestamp(Utc::now()))
    }
}

// ============================================================================
// DATEPART
// ============================================================================

/// Date parts understood by DATEPART
const DATE_PARTS: &[&str] = &[
    "year",
    "month",
    "day",
    "hour",
    "minute",
    "second",
    "millisecond",
    "weekday",
    "dayofyear",
];

/// DATEPART function - extracts a numeric field from a timestamp
#[derive(Default)]
pub struct DatePartFunction;

impl ScalarFunction for DatePartFunction {
    fn name(&self) -> &str {
        "DATEPART"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "DATEPART",
            FunctionType::Scalar,
            "Extracts a field (year, month, day, hour, ...) from a timestamp",
            FunctionSignature::new(2, 2),
        )
    }

    fn bind(&mut self, args: &[ArgInfo], _config: &QueryConfig) -> Result<DataType> {
        expect_arg("DATEPART", args, 0, DataType::Text)?;
        expect_arg("DATEPART", args, 1, DataType::Timestamp)?;
        if let Some(part) = args[0].constant.as_ref().and_then(Value::as_str) {
            if !DATE_PARTS.contains(&part.to_lowercase().as_str()) {
                return Err(Error::invalid_argument(format!(
                    "DATEPART does not know the part '{}'",
                    part
                )));
            }
        }
        Ok(DataType::Integer)
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "DATEPART", 2);
        let part = value_to_string(&args[0]).to_lowercase();
        let ts = args[1]
            .as_timestamp()
            .ok_or_else(|| Error::type_mismatch("DATEPART expects a TIMESTAMP"))?;
        let value = match part.as_str() {
            "year" => i64::from(ts.year()),
            "month" => i64::from(ts.month()),
            "day" => i64::from(ts.day()),
            "hour" => i64::from(ts.hour()),
            "minute" => i64::from(ts.minute()),
            "second" => i64::from(ts.second()),
            "millisecond" => i64::from(ts.timestamp_subsec_millis()),
            "weekday" => i64::from(ts.weekday().num_days_from_sunday()),
            "dayofyear" => i64::from(ts.ordinal()),
            other => {
                return Err(Error::evaluation(format!(
                    "DATEPART does not know the part '{}'",
                    other
                )))
            }
        };
        Ok(Value::Integer(value))
    }
}

// ============================================================================
// TO_UNIX
// ============================================================================

/// TO_UNIX function - seconds since the Unix epoch
#[derive(Default)]
pub struct ToUnixFunction;

impl ScalarFunction for ToUnixFunction {
    fn name(&self) -> &str {
        "TO_UNIX"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "TO_UNIX",
            FunctionType::Scalar,
            "Returns the number of seconds since the Unix epoch",
            FunctionSignature::new(1, 1),
        )
    }

    fn bind(&mut self, args: &[ArgInfo], _config: &QueryConfig) -> Result<DataType> {
        if let Some(arg) = args.first() {
            require_type("TO_UNIX", arg.data_type, DataType::Timestamp)?;
        }
        Ok(DataType::Integer)
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "TO_UNIX", 1);
        args[0]
            .as_timestamp()
            .map(|t| Value::Integer(t.timestamp()))
            .ok_or_else(|| Error::type_mismatch("TO_UNIX expects a TIMESTAMP"))
    }
}
