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

//! Utility scalar functions

use crate::core::{DataType, Error, Result, Value};
use crate::executor::QueryConfig;
use crate::functions::{ArgInfo, FunctionInfo, FunctionSignature, FunctionType, ScalarFunction};
use crate::validate_arg_count;

use super::{expect_arg, value_to_string};

// ============================================================================
// IIF
// ============================================================================

/// IIF function - picks one of two values by a boolean condition
#[derive(Default)]
pub struct IifFunction {
    result_type: DataType,
}

impl ScalarFunction for IifFunction {
    fn name(&self) -> &str {
        "IIF"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "IIF",
            FunctionType::Scalar,
            "Returns the second argument when the condition holds, else the third",
            FunctionSignature::new(3, 3),
        )
    }

    fn bind(&mut self, args: &[ArgInfo], _config: &QueryConfig) -> Result<DataType> {
        expect_arg("IIF", args, 0, DataType::Boolean)?;
        let (then_type, else_type) = (args[1].data_type, args[2].data_type);
        self.result_type = then_type.widen(else_type).ok_or_else(|| {
            Error::type_mismatch(format!(
                "IIF branches have incompatible types {} and {}",
                then_type, else_type
            ))
        })?;
        Ok(self.result_type)
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "IIF", 3);
        let chosen = match args[0] {
            Value::Boolean(true) => &args[1],
            _ => &args[2],
        };
        chosen.convert_to(self.result_type, None)
    }
}

// ============================================================================
// IFEMPTY
// ============================================================================

/// IFEMPTY function - replaces an empty string by a fallback
#[derive(Default)]
pub struct IfEmptyFunction;

impl ScalarFunction for IfEmptyFunction {
    fn name(&self) -> &str {
        "IFEMPTY"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "IFEMPTY",
            FunctionType::Scalar,
            "Returns the fallback when the text is empty",
            FunctionSignature::new(2, 2),
        )
    }

    fn bind(&mut self, _args: &[ArgInfo], _config: &QueryConfig) -> Result<DataType> {
        Ok(DataType::Text)
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "IFEMPTY", 2);
        let text = value_to_string(&args[0]);
        if text.is_empty() {
            Ok(Value::text(value_to_string(&args[1]).as_ref()))
        } else {
            Ok(Value::text(text.as_ref()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iif_widens_branches() {
        let mut f = IifFunction::default();
        let args = [
            ArgInfo::new(DataType::Boolean, None),
            ArgInfo::new(DataType::Integer, None),
            ArgInfo::new(DataType::Float, None),
        ];
        assert_eq!(
            f.bind(&args, &QueryConfig::default()).unwrap(),
            DataType::Float
        );
        assert_eq!(
            f.evaluate(&[Value::Boolean(true), Value::Integer(1), Value::Float(0.5)])
                .unwrap(),
            Value::Float(1.0)
        );
        assert_eq!(
            f.evaluate(&[Value::Boolean(false), Value::Integer(1), Value::Float(0.5)])
                .unwrap(),
            Value::Float(0.5)
        );
    }

    #[test]
    fn test_iif_rejects_boolean_with_text() {
        let mut f = IifFunction::default();
        let args = [
            ArgInfo::new(DataType::Boolean, None),
            ArgInfo::new(DataType::Boolean, None),
            ArgInfo::new(DataType::Text, None),
        ];
        assert!(f.bind(&args, &QueryConfig::default()).is_err());
    }

    #[test]
    fn test_ifempty() {
        assert_eq!(
            IfEmptyFunction
                .evaluate(&[Value::text(""), Value::text("-")])
                .unwrap(),
            Value::text("-")
        );
        assert_eq!(
            IfEmptyFunction
                .evaluate(&[Value::text("x"), Value::text("-")])
                .unwrap(),
            Value::text("x")
        );
    }
}
