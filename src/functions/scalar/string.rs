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

//! String scalar functions

use crate::core::{DataType, Result, Value};
use crate::executor::QueryConfig;
use crate::functions::{ArgInfo, FunctionInfo, FunctionSignature, FunctionType, ScalarFunction};
use crate::validate_arg_count;

use super::{expect_arg, value_to_i64, value_to_string};

// ============================================================================
// UPPER
// ============================================================================

/// UPPER function - converts a string to uppercase
#[derive(Default)]
pub struct UpperFunction;

impl ScalarFunction for UpperFunction {
    fn name(&self) -> &str {
        "UPPER"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "UPPER",
            FunctionType::Scalar,
            "Converts a string to uppercase",
            FunctionSignature::new(1, 1),
        )
    }

    fn bind(&mut self, _args: &[ArgInfo], _config: &QueryConfig) -> Result<DataType> {
        Ok(DataType::Text)
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "UPPER", 1);
        Ok(Value::text(value_to_string(&args[0]).to_uppercase()))
    }
}

// ============================================================================
// LOWER
// ============================================================================

/// LOWER function - converts a string to lowercase
#[derive(Default)]
pub struct LowerFunction;

impl ScalarFunction for LowerFunction {
    fn name(&self) -> &str {
        "LOWER"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "LOWER",
            FunctionType::Scalar,
            "Converts a string to lowercase",
            FunctionSignature::new(1, 1),
        )
    }

    fn bind(&mut self, _args: &[ArgInfo], _config: &QueryConfig) -> Result<DataType> {
        Ok(DataType::Text)
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "LOWER", 1);
        Ok(Value::text(value_to_string(&args[0]).to_lowercase()))
    }
}

// ============================================================================
// LEN
// ============================================================================

/// LEN function - returns the number of characters of a string
#[derive(Default)]
pub struct LenFunction;

impl ScalarFunction for LenFunction {
    fn name(&self) -> &str {
        "LEN"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "LEN",
            FunctionType::Scalar,
            "Returns the number of characters in a string",
            FunctionSignature::new(1, 1),
        )
    }

    fn bind(&mut self, _args: &[ArgInfo], _config: &QueryConfig) -> Result<DataType> {
        Ok(DataType::Integer)
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "LEN", 1);
        Ok(Value::Integer(
            value_to_string(&args[0]).chars().count() as i64
        ))
    }
}

// ============================================================================
// TRIM
// ============================================================================

/// TRIM function - removes leading and trailing whitespace
#[derive(Default)]
pub struct TrimFunction;

impl ScalarFunction for TrimFunction {
    fn name(&self) -> &str {
        "TRIM"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "TRIM",
            FunctionType::Scalar,
            "Removes leading and trailing whitespace",
            FunctionSignature::new(1, 1),
        )
    }

    fn bind(&mut self, _args: &[ArgInfo], _config: &QueryConfig) -> Result<DataType> {
        Ok(DataType::Text)
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "TRIM", 1);
        Ok(Value::text(value_to_string(&args[0]).trim()))
    }
}

// ============================================================================
// SUBSTR
// ============================================================================

/// SUBSTR function - extracts characters starting at a 1-based position
#[derive(Default)]
pub struct SubstrFunction;

impl ScalarFunction for SubstrFunction {
    fn name(&self) -> &str {
        "SUBSTR"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "SUBSTR",
            FunctionType::Scalar,
            "Extracts a substring starting at a 1-based position",
            FunctionSignature::new(2, 3),
        )
    }

    fn bind(&mut self, args: &[ArgInfo], _config: &QueryConfig) -> Result<DataType> {
        expect_arg("SUBSTR", args, 1, DataType::Integer)?;
        if args.len() == 3 {
            expect_arg("SUBSTR", args, 2, DataType::Integer)?;
        }
        Ok(DataType::Text)
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "SUBSTR", 2, 3);
        let text = value_to_string(&args[0]);
        let start = value_to_i64("SUBSTR", &args[1])?.max(1) as usize - 1;
        let chars = text.chars().skip(start);
        let result: String = match args.get(2) {
            Some(len) => chars
                .take(value_to_i64("SUBSTR", len)?.max(0) as usize)
                .collect(),
            None => chars.collect(),
        };
        Ok(Value::text(result))
    }
}

// ============================================================================
// REPLACE
// ============================================================================

/// REPLACE function - replaces every occurrence of a substring
#[derive(Default)]
pub struct ReplaceFunction;

impl ScalarFunction for ReplaceFunction {
    fn name(&self) -> &str {
        "REPLACE"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "REPLACE",
            FunctionType::Scalar,
            "Replaces every occurrence of a substring",
            FunctionSignature::new(3, 3),
        )
    }

    fn bind(&mut self, _args: &[ArgInfo], _config: &QueryConfig) -> Result<DataType> {
        Ok(DataType::Text)
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "REPLACE", 3);
        let text = value_to_string(&args[0]);
        let from = value_to_string(&args[1]);
        if from.is_empty() {
            return Ok(Value::text(text.as_ref()));
        }
        Ok(Value::text(
            text.replace(from.as_ref(), &value_to_string(&args[2])),
        ))
    }
}

// ============================================================================
// CONCAT
// ============================================================================

/// CONCAT function - concatenates the text form of its arguments
#[derive(Default)]
pub struct ConcatFunction;

impl ScalarFunction for ConcatFunction {
    fn name(&self) -> &str {
        "CONCAT"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "CONCAT",
            FunctionType::Scalar,
            "Concatenates the text form of its arguments",
            FunctionSignature::variadic(1),
        )
    }

    fn bind(&mut self, _args: &[ArgInfo], _config: &QueryConfig) -> Result<DataType> {
        Ok(DataType::Text)
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        let mut out = String::new();
        for arg in args {
            out.push_str(&value_to_string(arg));
        }
        Ok(Value::text(out))
    }
}

// ============================================================================
// STARTSWITH
// ============================================================================

/// STARTSWITH function - whether a string begins with a prefix
#[derive(Default)]
pub struct StartsWithFunction;

impl ScalarFunction for StartsWithFunction {
    fn name(&self) -> &str {
        "STARTSWITH"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "STARTSWITH",
            FunctionType::Scalar,
            "Returns true when the string begins with the prefix",
            FunctionSignature::new(2, 2),
        )
    }

    fn bind(&mut self, _args: &[ArgInfo], _config: &QueryConfig) -> Result<DataType> {
        Ok(DataType::Boolean)
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "STARTSWITH", 2);
        let text = value_to_string(&args[0]);
        Ok(Value::Boolean(
            text.starts_with(value_to_string(&args[1]).as_ref()),
        ))
    }
}

// ============================================================================
// INDEXOF
// ============================================================================

/// INDEXOF function - 1-based character position of a substring, 0 if absent
#[derive(Default)]
pub struct IndexOfFunction;

impl ScalarFunction for IndexOfFunction {
    fn name(&self) -> &str {
        "INDEXOF"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "INDEXOF",
            FunctionType::Scalar,
            "Returns the 1-based position of a substring, or 0",
            FunctionSignature::new(2, 2),
        )
    }

    fn bind(&mut self, _args: &[ArgInfo], _config: &QueryConfig) -> Result<DataType> {
        Ok(DataType::Integer)
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "INDEXOF", 2);
        let text = value_to_string(&args[0]);
        let position = text
            .find(value_to_string(&args[1]).as_ref())
            .map(|byte| text[..byte].chars().count() as i64 + 1)
            .unwrap_or(0);
        Ok(Value::Integer(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::text(s)
    }

    #[test]
    fn test_upper_lower() {
        assert_eq!(UpperFunction.evaluate(&[text("get")]).unwrap(), text("GET"));
        assert_eq!(LowerFunction.evaluate(&[text("GET")]).unwrap(), text("get"));
        assert_eq!(
            UpperFunction.evaluate(&[Value::Integer(5)]).unwrap(),
            text("5")
        );
    }

    #[test]
    fn test_len_counts_chars() {
        assert_eq!(
            LenFunction.evaluate(&[text("héllo")]).unwrap(),
            Value::Integer(5)
        );
    }

    #[test]
    fn test_substr() {
        let f = SubstrFunction;
        assert_eq!(
            f.evaluate(&[text("abcdef"), Value::Integer(2), Value::Integer(3)])
                .unwrap(),
            text("bcd")
        );
        assert_eq!(
            f.evaluate(&[text("abcdef"), Value::Integer(4)]).unwrap(),
            text("def")
        );
        assert_eq!(
            f.evaluate(&[text("abc"), Value::Integer(0), Value::Integer(2)])
                .unwrap(),
            text("ab")
        );
    }

    #[test]
    fn test_substr_bind_rejects_text_start() {
        let mut f = SubstrFunction;
        let args = [
            ArgInfo::new(DataType::Text, None),
            ArgInfo::new(DataType::Text, None),
        ];
        assert!(f.bind(&args, &QueryConfig::default()).is_err());
    }

    #[test]
    fn test_replace_and_concat() {
        assert_eq!(
            ReplaceFunction
                .evaluate(&[text("a-b-c"), text("-"), text("+")])
                .unwrap(),
            text("a+b+c")
        );
        assert_eq!(
            ConcatFunction
                .evaluate(&[text("n="), Value::Integer(3)])
                .unwrap(),
            text("n=3")
        );
    }

    #[test]
    fn test_startswith_indexof() {
        assert_eq!(
            StartsWithFunction
                .evaluate(&[text("GET /index"), text("GET")])
                .unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            IndexOfFunction.evaluate(&[text("héllo"), text("llo")]).unwrap(),
            Value::Integer(3)
        );
        assert_eq!(
            IndexOfFunction.evaluate(&[text("abc"), text("z")]).unwrap(),
            Value::Integer(0)
        );
    }
}
